//! Pairflow: fan-out/fan-in orchestration of pair-trading analyses.
//!
//! A pair request fans out into two market-data fetch jobs. Once both succeed,
//! exactly one aggregate job runs the pairwise statistics engine and the
//! resulting document is published under the ordered symbol pair.

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod signals;
pub mod stats;

pub use error::{JobError, MarketDataError, OrchestratorError, StatsError, StoreError};
