//! Market data sources consumed by fetch jobs.

pub mod market_data;
pub mod rest;
pub mod static_provider;

pub use market_data::MarketDataProvider;
pub use rest::RestMarketDataProvider;
pub use static_provider::StaticMarketDataProvider;
