//! Trading signal derivation from the spread z-score.

pub mod policy;

pub use policy::{allocate_capital, derive_signal, SignalThresholds};
