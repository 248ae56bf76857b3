//! Pairwise statistics engine: alignment, hedge-ratio regression,
//! cointegration test, rolling spread z-score.

pub mod adf;
pub mod align;
pub mod engine;
pub mod math;
pub mod ols;
pub mod rolling;

pub use adf::{adf_test, mackinnon_p_value, AdfResult};
pub use align::{align_series, AlignedSeries};
pub use engine::{compute_metrics, AnalysisConfig, DEFAULT_WINDOW};
pub use ols::OlsFit;
pub use rolling::{rolling_mean_std, RollingWindow};
