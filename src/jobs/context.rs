//! Job context for dependency injection

use std::sync::Arc;

use crate::jobs::series::SeriesCache;
use crate::metrics::Metrics;
use crate::services::market_data::{MarketDataProvider, DEFAULT_RESOLUTION};
use crate::stats::AnalysisConfig;

/// Shared, read-mostly dependencies handed to every job handler.
///
/// Handlers never touch the job store or the join table; state transitions
/// stay with the orchestrator.
pub struct JobContext {
    pub data_provider: Arc<dyn MarketDataProvider>,
    pub series: Arc<SeriesCache>,
    pub analysis: AnalysisConfig,
    /// Bar resolution in minutes when the request does not set `freq`
    pub default_resolution: u32,
    pub metrics: Option<Arc<Metrics>>,
}

impl JobContext {
    pub fn new(data_provider: Arc<dyn MarketDataProvider>, analysis: AnalysisConfig) -> Self {
        Self {
            data_provider,
            series: Arc::new(SeriesCache::new()),
            analysis,
            default_resolution: DEFAULT_RESOLUTION,
            metrics: None,
        }
    }

    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.default_resolution = resolution;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}
