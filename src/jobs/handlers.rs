//! Job handlers for the pair analysis workflow

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{JobError, MarketDataError};
use crate::jobs::context::JobContext;
use crate::models::{
    AggregateParams, Candle, FetchParams, FetchResult, Job, JobParams, PairMetricsDocument,
};
use crate::signals::SignalThresholds;
use crate::stats::{compute_metrics, AnalysisConfig};

/// Successful handler output, before the orchestrator records it
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
    Fetch(FetchResult),
    Aggregate(PairMetricsDocument),
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job, ctx: &JobContext) -> Result<HandlerOutput, JobError>;
}

/// Pulls one symbol's bars from the market data provider into the series cache
pub struct FetchHandler;

#[async_trait]
impl JobHandler for FetchHandler {
    async fn handle(&self, job: &Job, ctx: &JobContext) -> Result<HandlerOutput, JobError> {
        let params: &FetchParams = match &job.params {
            JobParams::Fetch(params) => params,
            _ => return Err(JobError::UnexpectedPayload(job.id.to_string())),
        };
        let resolution = params.resolution.unwrap_or(ctx.default_resolution);

        debug!(
            job_id = %job.id,
            symbol = %params.symbol,
            resolution,
            "FetchJob: fetching bars for {}",
            params.symbol
        );

        let candles = ctx
            .data_provider
            .get_candles(&params.symbol, &params.range, resolution)
            .await
            .map_err(|source| {
                warn!(job_id = %job.id, symbol = %params.symbol, error = %source, "FetchJob: market data error for {}", params.symbol);
                JobError::Fetch {
                    symbol: params.symbol.clone(),
                    source,
                }
            })?;

        if candles.is_empty() {
            return Err(JobError::Fetch {
                symbol: params.symbol.clone(),
                source: MarketDataError::InvalidResponse(format!(
                    "no bars between {} and {}",
                    params.range.start, params.range.end
                )),
            });
        }

        let bars = candles.len();
        let locator = ctx.series.put(&job.id, candles);

        debug!(
            job_id = %job.id,
            symbol = %params.symbol,
            bars,
            locator = %locator,
            "FetchJob: cached {} bars for {}",
            bars,
            params.symbol
        );

        Ok(HandlerOutput::Fetch(FetchResult::success(
            params.symbol.clone(),
            locator,
            bars,
        )))
    }
}

/// Runs the statistics engine over both cached legs of a pair
pub struct AggregateHandler;

impl AggregateHandler {
    fn load_leg(ctx: &JobContext, leg: &FetchResult) -> Result<Arc<Vec<Candle>>, JobError> {
        let locator = leg
            .series
            .as_deref()
            .ok_or_else(|| JobError::MissingSeries(format!("{} (no locator)", leg.symbol)))?;
        ctx.series
            .get(locator)
            .ok_or_else(|| JobError::MissingSeries(locator.to_string()))
    }

    /// Request-level overrides on top of the configured analysis defaults
    fn analysis_config(ctx: &JobContext, params: &AggregateParams) -> AnalysisConfig {
        let mut config = ctx.analysis.clone();
        if let Some(window) = params.strategy.window {
            config.window = window;
        }
        if let Some(z) = params.strategy.z_score {
            config.thresholds = SignalThresholds::symmetric(z);
        }
        if params.strategy.capital.is_some() {
            config.capital = params.strategy.capital;
        }
        config
    }
}

#[async_trait]
impl JobHandler for AggregateHandler {
    async fn handle(&self, job: &Job, ctx: &JobContext) -> Result<HandlerOutput, JobError> {
        let params: &AggregateParams = match &job.params {
            JobParams::Aggregate(params) => params,
            _ => return Err(JobError::UnexpectedPayload(job.id.to_string())),
        };

        let series_1 = Self::load_leg(ctx, &params.legs[0])?;
        let series_2 = Self::load_leg(ctx, &params.legs[1])?;
        let config = Self::analysis_config(ctx, params);

        debug!(
            job_id = %job.id,
            pair = %params.pair,
            bars_1 = series_1.len(),
            bars_2 = series_2.len(),
            window = config.window,
            "AggregateJob: computing metrics for {}",
            params.pair
        );

        let document = compute_metrics(&params.pair, &series_1, &series_2, &config)?;
        Ok(HandlerOutput::Aggregate(document))
    }
}
