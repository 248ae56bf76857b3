//! Pairflow API Server
//!
//! Accepts pair requests over HTTP, runs fetch and aggregate jobs on the
//! tokio runtime, and serves job status and published pair documents.

use dotenvy::dotenv;
use pairflow::config::{get_environment, AppConfig};
use pairflow::core::{start_server, AppState, Orchestrator, ResultPublisher, TokioExecutor};
use pairflow::db::{InMemoryDocumentStore, JsonFileDocumentStore, PairDocumentStore};
use pairflow::jobs::{InMemoryJobStore, JobContext};
use pairflow::logging;
use pairflow::metrics::Metrics;
use pairflow::services::{MarketDataProvider, RestMarketDataProvider, StaticMarketDataProvider};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Upper bound on jobs running at once
const MAX_RUNNING_JOBS: usize = 16;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let config = AppConfig::from_env()?;
    info!("Starting Pairflow API Server");
    info!(environment = %get_environment(), "Environment");

    let metrics = Arc::new(Metrics::new()?);

    let provider: Arc<dyn MarketDataProvider> = match config.market_data.base_url {
        Some(ref url) => {
            info!(url = %url, resolution = config.market_data.resolution, "Market data: REST history API");
            Arc::new(RestMarketDataProvider::new(
                url,
                config.market_data.access_token.clone(),
            )?)
        }
        None => {
            warn!("MARKET_DATA_URL not set - every fetch job will fail with InvalidSymbol");
            Arc::new(StaticMarketDataProvider::new())
        }
    };

    let documents: Arc<dyn PairDocumentStore> = match config.data_dir {
        Some(ref dir) => {
            info!(data_dir = %dir.display(), "Pair documents: JSON files");
            Arc::new(JsonFileDocumentStore::new(dir.clone()))
        }
        None => {
            info!("Pair documents: in memory");
            Arc::new(InMemoryDocumentStore::new())
        }
    };

    let context = JobContext::new(provider, config.analysis.clone())
        .with_resolution(config.market_data.resolution)
        .with_metrics(metrics.clone());

    let jobs = match config.job_retention {
        Some(limit) => {
            info!(limit = limit, "Job store: keeping the {} most recent finished jobs", limit);
            InMemoryJobStore::new().with_retention(limit)
        }
        None => InMemoryJobStore::new(),
    };

    let orchestrator = Orchestrator::new(
        Arc::new(jobs),
        Arc::new(TokioExecutor::with_concurrency(MAX_RUNNING_JOBS)),
        Arc::new(context),
        ResultPublisher::new(documents),
    );

    let port = config.port;
    let state = AppState::new(orchestrator, metrics);
    info!(port = port, "HTTP Server: http://0.0.0.0:{}", port);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, state).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("API server started, waiting for shutdown signal...");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down API server...");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    Ok(())
}
