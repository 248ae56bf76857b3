//! HTTP endpoint server using Axum

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, Level};

use crate::core::orchestrator::{JobLookup, Orchestrator, PairLookup, PairRequest};
use crate::error::OrchestratorError;
use crate::metrics::Metrics;
use crate::models::{DateRange, Job, JobId, PairKey, RequestId, StrategyParams};

pub const SERVICE_NAME: &str = "pairflow";

#[derive(Clone)]
pub struct AppState {
    pub health: Arc<RwLock<HealthStatus>>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, metrics: Arc<Metrics>) -> Self {
        Self {
            health: Arc::new(RwLock::new(HealthStatus::default())),
            metrics,
            start_time: Arc::new(Instant::now()),
            orchestrator,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HealthStatus {
    pub status: String,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let health = state.health.read().await;
    let uptime_seconds = state.start_time.elapsed().as_secs();
    Ok(Json(json!({
        "status": health.status,
        "uptime_seconds": uptime_seconds,
        "service": SERVICE_NAME
    })))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();
    state.metrics.http_requests_in_flight.dec();

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis(),
            "HTTP request error"
        );
    }

    response
}

/// `ticker_1` / `ticker_2` are accepted as aliases of the symbol fields
#[derive(Debug, Deserialize)]
struct SubmitPairRequest {
    #[serde(alias = "ticker_1")]
    symbol_1: String,
    #[serde(alias = "ticker_2")]
    symbol_2: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(default)]
    capital: Option<f64>,
    #[serde(default)]
    z_score: Option<f64>,
    #[serde(default)]
    freq: Option<u32>,
    #[serde(default)]
    window: Option<usize>,
}

impl From<SubmitPairRequest> for PairRequest {
    fn from(body: SubmitPairRequest) -> Self {
        PairRequest {
            pair: PairKey::new(body.symbol_1, body.symbol_2),
            range: DateRange::new(body.start_date, body.end_date),
            strategy: StrategyParams {
                capital: body.capital,
                z_score: body.z_score,
                freq: body.freq,
                window: body.window,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct TaskRef {
    symbol: String,
    job_id: JobId,
}

#[derive(Debug, Serialize)]
struct JobStatusResponse {
    job_id: JobId,
    request_id: RequestId,
    kind: String,
    task_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        Self {
            task_result: job.output.and_then(|output| serde_json::to_value(output).ok()),
            job_id: job.id,
            request_id: job.request_id,
            kind: job.kind.to_string(),
            task_status: job.state.to_string(),
            error: job.error,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

fn internal_error(e: OrchestratorError) -> Response {
    error!(error = %e, "Orchestrator error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
        .into_response()
}

/// Queue both fetch jobs for a pair; returns immediately
async fn submit_pair(
    State(state): State<AppState>,
    Json(body): Json<SubmitPairRequest>,
) -> Response {
    let request: PairRequest = body.into();
    let symbols = [request.pair.symbol_1.clone(), request.pair.symbol_2.clone()];

    match state.orchestrator.submit_pair(request).await {
        Ok(submission) => {
            let tasks: Vec<TaskRef> = symbols
                .into_iter()
                .zip(submission.fetch_jobs)
                .map(|(symbol, job_id)| TaskRef { symbol, job_id })
                .collect();
            (
                StatusCode::ACCEPTED,
                Json(json!({
                    "status": "queued",
                    "request_id": submission.request_id,
                    "tasks": tasks,
                })),
            )
                .into_response()
        }
        Err(e @ OrchestratorError::InvalidRange { .. }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

/// Unknown ids answer 200 with `task_status: not_found`
async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let job_id = JobId::from(id);
    match state.orchestrator.get_job_status(&job_id).await {
        Ok(JobLookup::Found(job)) => Json(JobStatusResponse::from(job)).into_response(),
        Ok(JobLookup::NotFound) => Json(json!({
            "job_id": job_id,
            "task_status": "not_found",
        }))
        .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn get_request(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let request_id = RequestId::from(id.as_str());
    match state.orchestrator.get_request_jobs(&request_id).await {
        Ok(jobs) if jobs.is_empty() => (
            StatusCode::NOT_FOUND,
            Json(json!({ "request_id": request_id, "status": "not_found" })),
        )
            .into_response(),
        Ok(jobs) => {
            let jobs: Vec<JobStatusResponse> = jobs.into_iter().map(Into::into).collect();
            Json(json!({ "request_id": request_id, "jobs": jobs })).into_response()
        }
        Err(e) => internal_error(e),
    }
}

async fn get_pair(
    State(state): State<AppState>,
    Path((symbol_1, symbol_2)): Path<(String, String)>,
) -> Response {
    let pair = PairKey::new(symbol_1, symbol_2);
    match state.orchestrator.get_pair_document(&pair).await {
        Ok(PairLookup::Found(document)) => Json(document).into_response(),
        Ok(PairLookup::NotComputed) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "symbol_1": pair.symbol_1,
                "symbol_2": pair.symbol_2,
                "status": "not_computed",
            })),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/pairs", post(submit_pair))
        .route("/api/pairs/{symbol_1}/{symbol_2}", get(get_pair))
        .route("/api/jobs/{id}", get(get_job))
        .route("/api/requests/{id}", get(get_request))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(port: u16, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port = port, "HTTP server listening on port {}", port);
    info!(
        "Metrics endpoint available at http://0.0.0.0:{}/metrics",
        port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
