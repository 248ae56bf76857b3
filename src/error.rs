//! Error types for every layer of the pipeline

use thiserror::Error;

/// Failures reported by a market data source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    #[error("Rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream authentication expired: {0}")]
    AuthExpired(String),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

/// Data-quality and numeric failures from the statistics engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    /// The two series share no timestamp
    #[error("No overlapping timestamps between {symbol_1} and {symbol_2}")]
    NoOverlap { symbol_1: String, symbol_2: String },

    /// The regressor has zero variance, so the hedge ratio is undefined
    #[error("Degenerate regression: {0}")]
    DegenerateRegression(String),

    #[error("Non-positive price {price} at index {index}")]
    NonPositivePrice { index: usize, price: f64 },

    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Undefined statistic: {0}")]
    UndefinedStatistic(&'static str),

    #[error("Rolling window must be at least 2, got {0}")]
    InvalidWindow(usize),

    #[error("Singular design matrix in {0}")]
    SingularMatrix(&'static str),
}

/// Terminal error of a job, recorded on the job and surfaced at poll time
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    #[error("Fetch failed for {symbol}: {source}")]
    Fetch {
        symbol: String,
        #[source]
        source: MarketDataError,
    },

    #[error("Analysis failed: {0}")]
    Stats(#[from] StatsError),

    #[error("Series not found for locator {0}")]
    MissingSeries(String),

    #[error("Unexpected payload for job {0}")]
    UnexpectedPayload(String),

    #[error("No handler registered for job kind {0}")]
    UnknownKind(String),

    #[error("Job abandoned: {0}")]
    Abandoned(String),

    #[error("Failed to publish result: {0}")]
    Publish(String),
}

/// Failures of the job and document stores
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Job {0} not found")]
    NotFound(String),

    #[error("Job {0} is already terminal")]
    AlreadyTerminal(String),

    #[error("Invalid state transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of the orchestration protocol itself
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Job {id} is a {actual} job, expected {expected}")]
    WrongKind {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    #[error("Job {0} is not part of a pair request")]
    OrphanJob(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
