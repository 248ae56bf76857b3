//! Core application primitives (executor, orchestrator, publisher, HTTP)

pub mod executor;
pub mod http;
pub mod orchestrator;
pub mod publisher;

pub use executor::{JobExecutor, JobRunner, TokioExecutor};
pub use http::{create_router, start_server, AppState};
pub use orchestrator::{JobLookup, JoinProgress, Orchestrator, PairLookup, PairRequest, PairSubmission};
pub use publisher::ResultPublisher;
