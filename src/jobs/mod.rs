//! Job records, the join barrier, and the kind-to-handler dispatch table.

pub mod context;
pub mod handlers;
pub mod join;
pub mod registry;
pub mod series;
pub mod store;

pub use context::JobContext;
pub use handlers::{AggregateHandler, FetchHandler, HandlerOutput, JobHandler};
pub use join::{JoinDecision, JoinRecord, JoinTable};
pub use registry::JobRegistry;
pub use series::SeriesCache;
pub use store::{InMemoryJobStore, JobStore};
