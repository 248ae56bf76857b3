//! Dispatch table from job kind to handler

use std::collections::HashMap;
use std::sync::Arc;

use crate::jobs::handlers::{AggregateHandler, FetchHandler, JobHandler};
use crate::models::JobKind;

pub struct JobRegistry {
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
}

impl JobRegistry {
    /// Registry with no handlers; see `Default` for the standard wiring
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Replaces any handler already registered for `kind`
    pub fn register(&mut self, kind: JobKind, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(kind, handler);
    }

    pub fn handler(&self, kind: JobKind) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(&kind).cloned()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(JobKind::Fetch, Arc::new(FetchHandler));
        registry.register(JobKind::Aggregate, Arc::new(AggregateHandler));
        registry
    }
}
