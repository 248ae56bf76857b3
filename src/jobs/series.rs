//! In-process cache for fetched bar series, addressed by locator

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::{Candle, JobId};

const MEMORY_SCHEME: &str = "mem://";

/// Holds each fetch job's bars until the aggregate step consumes them.
/// `FetchResult::series` carries the locator, never the bars themselves.
#[derive(Default)]
pub struct SeriesCache {
    entries: RwLock<HashMap<String, Arc<Vec<Candle>>>>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locator_for(job_id: &JobId) -> String {
        format!("{}{}", MEMORY_SCHEME, job_id)
    }

    /// Store bars for `job_id` and return their locator
    pub fn put(&self, job_id: &JobId, candles: Vec<Candle>) -> String {
        let locator = Self::locator_for(job_id);
        self.entries.write().insert(locator.clone(), Arc::new(candles));
        locator
    }

    pub fn get(&self, locator: &str) -> Option<Arc<Vec<Candle>>> {
        self.entries.read().get(locator).cloned()
    }

    pub fn remove(&self, locator: &str) -> bool {
        self.entries.write().remove(locator).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
