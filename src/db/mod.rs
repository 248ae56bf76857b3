//! Persistence for published pair metrics documents.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileDocumentStore;
pub use memory::InMemoryDocumentStore;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{PairKey, PairMetricsDocument};

/// Documents keyed by ordered symbol pair. `put` overwrites; concurrent
/// writes for one key resolve last-write-wins.
#[async_trait]
pub trait PairDocumentStore: Send + Sync {
    async fn put(&self, document: &PairMetricsDocument) -> StoreResult<()>;

    async fn get(&self, key: &PairKey) -> StoreResult<Option<PairMetricsDocument>>;
}
