//! Process-local document store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::db::PairDocumentStore;
use crate::error::StoreResult;
use crate::models::{PairKey, PairMetricsDocument};

#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<PairKey, PairMetricsDocument>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PairDocumentStore for InMemoryDocumentStore {
    async fn put(&self, document: &PairMetricsDocument) -> StoreResult<()> {
        self.documents
            .write()
            .insert(document.key(), document.clone());
        Ok(())
    }

    async fn get(&self, key: &PairKey) -> StoreResult<Option<PairMetricsDocument>> {
        Ok(self.documents.read().get(key).cloned())
    }
}
