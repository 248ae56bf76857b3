//! Publishes finished pair documents and serves them back

use std::sync::Arc;

use tracing::info;

use crate::db::PairDocumentStore;
use crate::error::StoreResult;
use crate::models::{PairKey, PairMetricsDocument};

#[derive(Clone)]
pub struct ResultPublisher {
    store: Arc<dyn PairDocumentStore>,
}

impl ResultPublisher {
    pub fn new(store: Arc<dyn PairDocumentStore>) -> Self {
        Self { store }
    }

    /// Overwrites any earlier document for the same ordered pair
    pub async fn publish(&self, document: &PairMetricsDocument) -> StoreResult<()> {
        self.store.put(document).await?;
        info!(
            pair = %document.key(),
            signal = ?document.summary.signal,
            latest_z_score = document.summary.latest_z_score,
            rolling_rows = document.rolling.len(),
            "Publisher: stored metrics for {}",
            document.key()
        );
        Ok(())
    }

    pub async fn fetch(&self, key: &PairKey) -> StoreResult<Option<PairMetricsDocument>> {
        self.store.get(key).await
    }
}
