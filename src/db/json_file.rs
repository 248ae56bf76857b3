//! One pretty-printed JSON file per pair under a data directory

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::PairDocumentStore;
use crate::error::StoreResult;
use crate::models::{PairKey, PairMetricsDocument};

/// Writes `<data_dir>/pairs_<s1>_<s2>_metrics.json`
pub struct JsonFileDocumentStore {
    data_dir: PathBuf,
}

impl JsonFileDocumentStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, key: &PairKey) -> PathBuf {
        self.data_dir.join(format!("{}.json", key.file_stem()))
    }
}

#[async_trait]
impl PairDocumentStore for JsonFileDocumentStore {
    async fn put(&self, document: &PairMetricsDocument) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;

        let path = self.path_for(&document.key());
        let body = serde_json::to_vec_pretty(document)?;

        // Write beside the target and rename so readers never see a torn file
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), "JsonFileStore: wrote {}", document.key());
        Ok(())
    }

    async fn get(&self, key: &PairKey) -> StoreResult<Option<PairMetricsDocument>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let document: PairMetricsDocument = serde_json::from_slice(&bytes)?;
                if document.key() != *key {
                    warn!(
                        path = %path.display(),
                        stored = %document.key(),
                        "JsonFileStore: file holds another pair, ignoring for {}",
                        key
                    );
                    return Ok(None);
                }
                Ok(Some(document))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
