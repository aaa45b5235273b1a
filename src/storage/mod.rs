use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::CollectorError;
use crate::models::ListingPage;

/// Durable object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `bucket/key`, replacing any existing object
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), CollectorError>;
}

/// Object store rooted in a local directory, one subdirectory per bucket
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), CollectorError> {
        let write_error = |e: std::io::Error| CollectorError::StorageWrite {
            key: key.to_string(),
            reason: e.to_string(),
        };

        let path = self.root.join(bucket).join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }

        // Rename keeps the put atomic for readers.
        let tmp = path.with_extension("json.partial");
        tokio::fs::write(&tmp, &bytes).await.map_err(write_error)?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_error(e));
        }

        debug!(path = %path.display(), bytes = bytes.len(), content_type, "Stored object");
        Ok(())
    }
}

const JSON_CONTENT_TYPE: &str = "application/json";

/// Writes listing pages under `<prefix><operation>_<timestamp>_<page>.json`
#[derive(Clone)]
pub struct ObjectWriter {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: String,
}

impl ObjectWriter {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, prefix: &str) -> Self {
        let prefix = if prefix.is_empty() || prefix.ends_with('/') {
            prefix.to_string()
        } else {
            format!("{}/", prefix)
        };

        Self {
            store,
            bucket: bucket.into(),
            prefix,
        }
    }

    /// Object key for a page. The same operation, timestamp and page always
    /// map to the same key, so a repeat write overwrites.
    pub fn object_key(&self, page: &ListingPage, timestamp: &str) -> String {
        format!(
            "{}{}_{}_{}.json",
            self.prefix, page.operation, timestamp, page.page_number
        )
    }

    /// Serialize and store one page, returning its key
    pub async fn write_page(
        &self,
        page: &ListingPage,
        timestamp: &str,
    ) -> Result<String, CollectorError> {
        let key = self.object_key(page, timestamp);
        let bytes = serde_json::to_vec_pretty(page).map_err(|e| CollectorError::StorageWrite {
            key: key.clone(),
            reason: format!("serialization failed: {}", e),
        })?;

        self.store
            .put_object(&self.bucket, &key, bytes, JSON_CONTENT_TYPE)
            .await?;
        info!(bucket = %self.bucket, %key, items = page.items.len(), "💾 Uploaded page");
        Ok(key)
    }
}
