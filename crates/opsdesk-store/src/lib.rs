mod local;

pub use local::LocalStore;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Internal(String),
}

/// A store for opaque blobs keyed by string paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write (create or overwrite) an object.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError>;

    /// Read an object. Returns `StoreError::NotFound` if absent.
    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Read an object, returning `None` if it does not exist.
    async fn get_opt(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        match self.get(key).await {
            Ok(data) => Ok(Some(data)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delete an object. No-op if absent.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// List object keys under a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self.get(key).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// -- Key helpers --

/// Object key for an attachment blob, e.g.
/// `tasks/<task-id>/attachments/<attachment-id>/<filename>`.
pub fn attachment_key(
    owner_plural: &str,
    owner_id: &str,
    attachment_id: &str,
    filename: &str,
) -> String {
    format!("{owner_plural}/{owner_id}/attachments/{attachment_id}/{filename}")
}

// -- Configuration --

/// Configuration for the object store backend.
pub struct StoreConfig {
    /// Filesystem base directory. When `None`, the same XDG data dir the
    /// database uses.
    pub local_data_dir: Option<String>,
}

impl StoreConfig {
    /// Build from environment variables (`OPSDESK_DATA_DIR`).
    pub fn from_env() -> Self {
        Self {
            local_data_dir: std::env::var("OPSDESK_DATA_DIR").ok(),
        }
    }
}

// -- Factory --

/// Create an `ObjectStore` from configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
    Ok(Arc::new(LocalStore::new(config)))
}
