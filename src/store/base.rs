use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{file_storage::FileStorage, memory_storage::MemoryStorage};
use crate::config::{StorageBackend, StorageConfig};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("storage file {path} is not a valid key/value document: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode value for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String key/value persistence, the client-side counterpart of browser local storage.
///
/// `set_items` and `remove_items` apply all keys at once: readers never observe
/// a state where only some of them were written.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set_items(&self, items: &[(&str, String)]) -> Result<(), StorageError>;
    async fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError>;

    async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.set_items(&[(key, value)]).await
    }

    fn is_persistent(&self) -> bool {
        // Real backends survive a restart; MemoryStorage overrides this
        true
    }
}

/// Creates a concrete storage implementation based on the StorageConfig.
/// If `storage.enabled = false` (or no backend is given), state lives in memory.
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>, StorageError> {
    if !config.enabled {
        info!("Persistent storage is disabled. Using MemoryStorage.");
        return Ok(Arc::new(MemoryStorage::new()));
    }

    match &config.backend {
        Some(StorageBackend::File(file_config)) => {
            let storage = FileStorage::open(file_config).await?;
            info!("Opened file storage at {}", file_config.path);
            Ok(Arc::new(storage))
        }
        None => {
            info!("Storage is enabled, but no backend is configured. Using MemoryStorage.");
            Ok(Arc::new(MemoryStorage::new()))
        }
    }
}
