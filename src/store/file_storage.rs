use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::{Storage, StorageError};

/// Where the JSON document holding all keys lives.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct FileStorageConfig {
    pub path: String,
}

/// Storage backed by a single JSON object on disk.
///
/// Every write replaces the file through a temporary sibling and a rename, so a
/// crash mid-write leaves the previous document intact.
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    pub async fn open(config: &FileStorageConfig) -> Result<Self, StorageError> {
        let path = PathBuf::from(&config.path);
        let items = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                    path: config.path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Storage file {} does not exist yet", config.path);
                BTreeMap::new()
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: config.path.clone(),
                    source,
                })
            }
        };

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    async fn flush(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.display().to_string(),
            source,
        };
        let body = serde_json::to_vec_pretty(items).map_err(|source| StorageError::Encode {
            key: "*".to_string(),
            source,
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_items(&self, items: &[(&str, String)]) -> Result<(), StorageError> {
        let mut map = self.items.lock().await;
        let mut next = map.clone();
        for (key, value) in items {
            next.insert((*key).to_string(), value.clone());
        }
        self.flush(&next).await?;
        *map = next;
        Ok(())
    }

    async fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut map = self.items.lock().await;
        let mut next = map.clone();
        for key in keys {
            next.remove(*key);
        }
        self.flush(&next).await?;
        *map = next;
        Ok(())
    }
}
