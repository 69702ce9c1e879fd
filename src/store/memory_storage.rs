use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Storage, StorageError};

/// Process-lifetime storage. Used when persistence is disabled and in tests.
#[derive(Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_items(&self, items: &[(&str, String)]) -> Result<(), StorageError> {
        let mut map = self.items.write().await;
        for (key, value) in items {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    async fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut map = self.items.write().await;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}
