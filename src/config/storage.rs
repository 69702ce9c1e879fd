use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::file_storage::FileStorageConfig;

/// A wrapper for the client-side storage configuration:
/// - enabled: if false, session state only lives as long as the process (MemoryStorage).
/// - backend: the persistent backend (a JSON file, etc.).
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct StorageConfig {
    pub enabled: bool,
    #[serde(flatten)]
    pub backend: Option<StorageBackend>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: None,
        }
    }
}

/// The existing storage backends, told apart by a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(tag = "type")]
pub enum StorageBackend {
    #[serde(rename = "file")]
    File(FileStorageConfig),
}
