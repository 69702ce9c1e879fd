use std::path::Path;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::storage::StorageConfig;

/// Prefix for environment overrides, e.g. `CLINIC_SESSION_API__BASE_URL`.
pub const ENV_PREFIX: &str = "CLINIC_SESSION_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: where the API lives, how sessions behave, where they persist.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for the clinic API and identity endpoints.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
    /// Extra attempts for transient failures (network, 502, 503, 504).
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

/// Session behaviour and the guarded routes.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct SessionConfig {
    /// When the access token cannot be decoded, keep using it instead of
    /// treating it as expired.
    #[serde(default = "default_assume_valid")]
    pub assume_valid_on_decode_error: bool,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_registration_path")]
    pub registration_path: String,
    #[serde(default = "default_query_stale_secs")]
    pub query_stale_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            assume_valid_on_decode_error: default_assume_valid(),
            login_path: default_login_path(),
            registration_path: default_registration_path(),
            query_stale_secs: default_query_stale_secs(),
        }
    }
}

fn default_timeout_in_ms() -> u64 {
    15_000
}

fn default_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    300
}

fn default_assume_valid() -> bool {
    true
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_registration_path() -> String {
    "/clinic-registration".to_string()
}

fn default_query_stale_secs() -> u64 {
    300
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error loading configuration: {0}")]
    Load(#[from] figment::Error),
}

/// Load config from a YAML file, with `CLINIC_SESSION_` environment overrides on top.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigV1, ConfigError> {
    let figment = Figment::new()
        .merge(Yaml::file(path.as_ref()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));
    extract(figment)
}

/// Parse a config from an in-memory YAML document. No environment overrides.
pub fn parse_config(yaml: &str) -> Result<ConfigV1, ConfigError> {
    extract(Figment::new().merge(Yaml::string(yaml)))
}

fn extract(figment: Figment) -> Result<ConfigV1, ConfigError> {
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Render the JSON schema for the configuration.
pub fn config_schema() -> String {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = parse_config(
            r#"
version: "1.0.0"
api:
  base_url: "http://localhost:5050"
"#,
        )
        .expect("config should parse");

        assert_eq!(config.api.timeout_in_ms, 15_000);
        assert_eq!(config.api.retries, 2);
        assert_eq!(config.api.backoff_ms, 300);
        assert!(config.session.assume_valid_on_decode_error);
        assert_eq!(config.session.login_path, "/login");
        assert_eq!(config.session.registration_path, "/clinic-registration");
        assert!(!config.storage.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_file_storage_backend() {
        let config = parse_config(
            r#"
version: "1.0.0"
api:
  base_url: "http://localhost:5050"
session:
  assume_valid_on_decode_error: false
storage:
  enabled: true
  type: file
  path: /tmp/clinic-session.json
logging:
  level: debug
  format: json
"#,
        )
        .expect("config should parse");

        assert!(!config.session.assume_valid_on_decode_error);
        assert!(config.storage.enabled);
        match config.storage.backend {
            Some(StorageBackend::File(file)) => {
                assert_eq!(file.path, "/tmp/clinic-session.json")
            }
            None => panic!("expected a file backend"),
        }
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let result = parse_config(
            r#"
version: "2.0.0"
api:
  base_url: "http://localhost:5050"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_mentions_sections() {
        let schema = config_schema();
        assert!(schema.contains("base_url"));
        assert!(schema.contains("assume_valid_on_decode_error"));
    }
}
