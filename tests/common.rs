#![allow(dead_code)]

use std::path::PathBuf;

use chrono::Utc;
use clinic_session::config::{parse_config, ConfigV1};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

pub const USER_INFO: &str = r#"{
    "id": "u-42",
    "email": "grace@clinic.test",
    "emailVerified": true,
    "firstName": "Grace",
    "lastName": "Hopper",
    "tenantId": "t-1",
    "clinicId": "c-1",
    "role": "Admin"
}"#;

/// A signed access token expiring `secs` from now.
pub fn access_token(secs: i64) -> String {
    let claims = json!({"sub": "u-42", "exp": Utc::now().timestamp() + secs});
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"integration-secret"),
    )
    .expect("Failed to create token")
}

/// A storage file path unique to one test.
pub fn storage_path() -> PathBuf {
    std::env::temp_dir().join(format!("clinic-session-{}.json", uuid::Uuid::new_v4()))
}

pub fn test_config(base_url: &str, storage: Option<&PathBuf>) -> ConfigV1 {
    let storage = match storage {
        Some(path) => format!(
            "storage:\n  enabled: true\n  type: file\n  path: \"{}\"\n",
            path.display()
        ),
        None => "storage:\n  enabled: false\n".to_string(),
    };
    let yaml = format!(
        r#"
version: "1.0.0"
api:
  base_url: "{}"
  timeout_in_ms: 3000
  retries: 1
  backoff_ms: 1
session:
  query_stale_secs: 60
logging:
  level: "debug"
  format: "json"
{}"#,
        base_url, storage
    );
    parse_config(&yaml).expect("test config should parse")
}
