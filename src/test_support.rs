//! Fixtures shared by the unit tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use crate::auth::{AuthSessionService, ExpiryPolicy};
use crate::client::ApiClient;
use crate::config::ApiConfig;
use crate::models::{Role, UserProfile};
use crate::session::{QueryClient, SessionContext};
use crate::store::memory_storage::MemoryStorage;
use crate::store::{Storage, TokenStore};

/// An HS256 token whose `exp` lies `secs` from now (negative for the past).
pub(crate) fn jwt_expiring_in(secs: i64) -> String {
    let claims = json!({"sub": "u-1", "exp": Utc::now().timestamp() + secs});
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret"))
        .expect("Failed to create token")
}

pub(crate) fn sample_user() -> UserProfile {
    UserProfile {
        id: "u-1".to_string(),
        name: "Ada Lovelace".to_string(),
        email: "ada@clinic.test".to_string(),
        email_verified: true,
        phone_number: None,
        tenant_id: Some("t-1".to_string()),
        clinic_id: Some("t-1".to_string()),
        role: Role::Practitioner,
        employee_id: None,
        license_number: None,
        specialization: None,
    }
}

pub(crate) fn api_config(base_url: String) -> ApiConfig {
    ApiConfig {
        base_url,
        timeout_in_ms: 2_000,
        retries: 1,
        backoff_ms: 1,
    }
}

pub(crate) async fn service_for(base_url: String) -> (AuthSessionService, Arc<dyn Storage>) {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let store = TokenStore::open(storage.clone())
        .await
        .expect("memory storage cannot fail");
    let client = ApiClient::new(&api_config(base_url)).expect("client should build");
    (
        AuthSessionService::new(client, store, ExpiryPolicy::default()),
        storage,
    )
}

pub(crate) async fn context_for(service: AuthSessionService) -> Arc<SessionContext> {
    SessionContext::new(service, QueryClient::new(Duration::from_secs(60))).await
}
