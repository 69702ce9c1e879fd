//! Session assembly: storage, API client, auth service, state container and
//! the query cache, wired from one configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::api::{AnalyticsApi, NotificationsApi, TenantsApi};
use crate::auth::{AuthSessionService, ExpiryPolicy};
use crate::client::{ApiClient, ApiError};
use crate::config::ConfigV1;
use crate::session::{QueryClient, RouteGuard, SessionContext};
use crate::store::{create_storage, StorageError, TokenStore};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open session storage: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to build API client: {0}")]
    Client(#[from] ApiError),
}

/// Everything a dashboard needs for one signed-in (or signing-in) user.
pub struct ClinicSession {
    pub config: Arc<ConfigV1>,
    pub context: Arc<SessionContext>,
}

impl ClinicSession {
    pub fn route_guard(&self) -> RouteGuard {
        RouteGuard::new(
            self.context.clone(),
            self.config.session.login_path.clone(),
            self.config.session.registration_path.clone(),
        )
    }

    fn client(&self) -> ApiClient {
        self.context.service().client().clone()
    }

    pub fn tenants(&self) -> TenantsApi {
        TenantsApi::new(self.client())
    }

    pub fn analytics(&self) -> AnalyticsApi {
        AnalyticsApi::new(self.client())
    }

    pub fn notifications(&self) -> NotificationsApi {
        NotificationsApi::new(self.client())
    }
}

pub async fn build_session(config: Arc<ConfigV1>) -> Result<ClinicSession, StartupError> {
    let storage = create_storage(&config.storage).await?;
    let persistent = storage.is_persistent();
    let store = TokenStore::open(storage).await?;
    let client = ApiClient::new(&config.api)?;
    let client_base_url = client.base_url().to_string();
    let policy = ExpiryPolicy {
        assume_valid_on_decode_error: config.session.assume_valid_on_decode_error,
    };

    let service = AuthSessionService::new(client, store, policy);
    let queries = QueryClient::new(Duration::from_secs(config.session.query_stale_secs));
    let context = SessionContext::new(service, queries).await;

    info!(
        event_name = "startup.session_built",
        event_domain = "startup",
        base_url = client_base_url.as_str(),
        persistent,
        "session assembled"
    );

    Ok(ClinicSession { config, context })
}
