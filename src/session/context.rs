use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::guard::AuthGuard;
use super::query::QueryClient;
use super::state::{AuthState, PersistedEnvelope, PERSISTED_AUTH_KEY};
use crate::auth::{AuthError, AuthSessionService};
use crate::client::RequestAuth;
use crate::models::UserProfile;
use crate::store::Storage;

/// The auth state container of one session.
///
/// Owned by whoever builds the session and shared via `Arc`; every consumer
/// observes the same state through [`SessionContext::subscribe`] or an
/// [`AuthGuard`]. Only the actions below mutate it.
///
/// The context also owns the query cache: cached responses belong to one
/// user and tenant, so they are dropped whenever either changes.
pub struct SessionContext {
    service: AuthSessionService,
    storage: Arc<dyn Storage>,
    state: watch::Sender<AuthState>,
    queries: QueryClient,
}

impl SessionContext {
    /// Start with an empty state; only the active tenant is restored from the persisted slice.
    pub async fn new(service: AuthSessionService, queries: QueryClient) -> Arc<Self> {
        let storage = service.token_store().storage();
        let active_tenant_id = match storage.get_item(PERSISTED_AUTH_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<PersistedEnvelope>(&raw) {
                Ok(envelope) => envelope.state.active_tenant_id,
                Err(e) => {
                    warn!("Ignoring unreadable persisted auth state: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read persisted auth state: {}", e);
                None
            }
        };

        let (state, _) = watch::channel(AuthState::signed_out(active_tenant_id));
        Arc::new(Self {
            service,
            storage,
            state,
            queries,
        })
    }

    pub fn service(&self) -> &AuthSessionService {
        &self.service
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn guard(&self) -> AuthGuard {
        AuthGuard::new(self.subscribe())
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    #[cfg(test)]
    pub(crate) fn replace_state(&self, state: AuthState) {
        self.state.send_replace(state);
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.is_loading != loading;
            s.is_loading = loading;
            changed
        });
    }

    /// Apply `f` and write the persisted slice.
    async fn commit(&self, f: impl FnOnce(&mut AuthState)) {
        self.state.send_modify(f);
        let envelope = PersistedEnvelope::from(&*self.state.borrow());
        let encoded = match serde_json::to_string(&envelope) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode persisted auth state: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set_item(PERSISTED_AUTH_KEY, encoded).await {
            warn!("Failed to persist auth state: {}", e);
        }
    }

    async fn commit_signed_out(&self) {
        self.queries.clear();
        self.commit(|s| *s = AuthState::signed_out(None)).await;
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, AuthError> {
        self.set_loading(true);
        match self.service.sign_in(email, password).await {
            Ok(session) => {
                let user = session.user.clone();
                self.queries.clear();
                self.commit(|s| {
                    s.user = Some(session.user);
                    s.token = Some(session.tokens.access_token);
                    s.is_authenticated = true;
                    s.is_loading = false;
                })
                .await;
                Ok(user)
            }
            Err(e) => {
                self.set_loading(false);
                Err(e)
            }
        }
    }

    pub async fn logout(&self) {
        self.set_loading(true);
        self.service.sign_out().await;
        self.commit_signed_out().await;
        info!(
            event_name = "session.logout",
            event_domain = "session",
            "session cleared"
        );
    }

    /// Resolve the stored session into state. Safe to call any number of times.
    pub async fn check_auth(&self) -> bool {
        self.set_loading(true);
        let Some(tokens) = self.service.get_session().await else {
            debug!("No usable session found");
            self.commit_signed_out().await;
            return false;
        };

        let user = self.service.get_current_user().await;
        self.commit(|s| {
            s.user = user;
            s.token = Some(tokens.access_token);
            s.is_authenticated = true;
            s.is_loading = false;
        })
        .await;
        true
    }

    /// Refresh the access token; a failed refresh signs the session out.
    pub async fn refresh_token(&self) -> bool {
        self.set_loading(true);
        match self.service.refresh_token().await {
            Some(tokens) => {
                self.commit(|s| {
                    s.token = Some(tokens.access_token);
                    s.is_authenticated = true;
                    s.is_loading = false;
                })
                .await;
                true
            }
            None => {
                self.commit_signed_out().await;
                false
            }
        }
    }

    pub async fn set_active_tenant(&self, tenant_id: Option<String>) {
        if self.state.borrow().active_tenant_id != tenant_id {
            self.queries.clear();
        }
        self.commit(|s| s.active_tenant_id = tenant_id).await;
    }

    /// Credentials for one guarded request.
    ///
    /// The stored access token is checked for expiry first: an expired token
    /// is refreshed and the new one written into the state; a session that
    /// cannot be kept alive is signed out and `None` is returned.
    pub async fn request_auth(&self) -> Option<RequestAuth> {
        let Some(tokens) = self.service.get_session().await else {
            let was_authenticated = self.state.borrow().is_authenticated;
            if was_authenticated {
                warn!(
                    event_name = "session.expired",
                    event_domain = "session",
                    "session could not be renewed, signing out"
                );
                self.commit_signed_out().await;
            }
            return None;
        };

        let stale = self.state.borrow().token.as_deref() != Some(tokens.access_token.as_str());
        if stale {
            debug!("Access token renewed, updating session state");
            self.commit(|s| s.token = Some(tokens.access_token)).await;
        }

        let state = self.snapshot();
        if state.can_make_api_calls() {
            Some(state.request_auth())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenPair;
    use crate::session::query::QueryKey;
    use crate::test_support::{context_for, jwt_expiring_in, sample_user, service_for};
    use mockito::Server;
    use serde_json::json;

    #[tokio::test]
    async fn test_check_auth_is_idempotent() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/Auth/user-info")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id": "u-1", "email": "ada@clinic.test", "firstName": "Ada",
                    "lastName": "Lovelace", "tenantId": "t-1", "role": "practitioner", "emailVerified": true}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let (service, _) = service_for(server.url()).await;
        let tokens = TokenPair::new(jwt_expiring_in(3600), None, Some("r".to_string()));
        service
            .token_store()
            .save(&tokens, &sample_user())
            .await
            .unwrap();
        let context = context_for(service).await;

        assert!(context.check_auth().await);
        let first = context.snapshot();
        assert!(context.check_auth().await);
        let second = context.snapshot();

        assert_eq!(first, second);
        assert!(first.is_authenticated);
        assert!(!first.is_loading);
        assert_eq!(first.token.as_deref(), Some(tokens.access_token.as_str()));
        assert_eq!(first.user, Some(sample_user()));
    }

    #[tokio::test]
    async fn test_check_auth_without_session() {
        let server = Server::new_async().await;
        let (service, _) = service_for(server.url()).await;
        let context = context_for(service).await;

        assert!(!context.check_auth().await);
        let state = context.snapshot();
        assert!(!state.is_authenticated);
        assert!(!state.is_loading);
        assert!(state.token.is_none());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_prior_state() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/Auth/login")
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "Account is disabled"}"#)
            .create_async()
            .await;

        let (service, _) = service_for(server.url()).await;
        let context = context_for(service).await;
        context.set_active_tenant(Some("t-9".to_string())).await;
        let before = context.snapshot();

        let err = context.login("ada@clinic.test", "pw").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Your account has been disabled. Please contact support."
        );
        assert_eq!(context.snapshot(), before);
    }

    #[tokio::test]
    async fn test_login_then_logout_persists_slice() {
        let mut server = Server::new_async().await;
        let access = jwt_expiring_in(3600);
        let _login = server
            .mock("POST", "/api/Auth/login")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"accessToken": access, "userInfo": {"tenantId": "t-1"}}).to_string())
            .create_async()
            .await;
        let _logout = server
            .mock("POST", "/api/Auth/logout")
            .with_status(204)
            .create_async()
            .await;

        let (service, storage) = service_for(server.url()).await;
        let context = context_for(service).await;

        let user = context.login("ada@clinic.test", "pw").await.unwrap();
        assert_eq!(user.email, "ada@clinic.test");
        let state = context.snapshot();
        assert!(state.can_make_api_calls());

        let persisted = storage.get_item(PERSISTED_AUTH_KEY).await.unwrap().unwrap();
        let envelope: PersistedEnvelope = serde_json::from_str(&persisted).unwrap();
        assert!(envelope.state.is_authenticated);
        assert!(!persisted.contains(&access));

        context.logout().await;
        let state = context.snapshot();
        assert!(!state.is_authenticated);
        assert!(state.user.is_none());
        let persisted = storage.get_item(PERSISTED_AUTH_KEY).await.unwrap().unwrap();
        let envelope: PersistedEnvelope = serde_json::from_str(&persisted).unwrap();
        assert!(!envelope.state.is_authenticated);
    }

    #[tokio::test]
    async fn test_refresh_failure_clears_state() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/Auth/refresh-token")
            .with_status(401)
            .create_async()
            .await;

        let (service, _) = service_for(server.url()).await;
        let tokens = TokenPair::new(jwt_expiring_in(3600), None, Some("r".to_string()));
        service
            .token_store()
            .save(&tokens, &sample_user())
            .await
            .unwrap();
        let context = context_for(service).await;

        assert!(!context.refresh_token().await);
        assert_eq!(context.snapshot(), AuthState::default());
        assert!(context.service().token_store().tokens().await.is_none());
    }

    #[tokio::test]
    async fn test_active_tenant_restored_from_persisted_slice() {
        let server = Server::new_async().await;
        let (service, storage) = service_for(server.url()).await;
        storage
            .set_item(
                PERSISTED_AUTH_KEY,
                r#"{"state": {"user": null, "isAuthenticated": true, "activeTenantId": "t-7"}, "version": 0}"#
                    .to_string(),
            )
            .await
            .unwrap();

        let context = context_for(service).await;
        let state = context.snapshot();
        assert_eq!(state.active_tenant_id.as_deref(), Some("t-7"));
        // Authentication is never taken from the persisted slice
        assert!(!state.is_authenticated);
    }

    #[tokio::test]
    async fn test_query_cache_follows_user_and_tenant() {
        let server = Server::new_async().await;
        let (service, _) = service_for(server.url()).await;
        let context = context_for(service).await;
        let key = QueryKey::new(["clinicAnalytics", "dashboard"]);

        context.set_active_tenant(Some("t-1".to_string())).await;
        context.queries().set(&key, 1u32);
        context.set_active_tenant(Some("t-1".to_string())).await;
        assert_eq!(context.queries().get::<u32>(&key), Some(1));

        context.set_active_tenant(Some("t-2".to_string())).await;
        assert_eq!(context.queries().get::<u32>(&key), None);

        context.queries().set(&key, 2u32);
        context.logout().await;
        assert_eq!(context.queries().get::<u32>(&key), None);
    }
}
