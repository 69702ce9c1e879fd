use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::context::SessionContext;
use crate::api::TenantsApi;
use crate::models::tenant::preferred_tenant;
use crate::models::TenantOption;

/// Where the guard is in resolving access to a protected route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardState {
    CheckingAuth,
    CheckingTenant,
    AuthenticatedWithTenant { tenants: Vec<TenantOption> },
    AuthenticatedNoTenant,
    Unauthenticated,
}

/// What a protected route should show for the current guard state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardView {
    Children { show_tenant_switcher: bool },
    Spinner,
    Navigate { to: String },
}

/// Sequences the session check before the tenant check and decides what a
/// protected route renders.
pub struct RouteGuard {
    context: Arc<SessionContext>,
    tenants: TenantsApi,
    login_path: String,
    registration_path: String,
    state: watch::Sender<GuardState>,
}

impl RouteGuard {
    pub fn new(
        context: Arc<SessionContext>,
        login_path: impl Into<String>,
        registration_path: impl Into<String>,
    ) -> Self {
        let tenants = TenantsApi::new(context.service().client().clone());
        let (state, _) = watch::channel(GuardState::CheckingAuth);
        Self {
            context,
            tenants,
            login_path: login_path.into(),
            registration_path: registration_path.into(),
            state,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.state.subscribe()
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// Run the auth check, then the tenant check, and return the view for `path`.
    pub async fn resolve(&self, path: &str) -> GuardView {
        self.state.send_replace(GuardState::CheckingAuth);
        if !self.context.check_auth().await {
            self.state.send_replace(GuardState::Unauthenticated);
            return self.view(path);
        }

        self.state.send_replace(GuardState::CheckingTenant);
        let next = self.check_tenants().await;
        debug!("Route guard resolved {} to {:?}", path, next);
        self.state.send_replace(next);
        self.view(path)
    }

    async fn check_tenants(&self) -> GuardState {
        let session = self.context.snapshot();
        let tenants = match self.tenants.list(&session.request_auth()).await {
            Ok(tenants) => tenants,
            Err(e) => {
                warn!(
                    event_name = "session.tenants.fallback",
                    event_domain = "session",
                    status = e.status(),
                    "tenant list unavailable, falling back to the user's tenant: {}",
                    e
                );
                match session.user.as_ref().and_then(|u| u.tenant_id.clone()) {
                    Some(id) => vec![TenantOption {
                        name: id.clone(),
                        id,
                        is_default: true,
                    }],
                    None => return GuardState::AuthenticatedWithTenant { tenants: vec![] },
                }
            }
        };

        if tenants.is_empty() {
            info!(
                event_name = "session.tenants.none",
                event_domain = "session",
                "user has no clinic yet"
            );
            return GuardState::AuthenticatedNoTenant;
        }

        let active_is_listed = session
            .active_tenant_id
            .as_deref()
            .map(|active| tenants.iter().any(|t| t.id == active))
            .unwrap_or(false);
        if !active_is_listed {
            if let Some(tenant) = preferred_tenant(&tenants) {
                debug!("Selecting tenant {}", tenant.id);
                self.context
                    .set_active_tenant(Some(tenant.id.clone()))
                    .await;
            }
        }
        GuardState::AuthenticatedWithTenant { tenants }
    }

    /// The view for `path` under the current state, without re-checking anything.
    pub fn view(&self, path: &str) -> GuardView {
        match &*self.state.borrow() {
            GuardState::CheckingAuth | GuardState::CheckingTenant => GuardView::Spinner,
            GuardState::Unauthenticated => GuardView::Navigate {
                to: self.login_path.clone(),
            },
            GuardState::AuthenticatedNoTenant if path == self.registration_path => {
                GuardView::Children {
                    show_tenant_switcher: false,
                }
            }
            GuardState::AuthenticatedNoTenant => GuardView::Navigate {
                to: self.registration_path.clone(),
            },
            GuardState::AuthenticatedWithTenant { tenants } => GuardView::Children {
                show_tenant_switcher: tenants.len() > 1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenPair;
    use crate::test_support::{context_for, jwt_expiring_in, sample_user, service_for};
    use mockito::{Mock, Server, ServerGuard};

    async fn signed_in_guard(server: &ServerGuard) -> RouteGuard {
        let (service, _) = service_for(server.url()).await;
        let tokens = TokenPair::new(jwt_expiring_in(3600), None, Some("r".to_string()));
        service
            .token_store()
            .save(&tokens, &sample_user())
            .await
            .unwrap();
        let context = context_for(service).await;
        RouteGuard::new(context, "/login", "/clinic-registration")
    }

    async fn tenants_mock(server: &mut ServerGuard, body: &str) -> Mock {
        server
            .mock("GET", "/tenants")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_starts_with_spinner() {
        let server = Server::new_async().await;
        let guard = signed_in_guard(&server).await;
        assert_eq!(guard.state(), GuardState::CheckingAuth);
        assert_eq!(guard.view("/dashboard"), GuardView::Spinner);
    }

    #[tokio::test]
    async fn test_unauthenticated_goes_to_login() {
        let server = Server::new_async().await;
        let (service, _) = service_for(server.url()).await;
        let guard = RouteGuard::new(
            context_for(service).await,
            "/login",
            "/clinic-registration",
        );

        let view = guard.resolve("/dashboard").await;
        assert_eq!(
            view,
            GuardView::Navigate {
                to: "/login".to_string()
            }
        );
        assert_eq!(guard.state(), GuardState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_zero_tenants_goes_to_registration() {
        let mut server = Server::new_async().await;
        let _t = tenants_mock(&mut server, "[]").await;
        let guard = signed_in_guard(&server).await;

        assert_eq!(
            guard.resolve("/dashboard").await,
            GuardView::Navigate {
                to: "/clinic-registration".to_string()
            }
        );
        assert_eq!(guard.state(), GuardState::AuthenticatedNoTenant);
        // Already on the registration page: render it
        assert_eq!(
            guard.view("/clinic-registration"),
            GuardView::Children {
                show_tenant_switcher: false
            }
        );
    }

    #[tokio::test]
    async fn test_single_tenant_renders_without_switcher() {
        let mut server = Server::new_async().await;
        let _t = tenants_mock(&mut server, r#"[{"id": "t-1", "name": "North"}]"#).await;
        let guard = signed_in_guard(&server).await;

        assert_eq!(
            guard.resolve("/dashboard").await,
            GuardView::Children {
                show_tenant_switcher: false
            }
        );
        assert_eq!(
            guard.context().snapshot().active_tenant_id.as_deref(),
            Some("t-1")
        );
    }

    #[tokio::test]
    async fn test_several_tenants_select_default_and_show_switcher() {
        let mut server = Server::new_async().await;
        let _t = tenants_mock(
            &mut server,
            r#"[{"id": "t-1", "name": "North"}, {"id": "t-2", "name": "South", "isDefault": true}]"#,
        )
        .await;
        let guard = signed_in_guard(&server).await;
        guard
            .context()
            .set_active_tenant(Some("gone".to_string()))
            .await;

        assert_eq!(
            guard.resolve("/dashboard").await,
            GuardView::Children {
                show_tenant_switcher: true
            }
        );
        assert_eq!(
            guard.context().snapshot().active_tenant_id.as_deref(),
            Some("t-2")
        );
    }

    #[tokio::test]
    async fn test_tenant_failure_falls_back_to_user_tenant() {
        let mut server = Server::new_async().await;
        let _t = server
            .mock("GET", "/tenants")
            .with_status(500)
            .create_async()
            .await;
        let guard = signed_in_guard(&server).await;

        assert_eq!(
            guard.resolve("/dashboard").await,
            GuardView::Children {
                show_tenant_switcher: false
            }
        );
        match guard.state() {
            GuardState::AuthenticatedWithTenant { tenants } => {
                assert_eq!(tenants.len(), 1);
                assert_eq!(tenants[0].id, "t-1");
            }
            other => panic!("unexpected state {:?}", other),
        }
    }
}
