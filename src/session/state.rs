use serde::{Deserialize, Serialize};

use crate::client::RequestAuth;
use crate::models::UserProfile;

/// Storage key of the persisted auth slice. Tokens are never written under it.
pub const PERSISTED_AUTH_KEY: &str = "clinic-auth-storage";

/// The single auth state of a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub active_tenant_id: Option<String>,
}

impl AuthState {
    pub fn can_make_api_calls(&self) -> bool {
        self.is_authenticated && !self.is_loading
    }

    /// Headers for dashboard requests: the bearer, the active tenant (else the
    /// user's own) and the user's clinic.
    pub fn request_auth(&self) -> RequestAuth {
        RequestAuth {
            token: self.token.clone(),
            tenant_id: self
                .active_tenant_id
                .clone()
                .or_else(|| self.user.as_ref().and_then(|u| u.tenant_id.clone())),
            clinic_id: self.user.as_ref().and_then(|u| u.clinic_id.clone()),
        }
    }

    pub(crate) fn signed_out(active_tenant_id: Option<String>) -> Self {
        AuthState {
            active_tenant_id,
            ..AuthState::default()
        }
    }
}

/// The persisted part of the auth state.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedAuth {
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
    pub active_tenant_id: Option<String>,
}

/// On-disk envelope: `{"state": {...}, "version": 0}`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PersistedEnvelope {
    pub state: PersistedAuth,
    #[serde(default)]
    pub version: u32,
}

impl From<&AuthState> for PersistedEnvelope {
    fn from(state: &AuthState) -> Self {
        PersistedEnvelope {
            state: PersistedAuth {
                user: state.user.clone(),
                is_authenticated: state.is_authenticated,
                active_tenant_id: state.active_tenant_id.clone(),
            },
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_user;

    #[test]
    fn test_guard_condition() {
        let mut state = AuthState::default();
        assert!(!state.can_make_api_calls());
        state.is_authenticated = true;
        assert!(state.can_make_api_calls());
        state.is_loading = true;
        assert!(!state.can_make_api_calls());
    }

    #[test]
    fn test_request_auth_prefers_active_tenant() {
        let mut state = AuthState {
            user: Some(sample_user()),
            token: Some("tok".to_string()),
            is_authenticated: true,
            ..Default::default()
        };
        assert_eq!(state.request_auth().tenant_id.as_deref(), Some("t-1"));

        state.active_tenant_id = Some("t-2".to_string());
        let auth = state.request_auth();
        assert_eq!(auth.tenant_id.as_deref(), Some("t-2"));
        assert_eq!(auth.clinic_id.as_deref(), Some("t-1"));
        assert_eq!(auth.token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_persisted_slice_has_no_tokens() {
        let state = AuthState {
            user: Some(sample_user()),
            token: Some("secret-token".to_string()),
            is_authenticated: true,
            is_loading: false,
            active_tenant_id: Some("t-1".to_string()),
        };
        let json = serde_json::to_string(&PersistedEnvelope::from(&state)).unwrap();
        assert!(!json.contains("secret-token"));
        assert!(json.contains("\"isAuthenticated\":true"));
        assert!(json.contains("\"activeTenantId\":\"t-1\""));
    }
}
