use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::expiry::{self, ExpiryPolicy, TokenStatus};
use super::messages::SignInFailure;
use crate::client::{ApiClient, ApiError, RequestAuth};
use crate::models::token::{LoginResponse, RefreshResponse};
use crate::models::user::UserInfo;
use crate::models::{Role, TokenPair, UserProfile};
use crate::store::TokenStore;
use crate::utils::log_throttle::LogThrottle;

const LOGIN_PATH: &str = "/api/Auth/login";
const REFRESH_PATH: &str = "/api/Auth/refresh-token";
const LOGOUT_PATH: &str = "/api/Auth/logout";
const USER_INFO_PATH: &str = "/api/Auth/user-info";
const SIGNUP_PATH: &str = "/api/Auth/signup";
const VERIFY_EMAIL_PATH: &str = "/api/EmailVerification/verify";
const FORGOT_PASSWORD_PATH: &str = "/api/Auth/forgot-password";
const CONFIRM_RESET_PATH: &str = "/api/Auth/confirm-forgot-password";

const DECODE_WARNING_WINDOW: Duration = Duration::from_secs(60);

/// Tokens and profile produced by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub tokens: TokenPair,
    pub user: UserProfile,
}

/// Registration form for a new clinic staff account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpData {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    #[serde(rename = "tenantId")]
    pub clinic_id: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
}

/// A sign-up waiting for email confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpResult {
    pub user_id: Option<String>,
    /// Where the confirmation link was sent.
    pub destination: String,
}

/// Talks to the identity endpoints and keeps the token store in step with them.
pub struct AuthSessionService {
    client: ApiClient,
    store: TokenStore,
    policy: ExpiryPolicy,
    decode_warnings: LogThrottle,
    events: broadcast::Sender<bool>,
}

impl AuthSessionService {
    pub fn new(client: ApiClient, store: TokenStore, policy: ExpiryPolicy) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            client,
            store,
            policy,
            decode_warnings: LogThrottle::new(DECODE_WARNING_WINDOW),
            events,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    /// Authentication changes: `true` after a sign-in, `false` after any sign-out or forced logout.
    pub fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.events.subscribe()
    }

    fn notify(&self, authenticated: bool) {
        // No subscribers is fine
        let _ = self.events.send(authenticated);
    }

    /// Drop all local session state. Storage failures are logged; the in-memory copy is gone regardless.
    async fn clear_session(&self) {
        if let Err(e) = self.store.clear().await {
            warn!("Failed to clear stored session: {}", e);
        }
        self.notify(false);
    }

    pub async fn cached_user(&self) -> Option<UserProfile> {
        self.store.user().await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionResult, AuthError> {
        let body = json!({ "username": email, "password": password });
        let response: LoginResponse = match self
            .client
            .post(LOGIN_PATH, &body, &RequestAuth::anonymous())
            .await
        {
            Ok(response) => response,
            Err(e @ ApiError::Decode { .. }) => return Err(AuthError::Schema(e.to_string())),
            Err(e) => {
                let failure = SignInFailure::classify(&e);
                warn!(
                    event_name = "auth.sign_in.failed",
                    event_domain = "auth",
                    status = e.status(),
                    outcome = ?failure,
                    "sign-in rejected: {}",
                    e
                );
                return Err(AuthError::Credentials(failure));
            }
        };

        if response.access_token.trim().is_empty() {
            return Err(AuthError::Schema("accessToken is empty".to_string()));
        }

        let user = UserProfile::from_user_info(response.user_info.unwrap_or_default(), email);
        let tokens = TokenPair::new(
            response.access_token,
            response.id_token,
            response.refresh_token,
        );
        self.store.save(&tokens, &user).await?;
        self.notify(true);

        info!(
            event_name = "auth.sign_in.succeeded",
            event_domain = "auth",
            user_id = user.id.as_str(),
            role = user.role.as_str(),
            "user signed in"
        );
        Ok(SessionResult { tokens, user })
    }

    /// Current tokens, refreshed once if the access token has expired.
    ///
    /// Returns `None` (after clearing everything) when the session cannot be kept alive.
    pub async fn get_session(&self) -> Option<TokenPair> {
        let tokens = self.store.tokens().await?;
        let status = expiry::inspect(&tokens.access_token);
        if let TokenStatus::Undecodable(reason) = &status {
            if let Some(suppressed_count) = self.decode_warnings.admit() {
                warn!(
                    event_name = "auth.expiry.decode_error",
                    event_domain = "auth",
                    assume_valid = self.policy.assume_valid_on_decode_error,
                    suppressed_count,
                    "could not read access token expiry: {}",
                    reason
                );
            }
        }
        if self.policy.is_usable(&status) {
            return Some(tokens);
        }

        if tokens.refresh_token.is_some() {
            debug!("Access token expired ({:?}), refreshing", status);
            return self.refresh_token().await;
        }

        info!(
            event_name = "auth.session.expired",
            event_domain = "auth",
            "access token expired and no refresh token is available"
        );
        self.clear_session().await;
        None
    }

    /// Exchange the refresh token for new access/id tokens. Any failure is a forced logout.
    pub async fn refresh_token(&self) -> Option<TokenPair> {
        let current = self.store.tokens().await?;
        let refresh_token = current.refresh_token.clone()?;

        let body = json!({ "refreshToken": refresh_token });
        let result: Result<RefreshResponse, ApiError> = self
            .client
            .post(REFRESH_PATH, &body, &RequestAuth::anonymous())
            .await;

        let refreshed = match result {
            Ok(response) if !response.access_token.trim().is_empty() => {
                let next = current.refreshed(response);
                match self.store.save_tokens(&next).await {
                    Ok(()) => Ok(next),
                    Err(e) => Err(e.to_string()),
                }
            }
            Ok(_) => Err("refresh response has an empty accessToken".to_string()),
            Err(e) => Err(e.to_string()),
        };

        match refreshed {
            Ok(next) => {
                debug!("Session tokens refreshed");
                Some(next)
            }
            Err(reason) => {
                warn!(
                    event_name = "auth.refresh.failed",
                    event_domain = "auth",
                    "token refresh failed, signing out: {}",
                    reason
                );
                self.clear_session().await;
                None
            }
        }
    }

    /// Fresh claims from the identity endpoint, or the last known profile when that fails.
    pub async fn get_current_user(&self) -> Option<UserProfile> {
        let session = self.store.load().await;
        let tokens = session.tokens?;

        let auth = RequestAuth::bearer(tokens.access_token);
        match self.client.get::<UserInfo>(USER_INFO_PATH, &[], &auth).await {
            Ok(info) => {
                let fallback_email = session
                    .user
                    .as_ref()
                    .map(|u| u.email.clone())
                    .unwrap_or_default();
                let user = UserProfile::from_user_info(info, &fallback_email);
                if let Err(e) = self.store.save_user(&user).await {
                    warn!("Failed to persist refreshed user profile: {}", e);
                }
                Some(user)
            }
            Err(e) => {
                warn!(
                    event_name = "auth.user_info.fallback",
                    event_domain = "auth",
                    status = e.status(),
                    "using cached profile, user-info failed: {}",
                    e
                );
                session.user
            }
        }
    }

    /// Best-effort remote logout followed by an unconditional local clear.
    pub async fn sign_out(&self) {
        let auth = match self.store.tokens().await {
            Some(tokens) => RequestAuth::bearer(tokens.access_token),
            None => RequestAuth::anonymous(),
        };
        if let Err(e) = self
            .client
            .post::<Value>(LOGOUT_PATH, &json!({}), &auth)
            .await
        {
            debug!("Ignoring remote logout failure: {}", e);
        }
        self.clear_session().await;
        info!(
            event_name = "auth.sign_out",
            event_domain = "auth",
            "user signed out"
        );
    }

    pub async fn is_authenticated(&self) -> bool {
        self.get_session().await.is_some()
    }

    pub async fn sign_up(&self, data: &SignUpData) -> Result<SignUpResult, AuthError> {
        let body = serde_json::to_value(data).map_err(|e| AuthError::Schema(e.to_string()))?;
        let response: Value = self
            .client
            .post(SIGNUP_PATH, &body, &RequestAuth::anonymous())
            .await
            .map_err(|e| rejected(e, "Unable to create account. Please try again."))?;

        Ok(SignUpResult {
            user_id: response
                .get("userSub")
                .and_then(Value::as_str)
                .map(str::to_string),
            destination: data.email.clone(),
        })
    }

    pub async fn confirm_sign_up(&self, code: &str) -> Result<(), AuthError> {
        self.client
            .post::<Value>(VERIFY_EMAIL_PATH, &json!({ "token": code }), &RequestAuth::anonymous())
            .await
            .map_err(|e| rejected(e, "Unable to verify email. Please try again."))?;
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        self.client
            .post::<Value>(FORGOT_PASSWORD_PATH, &json!({ "email": email }), &RequestAuth::anonymous())
            .await
            .map_err(|e| {
                warn!("Forgot password request failed: {}", e);
                AuthError::Rejected("Unable to reset password. Please try again.".to_string())
            })?;
        Ok(())
    }

    pub async fn confirm_reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let body = json!({ "email": email, "code": code, "newPassword": new_password });
        self.client
            .post::<Value>(CONFIRM_RESET_PATH, &body, &RequestAuth::anonymous())
            .await
            .map_err(|e| {
                warn!("Confirm reset password failed: {}", e);
                AuthError::Rejected("Unable to reset password. Please try again.".to_string())
            })?;
        Ok(())
    }
}

/// Surface the server's problem detail when there is one, otherwise `fallback`.
fn rejected(error: ApiError, fallback: &str) -> AuthError {
    let detail = match &error {
        ApiError::Status {
            problem: Some(problem),
            ..
        } => problem.detail.clone(),
        _ => None,
    };
    warn!("Identity request failed: {}", error);
    AuthError::Rejected(detail.unwrap_or_else(|| fallback.to_string()))
}
