use tokio::sync::watch;

use super::query::QueryError;
use super::state::AuthState;

/// Answers "is it safe to call the API right now?" for one consumer.
#[derive(Clone)]
pub struct AuthGuard {
    state: watch::Receiver<AuthState>,
}

impl AuthGuard {
    pub fn new(state: watch::Receiver<AuthState>) -> Self {
        Self { state }
    }

    pub fn can_make_api_calls(&self) -> bool {
        self.state.borrow().can_make_api_calls()
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Wait until authentication has resolved to a signed-in, non-loading state.
    pub async fn ready(&mut self) -> Result<AuthState, QueryError> {
        let state = self
            .state
            .wait_for(AuthState::can_make_api_calls)
            .await
            .map_err(|_| QueryError::SessionClosed)?;
        Ok(state.clone())
    }
}
