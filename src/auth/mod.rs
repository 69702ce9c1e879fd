pub mod error;
pub mod expiry;
pub mod messages;
pub mod service;

// Re-export from service.rs so we can do "use crate::auth::AuthSessionService;"
pub use error::AuthError;
pub use expiry::{ExpiryPolicy, TokenStatus};
pub use messages::SignInFailure;
pub use service::{AuthSessionService, SessionResult, SignUpData};
