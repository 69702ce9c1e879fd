use super::messages::SignInFailure;
use crate::client::ApiError;
use crate::store::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A sign-in failure carrying the message shown to the user.
    #[error("{0}")]
    Credentials(SignInFailure),
    #[error("not authenticated")]
    NotAuthenticated,
    /// The identity endpoint answered with a body that does not match its schema.
    #[error("invalid identity response: {0}")]
    Schema(String),
    /// A form action failed; the message is safe to show.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
