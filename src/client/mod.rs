//! JSON-over-HTTP plumbing shared by the identity and dashboard endpoints.

pub mod api_client;
pub mod error;

pub use api_client::{ApiClient, RequestAuth, RetryPolicy};
pub use error::{ApiError, ProblemDetails};
