use serde::{Deserialize, Serialize};

/// RFC 7807 problem details, as returned by the clinic API on failures.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub status: Option<u16>,
    pub detail: Option<String>,
    pub instance: Option<String>,
    pub errors: Option<std::collections::HashMap<String, Vec<String>>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, timeout, ...).
    #[error("network error: {0}")]
    Network(String),
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        problem: Option<ProblemDetails>,
    },
    #[error("invalid response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status of the failure; 0 when no response was received.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Status { status, .. } => *status,
            _ => 0,
        }
    }

    /// Failures worth retrying: no response at all, or a gateway-level status.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => matches!(status, 502 | 503 | 504),
            _ => false,
        }
    }

    /// The server-provided explanation, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status {
                problem: Some(ProblemDetails {
                    detail: Some(detail),
                    ..
                }),
                ..
            } => Some(detail.as_str()),
            ApiError::Status { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}
