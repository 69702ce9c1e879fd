use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::{ApiError, ProblemDetails};
use crate::config::ApiConfig;

/// Credentials and tenant scoping attached to a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestAuth {
    pub token: Option<String>,
    pub tenant_id: Option<String>,
    pub clinic_id: Option<String>,
}

impl RequestAuth {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

/// A thin JSON client bound to the clinic API base URL.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_in_ms))
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy {
                retries: config.retries,
                backoff: Duration::from_millis(config.backoff_ms),
            },
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// GET with retries on transient failures.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        auth: &RequestAuth,
    ) -> Result<T, ApiError> {
        self.send_with_retry(Method::GET, path, query, None, auth)
            .await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        auth: &RequestAuth,
    ) -> Result<T, ApiError> {
        self.send(Method::POST, path, &[], Some(body), auth).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        auth: &RequestAuth,
    ) -> Result<T, ApiError> {
        self.send(Method::PUT, path, &[], Some(body), auth).await
    }

    /// Retry `send` while the failure is transient, waiting `backoff * attempt` in between.
    pub async fn send_with_retry<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        auth: &RequestAuth,
    ) -> Result<T, ApiError> {
        let mut attempt = 0;
        loop {
            match self.send(method.clone(), path, query, body, auth).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.retry.retries => {
                    attempt += 1;
                    warn!(
                        event_name = "client.request.retry",
                        event_domain = "client",
                        path,
                        attempt,
                        status = e.status(),
                        "transient failure, retrying: {}",
                        e
                    );
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        auth: &RequestAuth,
    ) -> Result<T, ApiError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut request = self
            .http
            .request(method.clone(), self.url(path))
            .header(ACCEPT, "application/json")
            .header("X-Request-ID", &request_id);

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").json(body);
        }
        if let Some(token) = &auth.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(tenant_id) = &auth.tenant_id {
            request = request.header("X-Tenant-Id", tenant_id);
        }
        if let Some(clinic_id) = &auth.clinic_id {
            request = request.header("X-Clinic-Id", clinic_id);
        }

        debug!("Sending {} {} (request id {})", method, path, request_id);
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status, is_json, &bytes));
        }

        let value = if status == StatusCode::NO_CONTENT || bytes.is_empty() {
            Value::Null
        } else if is_json {
            serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
                path: path.to_string(),
                source,
            })?
        } else {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        };

        serde_json::from_value(value).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

fn status_error(status: StatusCode, is_json: bool, body: &[u8]) -> ApiError {
    let fallback = status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string();

    let problem = if is_json {
        serde_json::from_slice::<ProblemDetails>(body).ok()
    } else {
        None
    };
    let message = problem
        .as_ref()
        .and_then(|p| p.title.clone().or_else(|| p.detail.clone()))
        .unwrap_or(fallback);

    ApiError::Status {
        status: status.as_u16(),
        message,
        problem,
    }
}
