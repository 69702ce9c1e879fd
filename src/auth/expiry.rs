//! Access-token expiry inspection.
//!
//! Only the `exp` claim of the payload segment is read; signatures are the
//! server's business.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Valid { expires_at: DateTime<Utc> },
    Expired { expired_at: DateTime<Utc> },
    Undecodable(String),
}

/// What to do with a token whose expiry cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    /// `true` keeps using an undecodable token (fail open); `false` treats it as expired.
    pub assume_valid_on_decode_error: bool,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            assume_valid_on_decode_error: true,
        }
    }
}

impl ExpiryPolicy {
    /// Whether the token may be used as-is, without a refresh.
    pub fn is_usable(&self, status: &TokenStatus) -> bool {
        match status {
            TokenStatus::Valid { .. } => true,
            TokenStatus::Expired { .. } => false,
            TokenStatus::Undecodable(_) => self.assume_valid_on_decode_error,
        }
    }
}

/// Read the `exp` claim (seconds since the epoch) of a JWT.
pub fn decode_expiry(token: &str) -> Result<DateTime<Utc>, String> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or("token has no payload segment")?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| format!("payload is not base64url: {}", e))?;
    let claims: Value =
        serde_json::from_slice(&bytes).map_err(|e| format!("payload is not JSON: {}", e))?;
    let exp = claims
        .get("exp")
        .and_then(Value::as_f64)
        .ok_or("payload has no numeric exp claim")?;

    Utc.timestamp_millis_opt((exp * 1000.0) as i64)
        .single()
        .ok_or_else(|| format!("exp claim {} is out of range", exp))
}

/// Classify a token against `now`. A token is expired from its `exp` instant onwards.
pub fn inspect_at(token: &str, now: DateTime<Utc>) -> TokenStatus {
    match decode_expiry(token) {
        Ok(expires_at) if now >= expires_at => TokenStatus::Expired {
            expired_at: expires_at,
        },
        Ok(expires_at) => TokenStatus::Valid { expires_at },
        Err(reason) => TokenStatus::Undecodable(reason),
    }
}

pub fn inspect(token: &str) -> TokenStatus {
    inspect_at(token, Utc::now())
}
