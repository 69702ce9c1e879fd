use serde::{Deserialize, Serialize};

/// The access/id/refresh token triple owned by the token store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub id_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenPair {
    /// The access token doubles as the id token when the provider sends none.
    pub fn new(access_token: String, id_token: Option<String>, refresh_token: Option<String>) -> Self {
        let id_token = id_token
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| access_token.clone());
        TokenPair {
            access_token,
            id_token,
            refresh_token,
        }
    }

    /// Apply a refresh response: access and id tokens are replaced, the refresh token is kept.
    pub fn refreshed(&self, response: RefreshResponse) -> TokenPair {
        TokenPair::new(
            response.access_token,
            response.id_token,
            self.refresh_token.clone(),
        )
    }
}

/// Body of a successful `POST /api/Auth/login`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user_info: Option<super::user::UserInfo>,
}

/// Body of a successful `POST /api/Auth/refresh-token`.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
}
