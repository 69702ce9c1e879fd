use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{Storage, StorageError};
use crate::models::{TokenPair, UserProfile};

pub const AUTH_TOKENS_KEY: &str = "authTokens";
pub const CURRENT_USER_KEY: &str = "currentUser";
/// The bare access token, read by request helpers that only need the bearer.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// What the token store knows about the current session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredSession {
    pub tokens: Option<TokenPair>,
    pub user: Option<UserProfile>,
}

/// Owns the session token pair and the cached user profile.
///
/// Values are read from storage once when the store is opened and kept in
/// memory afterwards; every mutation writes through to storage first.
pub struct TokenStore {
    storage: Arc<dyn Storage>,
    current: RwLock<StoredSession>,
}

impl TokenStore {
    pub async fn open(storage: Arc<dyn Storage>) -> Result<Self, StorageError> {
        let tokens = read_json::<TokenPair>(storage.as_ref(), AUTH_TOKENS_KEY).await?;
        let user = read_json::<UserProfile>(storage.as_ref(), CURRENT_USER_KEY).await?;
        debug!(
            "Token store opened (tokens present: {}, user present: {})",
            tokens.is_some(),
            user.is_some()
        );
        Ok(Self {
            storage,
            current: RwLock::new(StoredSession { tokens, user }),
        })
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        self.storage.clone()
    }

    /// Persist tokens and user together.
    pub async fn save(&self, tokens: &TokenPair, user: &UserProfile) -> Result<(), StorageError> {
        let mut current = self.current.write().await;
        self.storage
            .set_items(&[
                (AUTH_TOKENS_KEY, encode(AUTH_TOKENS_KEY, tokens)?),
                (CURRENT_USER_KEY, encode(CURRENT_USER_KEY, user)?),
                (AUTH_TOKEN_KEY, tokens.access_token.clone()),
            ])
            .await?;
        *current = StoredSession {
            tokens: Some(tokens.clone()),
            user: Some(user.clone()),
        };
        Ok(())
    }

    /// Replace the token pair only (refresh path).
    pub async fn save_tokens(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        let mut current = self.current.write().await;
        self.storage
            .set_items(&[
                (AUTH_TOKENS_KEY, encode(AUTH_TOKENS_KEY, tokens)?),
                (AUTH_TOKEN_KEY, tokens.access_token.clone()),
            ])
            .await?;
        current.tokens = Some(tokens.clone());
        Ok(())
    }

    /// Replace the cached profile only (user-info path).
    pub async fn save_user(&self, user: &UserProfile) -> Result<(), StorageError> {
        let mut current = self.current.write().await;
        self.storage
            .set_item(CURRENT_USER_KEY, encode(CURRENT_USER_KEY, user)?)
            .await?;
        current.user = Some(user.clone());
        Ok(())
    }

    pub async fn load(&self) -> StoredSession {
        self.current.read().await.clone()
    }

    pub async fn tokens(&self) -> Option<TokenPair> {
        self.current.read().await.tokens.clone()
    }

    pub async fn user(&self) -> Option<UserProfile> {
        self.current.read().await.user.clone()
    }

    /// Remove tokens and user. The in-memory copy is dropped even if storage fails.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let mut current = self.current.write().await;
        *current = StoredSession::default();
        self.storage
            .remove_items(&[AUTH_TOKENS_KEY, CURRENT_USER_KEY, AUTH_TOKEN_KEY])
            .await
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })
}

/// Unreadable JSON under a key is treated as absent.
async fn read_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = storage.get_item(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!("Ignoring unreadable value stored under '{}': {}", key, e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::store::memory_storage::MemoryStorage;

    fn user() -> UserProfile {
        UserProfile {
            id: "u-1".to_string(),
            name: "Ada Lovelace".to_string(),
            email: "ada@clinic.test".to_string(),
            email_verified: true,
            phone_number: None,
            tenant_id: Some("t-1".to_string()),
            clinic_id: Some("t-1".to_string()),
            role: Role::Admin,
            employee_id: None,
            license_number: None,
            specialization: None,
        }
    }

    fn tokens() -> TokenPair {
        TokenPair::new(
            "access".to_string(),
            Some("id".to_string()),
            Some("refresh".to_string()),
        )
    }

    #[tokio::test]
    async fn test_save_writes_all_keys() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = TokenStore::open(storage.clone()).await.unwrap();
        store.save(&tokens(), &user()).await.unwrap();

        assert_eq!(
            storage.get_item(AUTH_TOKEN_KEY).await.unwrap(),
            Some("access".to_string())
        );
        assert!(storage.get_item(AUTH_TOKENS_KEY).await.unwrap().is_some());
        assert!(storage.get_item(CURRENT_USER_KEY).await.unwrap().is_some());

        // A fresh store over the same storage sees the same session
        let reopened = TokenStore::open(storage).await.unwrap();
        assert_eq!(reopened.load().await, store.load().await);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = TokenStore::open(storage.clone()).await.unwrap();
        store.save(&tokens(), &user()).await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.load().await, StoredSession::default());
        for key in [AUTH_TOKENS_KEY, CURRENT_USER_KEY, AUTH_TOKEN_KEY] {
            assert_eq!(storage.get_item(key).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_corrupt_value_is_ignored() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage
            .set_item(AUTH_TOKENS_KEY, "{broken".to_string())
            .await
            .unwrap();
        let store = TokenStore::open(storage).await.unwrap();
        assert_eq!(store.tokens().await, None);
    }
}
