//! Expiring key-value persistence for the authenticated identity.
//!
//! The session manager is the only caller of [`SessionStore`]; everything
//! else sees the session through its snapshots.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use marketadmin_auth::UserProfile;

/// Key holding the opaque auth token.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Key holding the JSON-serialized [`UserProfile`].
pub const USER_DATA_KEY: &str = "userData";

/// Default lifetime of a persisted session.
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("persisted session is corrupt: {0}")]
    Corrupt(String),
    #[error("failed to serialize session: {0}")]
    Serialize(String),
}

/// Key-value storage where every entry carries an expiry horizon.
///
/// Expired entries read as absent.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Process-local [`KvStore`]; contents are lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKvStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = expiry_after(ttl)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        entries.remove(key);
        Ok(())
    }
}

/// Absolute expiry for an entry written now with `ttl`.
pub fn expiry_after(ttl: Duration) -> Result<DateTime<Utc>, StoreError> {
    Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| StoreError::Backend(format!("session ttl out of range: {ttl}")))
}

/// A session as read back from persisted storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub token: String,
    pub user: UserProfile,
}

/// The two-key persisted session record (`authToken` + `userData`).
///
/// Writes set both keys with the same expiry; reads return both or neither.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KvStore>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self::with_ttl(backend, Duration::days(DEFAULT_SESSION_TTL_DAYS))
    }

    pub fn with_ttl(backend: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Persist a session. On a partial write, the half already written is
    /// removed again so the store never holds one key without the other.
    pub async fn save(&self, token: &str, user: &UserProfile) -> Result<(), StoreError> {
        let user_data =
            serde_json::to_string(user).map_err(|e| StoreError::Serialize(e.to_string()))?;

        self.backend.set(AUTH_TOKEN_KEY, token, self.ttl).await?;
        if let Err(err) = self.backend.set(USER_DATA_KEY, &user_data, self.ttl).await {
            let _ = self.backend.remove(AUTH_TOKEN_KEY).await;
            return Err(err);
        }
        Ok(())
    }

    /// Read the persisted session.
    ///
    /// `Ok(None)` when either key is missing or expired. A `userData` value
    /// that does not parse yields [`StoreError::Corrupt`].
    pub async fn load(&self) -> Result<Option<PersistedSession>, StoreError> {
        let token = self.backend.get(AUTH_TOKEN_KEY).await?;
        let user_data = self.backend.get(USER_DATA_KEY).await?;

        let (Some(token), Some(user_data)) = (token, user_data) else {
            return Ok(None);
        };

        if token.is_empty() {
            return Err(StoreError::Corrupt("empty auth token".to_string()));
        }

        let user: UserProfile =
            serde_json::from_str(&user_data).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(Some(PersistedSession { token, user }))
    }

    /// Remove both keys, attempting the second even if the first fails.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let token = self.backend.remove(AUTH_TOKEN_KEY).await;
        let user = self.backend.remove(USER_DATA_KEY).await;
        token.and(user)
    }
}
