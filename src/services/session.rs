//! Session storage
//!
//! Per-client session state (draft reservation, cached block maps, one-shot
//! messages, login marker) lives behind [`SessionBackend`]: one Redis hash
//! per session in production, an expiring map in memory. [`Session`] is the
//! typed view handlers work with; values are JSON-encoded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Keys the booking core reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// The draft (then confirmed) reservation
    Reservation,
    /// Block view of a room cached by the last calendar render
    BlockMap(i32),
    Flash,
    Error,
    Warning,
    /// Login marker
    UserId,
}

impl SessionKey {
    pub fn name(&self) -> String {
        match self {
            SessionKey::Reservation => "reservation".to_string(),
            SessionKey::BlockMap(room_id) => format!("block_map_{}", room_id),
            SessionKey::Flash => "flash".to_string(),
            SessionKey::Error => "error".to_string(),
            SessionKey::Warning => "warning".to_string(),
            SessionKey::UserId => "user_id".to_string(),
        }
    }
}

/// Raw storage of session values
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> AppResult<Option<String>>;
    async fn set(&self, session_id: &str, key: &str, value: String) -> AppResult<()>;
    async fn remove(&self, session_id: &str, key: &str) -> AppResult<()>;
    async fn exists(&self, session_id: &str, key: &str) -> AppResult<bool>;
    /// Drop the whole session
    async fn clear(&self, session_id: &str) -> AppResult<()>;
    /// Move every value of `from` under `to`, leaving `from` empty
    async fn rename(&self, from: &str, to: &str) -> AppResult<()>;
}

/// Redis hash per session, expiring `lifetime_seconds` after the last write
#[derive(Clone)]
pub struct RedisSessionBackend {
    client: Client,
    lifetime_seconds: i64,
}

impl RedisSessionBackend {
    /// Connect and ping the server
    pub async fn new(url: &str, lifetime_seconds: i64) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Session(format!("Failed to create Redis client: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Session(format!("Redis connection test failed: {}", e)))?;

        Ok(Self {
            client,
            lifetime_seconds,
        })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Session(format!("Failed to get Redis connection: {}", e)))
    }

    fn hash_key(session_id: &str) -> String {
        format!("session:{}", session_id)
    }
}

#[async_trait]
impl SessionBackend for RedisSessionBackend {
    async fn get(&self, session_id: &str, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.hget(Self::hash_key(session_id), key)
            .await
            .map_err(|e| AppError::Session(format!("Failed to read session: {}", e)))
    }

    async fn set(&self, session_id: &str, key: &str, value: String) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let hash = Self::hash_key(session_id);
        conn.hset::<_, _, _, ()>(&hash, key, value)
            .await
            .map_err(|e| AppError::Session(format!("Failed to write session: {}", e)))?;
        conn.expire::<_, ()>(&hash, self.lifetime_seconds)
            .await
            .map_err(|e| AppError::Session(format!("Failed to refresh session: {}", e)))?;
        Ok(())
    }

    async fn remove(&self, session_id: &str, key: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.hdel::<_, _, ()>(Self::hash_key(session_id), key)
            .await
            .map_err(|e| AppError::Session(format!("Failed to update session: {}", e)))
    }

    async fn exists(&self, session_id: &str, key: &str) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        conn.hexists(Self::hash_key(session_id), key)
            .await
            .map_err(|e| AppError::Session(format!("Failed to read session: {}", e)))
    }

    async fn clear(&self, session_id: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(Self::hash_key(session_id))
            .await
            .map_err(|e| AppError::Session(format!("Failed to destroy session: {}", e)))
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let from = Self::hash_key(from);
        let present: bool = conn
            .exists(&from)
            .await
            .map_err(|e| AppError::Session(format!("Failed to read session: {}", e)))?;
        if !present {
            return Ok(());
        }
        conn.rename::<_, _, ()>(&from, Self::hash_key(to))
            .await
            .map_err(|e| AppError::Session(format!("Failed to renew session: {}", e)))
    }
}

const DEFAULT_LIFETIME: Duration = Duration::from_secs(24 * 3600);

struct MemoryEntry {
    values: HashMap<String, String>,
    touched: Instant,
}

/// Process-local sessions; lost on restart. A session expires `lifetime`
/// after its last write, expired sessions are swept on every write.
pub struct MemorySessionBackend {
    sessions: RwLock<HashMap<String, MemoryEntry>>,
    lifetime: Duration,
}

impl Default for MemorySessionBackend {
    fn default() -> Self {
        Self::with_lifetime(DEFAULT_LIFETIME)
    }
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            lifetime,
        }
    }

    fn live<'a>(&self, sessions: &'a HashMap<String, MemoryEntry>, session_id: &str) -> Option<&'a MemoryEntry> {
        sessions
            .get(session_id)
            .filter(|entry| entry.touched.elapsed() < self.lifetime)
    }

    fn sweep(&self, sessions: &mut HashMap<String, MemoryEntry>) {
        let lifetime = self.lifetime;
        sessions.retain(|_, entry| entry.touched.elapsed() < lifetime);
    }
}

#[async_trait]
impl SessionBackend for MemorySessionBackend {
    async fn get(&self, session_id: &str, key: &str) -> AppResult<Option<String>> {
        let sessions = self.sessions.read().await;
        Ok(self
            .live(&sessions, session_id)
            .and_then(|entry| entry.values.get(key))
            .cloned())
    }

    async fn set(&self, session_id: &str, key: &str, value: String) -> AppResult<()> {
        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions);
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| MemoryEntry {
                values: HashMap::new(),
                touched: Instant::now(),
            });
        entry.values.insert(key.to_string(), value);
        entry.touched = Instant::now();
        Ok(())
    }

    async fn remove(&self, session_id: &str, key: &str) -> AppResult<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.values.remove(key);
        }
        Ok(())
    }

    async fn exists(&self, session_id: &str, key: &str) -> AppResult<bool> {
        let sessions = self.sessions.read().await;
        Ok(self
            .live(&sessions, session_id)
            .map(|entry| entry.values.contains_key(key))
            .unwrap_or(false))
    }

    async fn clear(&self, session_id: &str) -> AppResult<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        let mut sessions = self.sessions.write().await;
        if let Some(mut entry) = sessions.remove(from) {
            entry.touched = Instant::now();
            sessions.insert(to.to_string(), entry);
        }
        Ok(())
    }
}

/// Hands out [`Session`] views over the configured backend
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    pub fn session(&self, id: impl Into<String>) -> Session {
        Session {
            id: id.into(),
            backend: self.backend.clone(),
        }
    }

    /// A session under a new random id
    pub fn fresh(&self) -> Session {
        self.session(Uuid::new_v4().to_string())
    }

    /// Move `session`'s values under a new random id; the old id is left
    /// empty and no longer carries any state
    pub async fn renew(&self, session: &Session) -> AppResult<Session> {
        let renewed = self.fresh();
        self.backend.rename(&session.id, &renewed.id).await?;
        Ok(renewed)
    }
}

/// One client's session
#[derive(Clone)]
pub struct Session {
    id: String,
    backend: Arc<dyn SessionBackend>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Typed read; `None` when the key is absent
    pub async fn get<T: DeserializeOwned>(&self, key: SessionKey) -> AppResult<Option<T>> {
        let Some(raw) = self.backend.get(&self.id, &key.name()).await? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&raw).map_err(|e| {
            AppError::SessionState(format!("Malformed session value '{}': {}", key.name(), e))
        })?;
        Ok(Some(value))
    }

    pub async fn put<T: Serialize>(&self, key: SessionKey, value: &T) -> AppResult<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Failed to encode session value: {}", e)))?;
        self.backend.set(&self.id, &key.name(), raw).await
    }

    pub async fn remove(&self, key: SessionKey) -> AppResult<()> {
        self.backend.remove(&self.id, &key.name()).await
    }

    pub async fn exists(&self, key: SessionKey) -> AppResult<bool> {
        self.backend.exists(&self.id, &key.name()).await
    }

    /// Get-then-clear
    pub async fn pop<T: DeserializeOwned>(&self, key: SessionKey) -> AppResult<Option<T>> {
        let value = self.get(key).await?;
        if value.is_some() {
            self.remove(key).await?;
        }
        Ok(value)
    }

    /// Get-then-clear of a one-shot message; empty when absent
    pub async fn pop_string(&self, key: SessionKey) -> AppResult<String> {
        Ok(self.pop::<String>(key).await?.unwrap_or_default())
    }

    pub async fn destroy(&self) -> AppResult<()> {
        self.backend.clear(&self.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DraftReservation;
    use chrono::NaiveDate;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemorySessionBackend::new()))
    }

    #[test]
    fn test_key_names() {
        assert_eq!(SessionKey::Reservation.name(), "reservation");
        assert_eq!(SessionKey::BlockMap(5).name(), "block_map_5");
        assert_eq!(SessionKey::UserId.name(), "user_id");
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let session = store().session("abc");
        let draft = DraftReservation::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        );

        session.put(SessionKey::Reservation, &draft).await.unwrap();
        assert!(session.exists(SessionKey::Reservation).await.unwrap());

        let back: Option<DraftReservation> = session.get(SessionKey::Reservation).await.unwrap();
        assert_eq!(back, Some(draft));
    }

    #[tokio::test]
    async fn test_wrong_type_is_session_state_error() {
        let session = store().session("abc");
        session.put(SessionKey::Reservation, &"not a draft").await.unwrap();

        let result = session.get::<DraftReservation>(SessionKey::Reservation).await;
        assert!(matches!(result, Err(AppError::SessionState(_))));
    }

    #[tokio::test]
    async fn test_pop_string_reads_once() {
        let session = store().session("abc");
        session.put(SessionKey::Flash, &"Changes saved").await.unwrap();

        assert_eq!(session.pop_string(SessionKey::Flash).await.unwrap(), "Changes saved");
        assert_eq!(session.pop_string(SessionKey::Flash).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_renew_moves_values_to_new_id() {
        let store = store();
        let old = store.session("planted");
        old.put(SessionKey::Flash, &"Hello").await.unwrap();

        let renewed = store.renew(&old).await.unwrap();
        assert_ne!(renewed.id(), "planted");
        assert_eq!(renewed.pop_string(SessionKey::Flash).await.unwrap(), "Hello");
        assert!(!old.exists(SessionKey::Flash).await.unwrap());

        renewed.put(SessionKey::UserId, &1).await.unwrap();
        assert!(!old.exists(SessionKey::UserId).await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_sessions_expire() {
        let backend = Arc::new(MemorySessionBackend::with_lifetime(Duration::from_millis(50)));
        let store = SessionStore::new(backend.clone());
        let stale = store.session("stale");
        stale.put(SessionKey::Flash, &"old").await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(stale.get::<String>(SessionKey::Flash).await.unwrap(), None);

        store.session("live").put(SessionKey::Flash, &"new").await.unwrap();
        let sessions = backend.sessions.read().await;
        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains_key("live"));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = store();
        let a = store.session("a");
        let b = store.session("b");
        a.put(SessionKey::UserId, &1).await.unwrap();

        assert!(!b.exists(SessionKey::UserId).await.unwrap());

        a.destroy().await.unwrap();
        assert!(!a.exists(SessionKey::UserId).await.unwrap());
    }
}
