use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use redis::AsyncCommands;
use tracing::instrument;

type SessionValues = HashMap<String, String>;

/// Two weeks, the usual lifetime of a browser session cookie.
pub const DEFAULT_TTL_SECONDS: i64 = 1_209_600;

#[derive(Debug)]
struct MemorySession {
    values: SessionValues,
    expires_at: Instant,
}

type MemorySessions = HashMap<String, MemorySession>;

#[derive(Clone, Debug)]
enum SessionBackend {
    Redis(bb8::Pool<redis::Client>),
    Memory(Arc<Mutex<MemorySessions>>),
}

/// Server-side session records keyed by the session cookie value.
#[derive(Clone, Debug)]
pub struct SessionRepository {
    backend: SessionBackend,
    ttl_seconds: i64,
}

impl SessionRepository {
    pub fn redis(redis_pool: bb8::Pool<redis::Client>, ttl_seconds: i64) -> Self {
        Self {
            backend: SessionBackend::Redis(redis_pool),
            ttl_seconds,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backend: SessionBackend::Memory(Arc::default()),
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }

    pub fn with_ttl(self, ttl_seconds: i64) -> Self {
        Self {
            ttl_seconds,
            ..self
        }
    }

    fn key(session_id: &str) -> String {
        format!("session:{session_id}")
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds.max(0) as u64)
    }

    /// Locks the in-memory map after dropping every expired record.
    fn live_sessions(
        sessions: &Mutex<MemorySessions>,
    ) -> std::sync::MutexGuard<'_, MemorySessions> {
        let mut sessions = sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        sessions.retain(|_, session| session.expires_at > now);
        sessions
    }

    /// Whether a live record exists for `session_id`.
    #[instrument(name = "Checking session", skip(self))]
    pub async fn exists(&self, session_id: &str) -> anyhow::Result<bool> {
        match &self.backend {
            SessionBackend::Redis(pool) => {
                let mut conn = pool.get().await?;
                let found: bool = conn.exists(Self::key(session_id)).await?;
                Ok(found)
            }
            SessionBackend::Memory(sessions) => {
                Ok(Self::live_sessions(sessions).contains_key(session_id))
            }
        }
    }

    #[instrument(name = "Loading session", skip(self))]
    pub async fn load(&self, session_id: &str) -> anyhow::Result<SessionValues> {
        match &self.backend {
            SessionBackend::Redis(pool) => {
                let mut conn = pool.get().await?;
                let values: SessionValues = conn.hgetall(Self::key(session_id)).await?;
                Ok(values)
            }
            SessionBackend::Memory(sessions) => Ok(Self::live_sessions(sessions)
                .get(session_id)
                .map(|session| session.values.clone())
                .unwrap_or_default()),
        }
    }

    /// Merges `values` into the session and refreshes its expiry.
    #[instrument(name = "Saving session", skip(self, values))]
    pub async fn save(&self, session_id: &str, values: &SessionValues) -> anyhow::Result<()> {
        match &self.backend {
            SessionBackend::Redis(pool) => {
                if values.is_empty() {
                    return Ok(());
                }
                let key = Self::key(session_id);
                let fields: Vec<(&str, &str)> = values
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                let mut conn = pool.get().await?;
                conn.hset_multiple::<_, _, _, ()>(&key, fields.as_slice()).await?;
                conn.expire::<_, ()>(&key, self.ttl_seconds).await?;
                Ok(())
            }
            SessionBackend::Memory(sessions) => {
                let expires_at = Instant::now() + self.ttl();
                let mut sessions = Self::live_sessions(sessions);
                let session = sessions
                    .entry(session_id.to_string())
                    .or_insert_with(|| MemorySession {
                        values: SessionValues::new(),
                        expires_at,
                    });
                session.expires_at = expires_at;
                session
                    .values
                    .extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
                Ok(())
            }
        }
    }
}
