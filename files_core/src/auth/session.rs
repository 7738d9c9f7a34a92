//! Key-value session storage with per-key expiry.
//!
//! Expiry is owned by the store: an entry past its deadline is reported as
//! absent by `get` whether or not it has been physically removed yet.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use sqlx::{Row, SqlitePool};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// Returns whether a live entry was removed.
    async fn del(&self, key: &str) -> Result<bool>;
    async fn ping(&self) -> Result<()>;
    /// Physically removes every entry past its deadline. Returns how many went.
    async fn purge_expired(&self) -> Result<u64>;
}

/// Periodically sweeps expired sessions so tokens nobody presents again do
/// not accumulate.
pub fn spawn_session_purger(sessions: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!("Purged {} expired sessions", purged),
                Err(e) => warn!("Session purge failed: {}", e),
            }
        }
    })
}

#[derive(Debug, Clone)]
struct SessionEntry {
    value: String,
    expires_at: Instant,
}

impl SessionEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or(AppError::InternalServerError)?;
        let entry = SessionEntry {
            value: value.to_string(),
            expires_at,
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        debug!("Session entry expired for key: {}", key);
        let mut entries = self.entries.write();
        if entries.get(key).map_or(false, SessionEntry::is_expired) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .write()
            .remove(key)
            .map_or(false, |entry| !entry.is_expired()))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        Ok((before - entries.len()) as u64)
    }
}

#[derive(Clone)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = i64::try_from(ttl.as_millis())
            .ok()
            .and_then(|ttl_millis| Utc::now().timestamp_millis().checked_add(ttl_millis))
            .ok_or(AppError::InternalServerError)?;

        sqlx::query(
            r#"
            INSERT INTO sessions (key, value, expires_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Utc::now().timestamp_millis();

        let row = sqlx::query("SELECT value, expires_at FROM sessions WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) if row.get::<i64, _>("expires_at") > now => Ok(Some(row.get("value"))),
            Some(_) => {
                debug!("Session entry expired for key: {}", key);
                sqlx::query("DELETE FROM sessions WHERE key = ? AND expires_at <= ?")
                    .bind(key)
                    .bind(now)
                    .execute(&self.pool)
                    .await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE key = ? AND expires_at > ?")
            .bind(key)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
