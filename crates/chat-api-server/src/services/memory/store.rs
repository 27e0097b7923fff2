use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::RedisConfig;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("history store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("stored history entry is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Append-only per-session list storage with TTL.
///
/// The seam between the memory manager and the concrete store, so tests
/// can run against an in-process double and the manager never sees redis
/// types.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Establish the connection. Idempotent; every operation also
    /// connects lazily, so this is only needed for eager startup checks.
    async fn connect(&self) -> Result<(), MemoryError>;

    /// Drop the connection. Idempotent.
    async fn disconnect(&self);

    /// Append one serialized entry to the list at `key` and push its
    /// expiry out to `ttl_seconds` from now.
    async fn append(&self, key: &str, entry: String, ttl_seconds: i64) -> Result<(), MemoryError>;

    /// Read the full list at `key`, oldest first. Missing key -> empty.
    async fn read_all(&self, key: &str) -> Result<Vec<String>, MemoryError>;

    /// Delete the list at `key` immediately, bypassing TTL.
    async fn delete(&self, key: &str) -> Result<(), MemoryError>;
}

/// Redis-backed history store over a shared `ConnectionManager`.
pub struct RedisHistoryStore {
    client: redis::Client,
    url: String,
    manager: Mutex<Option<ConnectionManager>>,
}

impl RedisHistoryStore {
    pub fn new(config: &RedisConfig) -> Result<Self, MemoryError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| MemoryError::StoreUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            manager: Mutex::new(None),
        })
    }

    /// Clone of the shared connection, establishing it first if needed.
    async fn conn(&self) -> Result<ConnectionManager, MemoryError> {
        let mut guard = self.manager.lock().await;

        if let Some(manager) = guard.as_ref() {
            return Ok(manager.clone());
        }

        let manager = self
            .client
            .get_connection_manager()
            .await
            .map_err(|e| MemoryError::StoreUnavailable(e.to_string()))?;

        info!("Connected to Redis at {}", self.url);
        *guard = Some(manager.clone());
        Ok(manager)
    }
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    async fn connect(&self) -> Result<(), MemoryError> {
        self.conn().await.map(|_| ())
    }

    async fn disconnect(&self) {
        let mut guard = self.manager.lock().await;
        if guard.take().is_some() {
            info!("Disconnected from Redis");
        }
    }

    async fn append(&self, key: &str, entry: String, ttl_seconds: i64) -> Result<(), MemoryError> {
        let mut conn = self.conn().await?;

        redis::pipe()
            .atomic()
            .rpush(key, entry)
            .ignore()
            .expire(key, ttl_seconds)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| MemoryError::StoreUnavailable(e.to_string()))?;

        debug!("Appended entry to {}", key);
        Ok(())
    }

    async fn read_all(&self, key: &str) -> Result<Vec<String>, MemoryError> {
        let mut conn = self.conn().await?;

        let entries: Vec<String> = conn
            .lrange(key, 0, -1)
            .await
            .map_err(|e| MemoryError::StoreUnavailable(e.to_string()))?;

        Ok(entries)
    }

    async fn delete(&self, key: &str) -> Result<(), MemoryError> {
        let mut conn = self.conn().await?;

        let _: () = conn
            .del(key)
            .await
            .map_err(|e| MemoryError::StoreUnavailable(e.to_string()))?;

        Ok(())
    }
}

/// Hash-map store double shared by manager and orchestrator tests.
#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    pub struct InMemoryStore {
        lists: Arc<Mutex<HashMap<String, Vec<String>>>>,
        last_ttl: Arc<Mutex<Option<i64>>>,
    }

    impl InMemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn entries(&self, key: &str) -> Vec<String> {
            self.lists
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .unwrap_or_default()
        }

        pub fn last_ttl(&self) -> Option<i64> {
            *self.last_ttl.lock().unwrap()
        }
    }

    #[async_trait]
    impl HistoryStore for InMemoryStore {
        async fn connect(&self) -> Result<(), MemoryError> {
            Ok(())
        }

        async fn disconnect(&self) {}

        async fn append(
            &self,
            key: &str,
            entry: String,
            ttl_seconds: i64,
        ) -> Result<(), MemoryError> {
            self.lists
                .lock()
                .unwrap()
                .entry(key.to_string())
                .or_default()
                .push(entry);
            *self.last_ttl.lock().unwrap() = Some(ttl_seconds);
            Ok(())
        }

        async fn read_all(&self, key: &str) -> Result<Vec<String>, MemoryError> {
            Ok(self.entries(key))
        }

        async fn delete(&self, key: &str) -> Result<(), MemoryError> {
            self.lists.lock().unwrap().remove(key);
            Ok(())
        }
    }
}
