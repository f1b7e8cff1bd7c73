//! Key-value store backends.
//!
//! # Responsibilities
//! - Abstract get/set/delete over string keys
//! - Redis implementation over a reconnecting connection manager
//! - In-memory implementation with operation counters

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use thiserror::Error;

use crate::entries::Snapshot;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{backend} connection failed: {reason}")]
    Connection { backend: &'static str, reason: String },

    #[error("{backend} query failed: {reason}")]
    Query { backend: &'static str, reason: String },
}

/// Minimal string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key).await
    }
}

/// Redis-backed store.
#[derive(Clone)]
pub struct RedisStore {
    connection_manager: redis::aio::ConnectionManager,
}

impl RedisStore {
    /// Connect to `connection_string` (e.g. `redis://localhost:6379`).
    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(connection_string).map_err(|e| StoreError::Connection {
            backend: "Redis",
            reason: e.to_string(),
        })?;

        let connection_manager =
            client
                .get_connection_manager()
                .await
                .map_err(|e| StoreError::Connection {
                    backend: "Redis",
                    reason: e.to_string(),
                })?;

        Ok(Self { connection_manager })
    }
}

fn query_error(e: redis::RedisError) -> StoreError {
    StoreError::Query {
        backend: "Redis",
        reason: e.to_string(),
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection_manager.clone();
        conn.get(key).await.map_err(query_error)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.connection_manager.clone();
        conn.set::<_, _, ()>(key, value).await.map_err(query_error)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection_manager.clone();
        conn.del::<_, ()>(key).await.map_err(query_error)
    }
}

/// Process-local store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: DashMap<String, String>,
    writes: AtomicUsize,
    deletes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents, ordered by key.
    pub fn contents(&self) -> Snapshot {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    /// Number of `set` calls that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of `delete` calls that reached the store.
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Make every subsequent `set` and `delete` fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(StoreError::Query {
                backend: "Memory",
                reason: "store unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.deletes.fetch_add(1, Ordering::Relaxed);
        self.inner.remove(key);
        Ok(())
    }
}
