//! Redis-backed [`KvStore`].

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::KvError;
use crate::store::KvStore;

/// A [`KvStore`] backed by a live Redis (or Redis-compatible) server.
///
/// Wraps a [`ConnectionManager`], which reconnects and pipelines commands
/// transparently — cloning `RedisKvStore` clones the manager handle, not the
/// connection itself, so it is cheap to share across handlers.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    /// Connects to `url` (e.g. `redis://127.0.0.1:6379/0`) and establishes the
    /// managed connection eagerly, so a bad URL or unreachable server fails
    /// at startup rather than on the first request.
    pub async fn connect(url: &str) -> Result<Self, KvError> {
        let client = redis::Client::open(url).map_err(KvError::from)?;
        let conn = client.get_connection_manager().await.map_err(KvError::from)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(KvError::from)?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await.map_err(KvError::from)?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, KvError> {
        self.incrby(key, 1).await
    }

    async fn incrby(&self, key: &str, delta: i64) -> Result<i64, KvError> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(key, delta).await.map_err(KvError::from)?;
        Ok(value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1) as i64;
        let _: bool = conn.expire(key, seconds).await.map_err(KvError::from)?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64, KvError> {
        let mut conn = self.conn.clone();
        let value: i64 = conn.ttl(key).await.map_err(KvError::from)?;
        Ok(value)
    }

    async fn hget(&self, hash: &str, field: &str) -> Result<Option<Vec<u8>>, KvError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.hget(hash, field).await.map_err(KvError::from)?;
        Ok(value)
    }
}
