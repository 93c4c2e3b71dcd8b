//! The [`KvStore`] contract (§6 "KV store contract").
//!
//! A minimal, string-keyed, byte-valued surface: every operation the rate
//! limiter, the response cache, and peer-sync need, and nothing else.
//! Implementations must be linearizable per key (true of Redis; true of the
//! `InMemoryKvStore` test double via its internal mutex) — the sidecar itself
//! never coordinates across keys.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::KvError;

/// Async contract over the shared key-value store.
///
/// Implementations must be cheap to clone (typically an `Arc<...>` or a
/// pooled client handle inside).
#[async_trait]
pub trait KvStore: Clone + Send + Sync + 'static {
    /// Backend name, for logging/metrics.
    fn backend_name(&self) -> &'static str;

    /// `GET key`. `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// `SET key value EX ttl`. Overwrites any existing value and TTL.
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), KvError>;

    /// `SETEX key ttl value`. Functionally identical to [`KvStore::set_ex`]
    /// with swapped argument order; kept as a distinct method because the KV
    /// contract (§6) lists both spellings explicitly.
    async fn setex(&self, key: &str, ttl: Duration, value: &[u8]) -> Result<(), KvError> {
        self.set_ex(key, value, ttl).await
    }

    /// `INCR key`. Creates the key at value `1` with no TTL if absent.
    async fn incr(&self, key: &str) -> Result<i64, KvError>;

    /// `INCRBY key delta`. Creates the key at value `delta` with no TTL if absent.
    async fn incrby(&self, key: &str, delta: i64) -> Result<i64, KvError>;

    /// `EXPIRE key ttl`. No-op (but not an error) if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError>;

    /// `TTL key`. Returns `-2` if the key does not exist, `-1` if it exists
    /// with no TTL, otherwise the remaining seconds.
    async fn ttl(&self, key: &str) -> Result<i64, KvError>;

    /// `HGET hash field`.
    async fn hget(&self, hash: &str, field: &str) -> Result<Option<Vec<u8>>, KvError>;
}
