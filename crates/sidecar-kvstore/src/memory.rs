//! In-process [`KvStore`] test double.
//!
//! No network, no persistence. TTLs are tracked as absolute deadlines and
//! checked lazily on access — there is no background sweeper, matching the
//! scale this is meant for (unit tests, not a cache server).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::KvError;
use crate::store::KvStore;

#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => deadline > now,
            None => true,
        }
    }
}

/// An in-memory [`KvStore`] for tests, backed by a `HashMap` guarded by a
/// single mutex. Hashes (for [`KvStore::hget`]) live in a separate map keyed
/// by `"<hash>/<field>"`.
#[derive(Clone, Default)]
pub struct InMemoryKvStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    hashes: HashMap<String, HashMap<String, Vec<u8>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a hash field directly, bypassing TTL bookkeeping. Used by tests
    /// to preprovision e.g. `"<chain>/api_keys"` entries.
    pub fn seed_hash(&self, hash: &str, field: &str, value: impl Into<Vec<u8>>) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .hashes
            .entry(hash.to_string())
            .or_default()
            .insert(field.to_string(), value.into());
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                inner.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), KvError> {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, KvError> {
        self.incrby(key, 1).await
    }

    async fn incrby(&self, key: &str, delta: i64) -> Result<i64, KvError> {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();

        let current = match inner.entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                let text = std::str::from_utf8(&entry.value)
                    .map_err(|_| KvError::InvalidValue(format!("key {key} is not valid utf-8")))?;
                text.parse::<i64>()
                    .map_err(|_| KvError::InvalidValue(format!("key {key} is not an integer")))?
            }
            _ => 0,
        };

        let updated = current + delta;
        let expires_at = inner.entries.get(key).and_then(|e| e.expires_at);
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: updated.to_string().into_bytes(),
                expires_at,
            },
        );
        Ok(updated)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64, KvError> {
        let now = Instant::now();
        let inner = self.inner.lock().unwrap();
        match inner.entries.get(key) {
            Some(entry) if !entry.is_live(now) => Ok(-2),
            Some(Entry { expires_at: None, .. }) => Ok(-1),
            Some(Entry { expires_at: Some(deadline), .. }) => {
                Ok(deadline.saturating_duration_since(now).as_secs() as i64)
            }
            None => Ok(-2),
        }
    }

    async fn hget(&self, hash: &str, field: &str) -> Result<Option<Vec<u8>>, KvError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.hashes.get(hash).and_then(|fields| fields.get(field)).cloned())
    }
}
