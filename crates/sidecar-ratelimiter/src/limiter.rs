//! Fixed-window counter algorithm (§4.3), independent of any Tower plumbing
//! so it can be driven directly in tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sidecar_auth::{Principal, Quota};
use sidecar_core::TaskSupervisor;
use sidecar_kvstore::KvStore;

use crate::events::RateLimiterEvent;

/// Outcome of a single [`FixedWindowLimiter::check`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allow { count: i64 },
    Reject { retry_after: Duration },
}

/// Distributed fixed-window rate limiter keyed by `(blockchain, principal)`.
///
/// All state lives in the KV store; this type is stateless beyond its
/// configuration and is cheap to clone.
#[derive(Clone)]
pub struct FixedWindowLimiter<K> {
    store: K,
    tasks: TaskSupervisor,
    interval: Duration,
    sync_interval: u64,
    limits_prefix: String,
    on_sync: Arc<dyn Fn(String, i64) + Send + Sync>,
}

impl<K: KvStore> FixedWindowLimiter<K> {
    /// `limits_prefix` is typically `"<blockchain_name>/limits"`.
    pub fn new(
        store: K,
        tasks: TaskSupervisor,
        interval: Duration,
        sync_interval: u64,
        limits_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tasks,
            interval,
            sync_interval,
            limits_prefix: limits_prefix.into(),
            on_sync: Arc::new(|_, _| {}),
        }
    }

    /// Registers a callback invoked (outside the hot path) whenever this
    /// window crosses a sync boundary — the binary wires this to submit an
    /// outbound peer broadcast.
    pub fn with_sync_callback(mut self, f: impl Fn(String, i64) + Send + Sync + 'static) -> Self {
        self.on_sync = Arc::new(f);
        self
    }

    fn key_for(&self, principal: &Principal) -> String {
        format!("{}/{}", self.limits_prefix, principal.limit_key_suffix())
    }

    /// Applies the fixed-window algorithm for one request from `principal`.
    ///
    /// `quota == Unlimited` takes the shortcut described in §4.3 and never
    /// touches the store.
    pub async fn check(&self, principal: &Principal, quota: Quota) -> Result<Decision, sidecar_kvstore::KvError> {
        let Some(limit) = quota.as_limited() else {
            return Ok(Decision::Allow { count: 0 });
        };

        let key = self.key_for(principal);

        // Absence must be decided from the value itself, not from TTL: a key
        // incremented by a peer's `apply()` (crates/sidecar-peersync) can exist
        // with no TTL yet (TTL == -1, not -2) in the window between its INCRBY
        // and its EXPIRE. Keying off `ttl < 0` would treat that counter as
        // absent and reset it to 1, discarding an already-elevated peer count.
        let Some(current) = self.read_count(&key).await? else {
            self.store.set_ex(&key, b"1", self.interval).await?;
            return Ok(Decision::Allow { count: 1 });
        };

        if (current as f64) < limit {
            let count = self.store.incr(&key).await?;
            self.maybe_sync(&key, count);
            return Ok(Decision::Allow { count });
        }

        let ttl = self.store.ttl(&key).await?;
        let retry_after = Duration::from_secs(ttl.max(0) as u64);
        Ok(Decision::Reject { retry_after })
    }

    async fn read_count(&self, key: &str) -> Result<Option<i64>, sidecar_kvstore::KvError> {
        match self.store.get(key).await? {
            Some(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                text.trim()
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|_| sidecar_kvstore::KvError::InvalidValue(format!("key {key} is not an integer")))
            }
            None => Ok(None),
        }
    }

    fn maybe_sync(&self, key: &str, count: i64) {
        if self.sync_interval > 0 && count > 0 && count as u64 % self.sync_interval == 0 {
            let key = key.to_string();
            let on_sync = Arc::clone(&self.on_sync);
            self.tasks.submit(async move {
                on_sync(key, count);
            });
        }
    }
}

/// Turns a [`Decision`] into the corresponding observability event.
pub fn decision_event(principal: &Principal, decision: &Decision) -> RateLimiterEvent {
    match decision {
        Decision::Allow { count } => RateLimiterEvent::Allowed {
            principal: principal.clone(),
            count: *count,
            timestamp: Instant::now(),
        },
        Decision::Reject { retry_after } => RateLimiterEvent::Rejected {
            principal: principal.clone(),
            retry_after: *retry_after,
            timestamp: Instant::now(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidecar_kvstore::InMemoryKvStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn limiter(store: InMemoryKvStore, sync_interval: u64) -> FixedWindowLimiter<InMemoryKvStore> {
        FixedWindowLimiter::new(
            store,
            TaskSupervisor::new(),
            Duration::from_secs(60),
            sync_interval,
            "chain/limits",
        )
    }

    #[tokio::test]
    async fn first_request_in_window_is_allowed_and_sets_counter() {
        let store = InMemoryKvStore::new();
        let limiter = limiter(store.clone(), 0);
        let principal = Principal::anonymous("203.0.113.1");

        let decision = limiter.check(&principal, Quota::finite(2.0)).await.unwrap();
        assert_eq!(decision, Decision::Allow { count: 1 });
    }

    #[tokio::test]
    async fn requests_under_quota_increment_and_allow() {
        let store = InMemoryKvStore::new();
        let limiter = limiter(store, 0);
        let principal = Principal::anonymous("203.0.113.1");

        assert_eq!(
            limiter.check(&principal, Quota::finite(2.0)).await.unwrap(),
            Decision::Allow { count: 1 }
        );
        assert_eq!(
            limiter.check(&principal, Quota::finite(2.0)).await.unwrap(),
            Decision::Allow { count: 2 }
        );
    }

    #[tokio::test]
    async fn request_at_quota_is_rejected_with_retry_after() {
        let store = InMemoryKvStore::new();
        let limiter = limiter(store, 0);
        let principal = Principal::anonymous("203.0.113.1");

        limiter.check(&principal, Quota::finite(1.0)).await.unwrap();
        let decision = limiter.check(&principal, Quota::finite(1.0)).await.unwrap();
        assert!(matches!(decision, Decision::Reject { .. }));
    }

    #[tokio::test]
    async fn unlimited_quota_never_touches_the_store() {
        let store = InMemoryKvStore::new();
        let limiter = limiter(store.clone(), 0);
        let principal = Principal::authenticated("unlimited-key");

        for _ in 0..5 {
            let decision = limiter.check(&principal, Quota::Unlimited).await.unwrap();
            assert_eq!(decision, Decision::Allow { count: 0 });
        }
        assert_eq!(
            store.ttl("chain/limits/api_key/unlimited-key").await.unwrap(),
            -2,
            "unlimited quota must never create a counter key"
        );
    }

    #[tokio::test]
    async fn key_with_no_ttl_yet_is_not_treated_as_absent() {
        // Mirrors the window a peer's `apply()` can leave behind: INCRBY
        // creates the key before EXPIRE ever runs, so TTL reads -1 while the
        // value is already elevated. `check()` must increment from there,
        // not reset the counter back to 1.
        let store = InMemoryKvStore::new();
        let key = "chain/limits/ip/203.0.113.1";
        store.incrby(key, 500).await.unwrap();
        assert_eq!(store.ttl(key).await.unwrap(), -1, "precondition: key exists with no ttl set");

        let limiter = limiter(store.clone(), 0);
        let principal = Principal::anonymous("203.0.113.1");

        let decision = limiter.check(&principal, Quota::finite(1000.0)).await.unwrap();
        assert_eq!(decision, Decision::Allow { count: 501 });
    }

    #[tokio::test]
    async fn sync_boundary_triggers_callback_once_per_multiple() {
        let store = InMemoryKvStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let limiter = FixedWindowLimiter::new(
            store,
            TaskSupervisor::new(),
            Duration::from_secs(60),
            2,
            "chain/limits",
        )
        .with_sync_callback(move |_key, _count| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let principal = Principal::anonymous("203.0.113.1");
        for _ in 0..4 {
            limiter.check(&principal, Quota::finite(1000.0)).await.unwrap();
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2, "expected a sync at counts 2 and 4");
    }

    #[tokio::test]
    async fn principals_are_isolated_from_each_other() {
        let store = InMemoryKvStore::new();
        let limiter = limiter(store, 0);

        let a = Principal::anonymous("203.0.113.1");
        let b = Principal::anonymous("203.0.113.2");

        limiter.check(&a, Quota::finite(1.0)).await.unwrap();
        let decision_b = limiter.check(&b, Quota::finite(1.0)).await.unwrap();
        assert_eq!(decision_b, Decision::Allow { count: 1 });
    }
}
