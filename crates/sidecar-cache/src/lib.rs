//! Fingerprint-keyed response cache backed by the shared KV store (§4.2
//! ResponseCache).
//!
//! Unlike the original `lru`-backed in-process cache this crate started
//! from, every entry lives in the KV store alongside the rate limiter's
//! counters — so a cache hit on one replica is a cache hit on every replica.
//! Cache writes and TTL refreshes run through [`sidecar_core::TaskSupervisor`]
//! so the response path never waits on them.

mod config;
mod error;
mod events;
mod fingerprint;
mod layer;
mod policy;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use error::CacheError;
pub use events::CacheEvent;
pub use fingerprint::fingerprint;
pub use layer::ResponseCacheLayer;
pub use policy::{CacheKey, TtlPolicy};

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::future::BoxFuture;
use sidecar_core::TaskSupervisor;
use sidecar_kvstore::KvStore;
use tower::Service;

/// A Tower [`Service`] that serves cached bytes on a hit and, on a miss,
/// calls the wrapped service and stores its response.
///
/// Requests must carry a [`CacheKey`] extension (the route declaration's
/// responsibility, since the fingerprint depends on the route's own
/// arguments); `S::Response` must be cheaply convertible to and from raw
/// bytes so it can round-trip through the store.
pub struct ResponseCache<S, K> {
    inner: S,
    store: K,
    tasks: TaskSupervisor,
    config: Arc<CacheConfig>,
}

impl<S: Clone, K: Clone> Clone for ResponseCache<S, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            store: self.store.clone(),
            tasks: self.tasks.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, K, B, Resp> Service<http::Request<B>> for ResponseCache<S, K>
where
    S: Service<http::Request<B>, Response = Resp> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    K: KvStore,
    B: Send + 'static,
    Resp: Into<Vec<u8>> + From<Vec<u8>> + Clone + Send + 'static,
{
    type Response = Resp;
    type Error = CacheError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(CacheError::Inner)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let store = self.store.clone();
        let tasks = self.tasks.clone();
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(cache_key) = req.extensions().get::<CacheKey>().cloned() else {
                return Err(CacheError::MissingCacheKey);
            };

            let key = format!("{}/{}", config.cache_prefix, cache_key.fingerprint);

            if let Some(bytes) = store.get(&key).await.unwrap_or(None) {
                config.event_listeners.emit(&CacheEvent::Hit {
                    fingerprint: cache_key.fingerprint.clone(),
                    timestamp: Instant::now(),
                });

                if matches!(cache_key.policy, TtlPolicy::ExtendOnHit) {
                    let store = store.clone();
                    let ttl = cache_key.ttl;
                    let key = key.clone();
                    let config = Arc::clone(&config);
                    let fingerprint = cache_key.fingerprint.clone();
                    tasks.submit_fallible("cache ttl refresh", async move {
                        let result = store.expire(&key, ttl).await;
                        if result.is_err() {
                            config.event_listeners.emit(&CacheEvent::WriteFailed {
                                fingerprint,
                                timestamp: Instant::now(),
                            });
                        }
                        result
                    });
                }

                return Ok(Resp::from(bytes));
            }

            config.event_listeners.emit(&CacheEvent::Miss {
                fingerprint: cache_key.fingerprint.clone(),
                timestamp: Instant::now(),
            });

            let response = inner.call(req).await.map_err(CacheError::Inner)?;

            let bytes: Vec<u8> = response.clone().into();
            let ttl = cache_key.ttl;
            let fingerprint = cache_key.fingerprint.clone();
            tasks.submit_fallible("cache write", async move {
                let result = store.set_ex(&key, &bytes, ttl).await;
                if result.is_err() {
                    config.event_listeners.emit(&CacheEvent::WriteFailed {
                        fingerprint,
                        timestamp: Instant::now(),
                    });
                }
                result
            });

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidecar_kvstore::InMemoryKvStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::{Layer, ServiceExt};

    fn request_with(key: CacheKey) -> http::Request<()> {
        let mut req = http::Request::new(());
        req.extensions_mut().insert(key);
        req
    }

    #[tokio::test]
    async fn miss_then_hit_skips_inner_on_second_call() {
        let store = InMemoryKvStore::new();
        let config = CacheConfigBuilder::new("chain/cache").build();
        let layer = ResponseCacheLayer::new(store, TaskSupervisor::new(), config);

        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = Arc::clone(&call_count);
        let service = tower::service_fn(move |_req: http::Request<()>| {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::convert::Infallible>(b"payload".to_vec())
            }
        });
        let mut service = layer.layer(service);

        let key = CacheKey::new("get_block_latest()", Duration::from_secs(60), TtlPolicy::Fixed);
        let first = service.ready().await.unwrap().call(request_with(key.clone())).await.unwrap();
        assert_eq!(first, b"payload".to_vec());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        // allow the background SETEX to land
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = service.ready().await.unwrap().call(request_with(key)).await.unwrap();
        assert_eq!(second, b"payload".to_vec());
        assert_eq!(call_count.load(Ordering::SeqCst), 1, "second call should be served from cache");
    }

    #[tokio::test]
    async fn failed_handler_call_is_not_cached() {
        let store = InMemoryKvStore::new();
        let config = CacheConfigBuilder::new("chain/cache").build();
        let layer = ResponseCacheLayer::new(store, TaskSupervisor::new(), config);

        let service = tower::service_fn(|_req: http::Request<()>| async move {
            Err::<Vec<u8>, _>("boom")
        });
        let mut service = layer.layer(service);

        let key = CacheKey::new("get_block_by_hash(bad)", Duration::from_secs(60), TtlPolicy::Fixed);
        let result = service.ready().await.unwrap().call(request_with(key)).await;
        assert!(matches!(result, Err(CacheError::Inner("boom"))));
    }

    #[tokio::test]
    async fn extend_on_hit_refreshes_ttl_in_background() {
        let store = InMemoryKvStore::new();
        let config = CacheConfigBuilder::new("chain/cache").build();
        let layer = ResponseCacheLayer::new(store.clone(), TaskSupervisor::new(), config);

        let service = tower::service_fn(|_req: http::Request<()>| async move {
            Ok::<_, std::convert::Infallible>(b"hash-lookup".to_vec())
        });
        let mut service = layer.layer(service);

        let key = CacheKey::new(
            "get_transaction(0xabc)",
            Duration::from_secs(300),
            TtlPolicy::ExtendOnHit,
        );
        service.ready().await.unwrap().call(request_with(key.clone())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        service.ready().await.unwrap().call(request_with(key)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let ttl = store.ttl("chain/cache/get_transaction(0xabc)").await.unwrap();
        assert!(ttl > 0);
    }

    #[tokio::test]
    async fn missing_cache_key_extension_is_rejected() {
        let store = InMemoryKvStore::new();
        let config = CacheConfigBuilder::new("chain/cache").build();
        let layer = ResponseCacheLayer::new(store, TaskSupervisor::new(), config);

        let service = tower::service_fn(|_req: http::Request<()>| async move {
            Ok::<_, std::convert::Infallible>(b"x".to_vec())
        });
        let mut service = layer.layer(service);

        let result = service.ready().await.unwrap().call(http::Request::new(())).await;
        assert!(matches!(result, Err(CacheError::MissingCacheKey)));
    }
}
