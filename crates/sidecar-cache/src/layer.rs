use std::sync::Arc;

use sidecar_core::TaskSupervisor;
use sidecar_kvstore::KvStore;
use tower::Layer;

use crate::config::CacheConfig;
use crate::ResponseCache;

/// A Tower [`Layer`] that applies the fingerprint-keyed response cache.
#[derive(Clone)]
pub struct ResponseCacheLayer<K> {
    store: K,
    tasks: TaskSupervisor,
    config: Arc<CacheConfig>,
}

impl<K: KvStore> ResponseCacheLayer<K> {
    pub fn new(store: K, tasks: TaskSupervisor, config: CacheConfig) -> Self {
        Self {
            store,
            tasks,
            config: Arc::new(config),
        }
    }
}

impl<S, K: KvStore> Layer<S> for ResponseCacheLayer<K> {
    type Service = ResponseCache<S, K>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseCache {
            inner,
            store: self.store.clone(),
            tasks: self.tasks.clone(),
            config: Arc::clone(&self.config),
        }
    }
}
