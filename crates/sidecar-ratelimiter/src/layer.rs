use std::sync::Arc;

use sidecar_core::TaskSupervisor;
use sidecar_kvstore::KvStore;
use tower::Layer;

use crate::config::RateLimiterConfig;
use crate::limiter::FixedWindowLimiter;
use crate::RateLimiter;

/// A Tower [`Layer`] that applies the distributed fixed-window limiter to
/// any `http::Request<B>` carrying a [`sidecar_auth::Resolved`] extension.
#[derive(Clone)]
pub struct RateLimiterLayer<K> {
    limiter: FixedWindowLimiter<K>,
    config: Arc<RateLimiterConfig>,
}

impl<K: KvStore> RateLimiterLayer<K> {
    pub fn new(store: K, tasks: TaskSupervisor, config: RateLimiterConfig) -> Self {
        let limiter = FixedWindowLimiter::new(
            store,
            tasks,
            config.interval,
            config.sync_interval,
            config.limits_prefix.clone(),
        );
        Self {
            limiter,
            config: Arc::new(config),
        }
    }

    /// Registers the callback the outbound peer-sync broadcaster hooks into.
    pub fn with_sync_callback(mut self, f: impl Fn(String, i64) + Send + Sync + 'static) -> Self {
        self.limiter = self.limiter.with_sync_callback(f);
        self
    }
}

impl<S, K: KvStore> Layer<S> for RateLimiterLayer<K> {
    type Service = RateLimiter<S, K>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiter {
            inner,
            limiter: self.limiter.clone(),
            config: Arc::clone(&self.config),
        }
    }
}
