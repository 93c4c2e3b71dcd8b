use sidecar_core::events::{EventListeners, FnListener};

use crate::events::CacheEvent;

/// Configuration for one blockchain's [`crate::ResponseCacheLayer`].
pub struct CacheConfig {
    pub(crate) cache_prefix: String,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
}

/// Builder for [`CacheConfig`].
pub struct CacheConfigBuilder {
    cache_prefix: String,
    event_listeners: EventListeners<CacheEvent>,
}

impl CacheConfigBuilder {
    /// `cache_prefix` is typically `"<blockchain_name>/cache"`.
    pub fn new(cache_prefix: impl Into<String>) -> Self {
        Self {
            cache_prefix: cache_prefix.into(),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    pub fn build(self) -> CacheConfig {
        CacheConfig {
            cache_prefix: self.cache_prefix,
            event_listeners: self.event_listeners,
        }
    }
}
