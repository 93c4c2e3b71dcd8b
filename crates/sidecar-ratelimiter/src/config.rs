use std::time::Duration;

use sidecar_core::events::{EventListeners, FnListener};

use crate::events::RateLimiterEvent;

/// Configuration for one blockchain's [`crate::RateLimiterLayer`].
pub struct RateLimiterConfig {
    pub(crate) limits_prefix: String,
    pub(crate) interval: Duration,
    pub(crate) sync_interval: u64,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    limits_prefix: String,
    interval: Duration,
    sync_interval: u64,
    event_listeners: EventListeners<RateLimiterEvent>,
}

impl RateLimiterConfigBuilder {
    /// Defaults: `interval` = 24h, `sync_interval` = 1000, as the upstream
    /// sidecar configures by default.
    pub fn new(limits_prefix: impl Into<String>) -> Self {
        Self {
            limits_prefix: limits_prefix.into(),
            interval: Duration::from_secs(60 * 60 * 24),
            sync_interval: 1_000,
            event_listeners: EventListeners::new(),
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn sync_interval(mut self, sync_interval: u64) -> Self {
        self.sync_interval = sync_interval;
        self
    }

    /// Registers a callback invoked on every allow/reject decision.
    pub fn on_decision<F>(mut self, f: F) -> Self
    where
        F: Fn(&RateLimiterEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    pub fn build(self) -> RateLimiterConfig {
        RateLimiterConfig {
            limits_prefix: self.limits_prefix,
            interval: self.interval,
            sync_interval: self.sync_interval,
            event_listeners: self.event_listeners,
        }
    }
}
