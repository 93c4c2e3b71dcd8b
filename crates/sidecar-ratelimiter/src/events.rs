use std::time::{Duration, Instant};

use sidecar_auth::Principal;
use sidecar_core::SidecarEvent;

/// Observability events emitted by the [`crate::RateLimiter`].
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// The request was allowed; `count` is the window's count after this request.
    Allowed {
        principal: Principal,
        count: i64,
        timestamp: Instant,
    },
    /// The request was rejected; the client should retry after `retry_after`.
    Rejected {
        principal: Principal,
        retry_after: Duration,
        timestamp: Instant,
    },
    /// The local counter crossed a sync boundary and a peer broadcast was submitted.
    SyncTriggered {
        key: String,
        count: i64,
        timestamp: Instant,
    },
}

impl SidecarEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::Allowed { .. } => "allowed",
            RateLimiterEvent::Rejected { .. } => "rejected",
            RateLimiterEvent::SyncTriggered { .. } => "sync_triggered",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::Allowed { timestamp, .. }
            | RateLimiterEvent::Rejected { timestamp, .. }
            | RateLimiterEvent::SyncTriggered { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        "ratelimiter"
    }
}
