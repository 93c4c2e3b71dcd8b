use std::time::Instant;

use sidecar_core::SidecarEvent;

/// Observability events emitted by the [`crate::ResponseCache`].
#[derive(Debug, Clone)]
pub enum CacheEvent {
    Hit { fingerprint: String, timestamp: Instant },
    Miss { fingerprint: String, timestamp: Instant },
    /// A background `SETEX` or `EXPIRE` write failed; the response was still
    /// served, it just won't be cached (or its TTL won't be extended).
    WriteFailed { fingerprint: String, timestamp: Instant },
}

impl SidecarEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "hit",
            CacheEvent::Miss { .. } => "miss",
            CacheEvent::WriteFailed { .. } => "write_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::WriteFailed { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        "cache"
    }
}
