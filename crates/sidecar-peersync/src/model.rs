use serde::{Deserialize, Serialize};

/// Peer-sync message (§3 "Peer-sync message"): produced by one sidecar when
/// its local counter crosses a sync boundary, consumed by every peer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Limit {
    pub key: String,
    pub value: i64,
    pub ttl: i64,
}
