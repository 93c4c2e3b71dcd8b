//! Applies an inbound [`Limit`] message from a peer (§4.4 PeerSync,
//! inbound side).

use std::time::Duration;

use sidecar_kvstore::KvStore;

use crate::error::PeerSyncError;
use crate::model::Limit;

/// Checks the bearer token presented with an inbound `/limit` request
/// against the configured shared secret.
pub fn authorize(presented: Option<&str>, expected: &str) -> Result<(), PeerSyncError> {
    match presented {
        Some(token) if token == expected => Ok(()),
        _ => Err(PeerSyncError::Unauthorized),
    }
}

/// `INCRBY key value`, then reconciles the local TTL against the peer's
/// reported TTL: if the local key has no TTL, or the local TTL is *longer*
/// than the peer's, the peer's TTL wins — a shorter remote TTL means that
/// peer's window started more recently and is the more accurate deadline.
pub async fn apply<K: KvStore>(store: &K, limit: &Limit) -> Result<(), PeerSyncError> {
    store.incrby(&limit.key, limit.value).await.map_err(PeerSyncError::Store)?;
    let local_ttl = store.ttl(&limit.key).await.map_err(PeerSyncError::Store)?;

    if local_ttl < 0 || local_ttl > limit.ttl {
        let ttl = Duration::from_secs(limit.ttl.max(0) as u64);
        store.expire(&limit.key, ttl).await.map_err(PeerSyncError::Store)?;
    }

    Ok(())
}
