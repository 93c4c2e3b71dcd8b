//! Outbound fan-out to peer sidecars (§4.4 PeerSync, outbound side).

use std::sync::Arc;
use std::time::Duration;

use sidecar_kvstore::KvStore;

use crate::model::Limit;

/// Broadcasts local counter crossings to every configured peer sidecar.
///
/// Constructed once at startup and cloned into the rate limiter's sync
/// callback. A failed POST to one peer is logged and does not affect
/// delivery to the others — peer-sync is best-effort gossip, not a
/// consensus protocol.
#[derive(Clone)]
pub struct Broadcaster<K> {
    store: K,
    client: reqwest::Client,
    peer_urls: Arc<Vec<String>>,
    sidecar_token: Arc<str>,
    sync_value: i64,
}

impl<K: KvStore> Broadcaster<K> {
    pub fn new(store: K, peer_urls: Vec<String>, sidecar_token: impl Into<Arc<str>>, sync_value: i64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            store,
            client,
            peer_urls: Arc::new(peer_urls),
            sidecar_token: sidecar_token.into(),
            sync_value,
        }
    }

    /// Reads `key`'s current TTL and POSTs the resulting [`Limit`] message to
    /// every peer. Intended to run inside [`sidecar_core::TaskSupervisor`],
    /// off the request path.
    pub async fn broadcast(&self, key: String) {
        let ttl = match self.store.ttl(&key).await {
            Ok(ttl) => ttl,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(key = %key, error = %_err, "peer-sync broadcast: could not read local ttl");
                return;
            }
        };

        let limit = Limit {
            key,
            value: self.sync_value,
            ttl,
        };

        for peer_url in self.peer_urls.iter() {
            self.post_one(peer_url, &limit).await;
        }
    }

    async fn post_one(&self, peer_url: &str, limit: &Limit) {
        let url = format!("{peer_url}/limit");

        #[cfg(feature = "tracing")]
        tracing::debug!(peer = %peer_url, key = %limit.key, value = limit.value, ttl = limit.ttl, "peer-sync broadcast payload");

        let result = self
            .client
            .post(&url)
            .bearer_auth(&*self.sidecar_token)
            .json(limit)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                #[cfg(feature = "tracing")]
                {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    tracing::debug!(peer = %peer_url, %status, %body, "peer-sync broadcast response");
                }
            }
            Ok(_response) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(peer = %peer_url, status = %_response.status(), "peer-sync broadcast rejected");
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(peer = %peer_url, error = %_err, "peer-sync broadcast failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidecar_kvstore::InMemoryKvStore;

    #[tokio::test]
    async fn broadcast_with_no_peers_is_a_no_op() {
        let store = InMemoryKvStore::new();
        store.set_ex("k", b"1", Duration::from_secs(60)).await.unwrap();

        let broadcaster = Broadcaster::new(store, Vec::new(), "token", 1_000);
        broadcaster.broadcast("k".to_string()).await;
    }
}
