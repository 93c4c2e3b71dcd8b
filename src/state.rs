//! Process-wide shared state (§3 "Ownership & lifecycle"): everything here
//! is built once at startup and is read-only thereafter, except for the
//! [`sidecar_core::TaskSupervisor`]'s own internal bookkeeping. Axum clones
//! this struct into every handler, so every field is cheap to clone — KV
//! store handles, `Arc`-backed config, and layers that hold only `Arc`s and
//! cloneable inner services.

use std::sync::Arc;

use sidecar_auth::AuthResolver;
use sidecar_cache::{CacheConfigBuilder, ResponseCacheLayer};
use sidecar_core::TaskSupervisor;
use sidecar_kvstore::KvStore;
use sidecar_peersync::Broadcaster;
use sidecar_ratelimiter::{RateLimiterConfigBuilder, RateLimiterLayer};
use sidecar_upstream::{BlockchainId, Operations};

use crate::config::SidecarConfig;
use crate::upstream_http::{HttpAdapter, PassthroughParser};

pub type AppOperations = Operations<HttpAdapter, PassthroughParser>;

#[derive(Clone)]
pub struct AppState<K: KvStore> {
    pub store: K,
    pub tasks: TaskSupervisor,
    pub auth: AuthResolver<K>,
    pub rate_limiter: RateLimiterLayer<K>,
    pub cache: ResponseCacheLayer<K>,
    pub ops: AppOperations,
    pub blockchain: BlockchainId,
    pub sidecar_token: Option<String>,
}

impl<K: KvStore> AppState<K> {
    /// Wires every middleware crate's config/layer against one blockchain's
    /// namespace (§6 "KV key layout"), and wires the rate limiter's sync
    /// boundary callback (§4.3) to submit an outbound peer broadcast through
    /// the shared [`TaskSupervisor`] rather than awaiting it on the request
    /// path.
    pub fn new(config: &SidecarConfig, store: K, adapter: HttpAdapter, parser: PassthroughParser) -> Self {
        let tasks = TaskSupervisor::new();
        let blockchain = config.blockchain_id();

        let auth = AuthResolver::new(store.clone(), config.api_key_hash(), sidecar_auth::Quota::finite(config.limit_default as f64));

        let peer_urls = config.peer_urls();
        let broadcaster = Broadcaster::new(
            store.clone(),
            peer_urls,
            config.sidecar_token.clone().unwrap_or_default(),
            config.sidecar_limit_sync_interval as i64,
        );

        let rate_limiter_config = RateLimiterConfigBuilder::new(config.limits_prefix())
            .interval(config.limit_interval())
            .sync_interval(config.sidecar_limit_sync_interval)
            .build();

        let sync_tasks = tasks.clone();
        let rate_limiter = RateLimiterLayer::new(store.clone(), tasks.clone(), rate_limiter_config).with_sync_callback(
            move |key, _count| {
                let broadcaster = broadcaster.clone();
                sync_tasks.submit(async move {
                    broadcaster.broadcast(key).await;
                });
            },
        );

        let cache_config = CacheConfigBuilder::new(config.cache_prefix()).build();
        let cache = ResponseCacheLayer::new(store.clone(), tasks.clone(), cache_config);

        let ops = Operations::new(Arc::new(adapter), Arc::new(parser));

        Self {
            store,
            tasks,
            auth,
            rate_limiter,
            cache,
            ops,
            blockchain,
            sidecar_token: config.sidecar_token.clone(),
        }
    }
}
