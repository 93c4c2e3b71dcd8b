//! Distributed fixed-window rate limiting middleware (§4.3 RateLimiter).
//!
//! Unlike an in-process limiter, all counter state lives in the shared KV
//! store: any sidecar replica sees the same window for a given principal,
//! and replicas periodically broadcast their counts to peers (see
//! `sidecar-peersync`) so a client spread across replicas behind a load
//! balancer is still limited globally rather than per-replica.

mod config;
mod error;
mod events;
mod layer;
mod limiter;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use error::RateLimiterError;
pub use events::RateLimiterEvent;
pub use layer::RateLimiterLayer;
pub use limiter::{decision_event, Decision, FixedWindowLimiter};

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use sidecar_auth::Resolved;
use sidecar_kvstore::KvStore;
use tower::Service;

/// A Tower [`Service`] that applies the fixed-window limiter ahead of the
/// wrapped service. Requests must carry a [`sidecar_auth::Resolved`]
/// extension; the auth layer is responsible for inserting it.
pub struct RateLimiter<S, K> {
    inner: S,
    limiter: FixedWindowLimiter<K>,
    config: Arc<RateLimiterConfig>,
}

impl<S: Clone, K: Clone> Clone for RateLimiter<S, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, K, B> Service<http::Request<B>> for RateLimiter<S, K>
where
    S: Service<http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    K: KvStore,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = RateLimiterError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(RateLimiterError::Inner)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let limiter = self.limiter.clone();
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(Resolved { principal, quota }) = req.extensions().get::<Resolved>().cloned()
            else {
                return Err(RateLimiterError::MissingAuthContext);
            };

            let decision = limiter
                .check(&principal, quota)
                .await
                .map_err(RateLimiterError::Store)?;

            config.event_listeners.emit(&decision_event(&principal, &decision));

            match decision {
                Decision::Allow { .. } => inner.call(req).await.map_err(RateLimiterError::Inner),
                Decision::Reject { retry_after } => Err(RateLimiterError::QuotaExceeded { retry_after }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidecar_auth::{Principal, Quota};
    use sidecar_core::TaskSupervisor;
    use sidecar_kvstore::InMemoryKvStore;
    use tower::{Layer, ServiceExt};

    fn request_with(principal: Principal, quota: Quota) -> http::Request<()> {
        let mut req = http::Request::new(());
        req.extensions_mut().insert(Resolved { principal, quota });
        req
    }

    #[tokio::test]
    async fn allows_requests_under_quota() {
        let store = InMemoryKvStore::new();
        let config = RateLimiterConfigBuilder::new("chain/limits").build();
        let layer = RateLimiterLayer::new(store, TaskSupervisor::new(), config);

        let service = tower::service_fn(|_req: http::Request<()>| async move {
            Ok::<_, std::convert::Infallible>("ok")
        });
        let mut service = layer.layer(service);

        let req = request_with(Principal::anonymous("203.0.113.1"), Quota::finite(2.0));
        let result = service.ready().await.unwrap().call(req).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn rejects_requests_over_quota_with_retry_after() {
        let store = InMemoryKvStore::new();
        let config = RateLimiterConfigBuilder::new("chain/limits").build();
        let layer = RateLimiterLayer::new(store, TaskSupervisor::new(), config);

        let service = tower::service_fn(|_req: http::Request<()>| async move {
            Ok::<_, std::convert::Infallible>("ok")
        });
        let mut service = layer.layer(service);

        let principal = Principal::anonymous("203.0.113.1");
        let req1 = request_with(principal.clone(), Quota::finite(1.0));
        service.ready().await.unwrap().call(req1).await.unwrap();

        let req2 = request_with(principal, Quota::finite(1.0));
        let result = service.ready().await.unwrap().call(req2).await;
        assert!(matches!(result, Err(RateLimiterError::QuotaExceeded { .. })));
    }

    #[tokio::test]
    async fn missing_auth_context_is_rejected() {
        let store = InMemoryKvStore::new();
        let config = RateLimiterConfigBuilder::new("chain/limits").build();
        let layer = RateLimiterLayer::new(store, TaskSupervisor::new(), config);

        let service = tower::service_fn(|_req: http::Request<()>| async move {
            Ok::<_, std::convert::Infallible>("ok")
        });
        let mut service = layer.layer(service);

        let result = service.ready().await.unwrap().call(http::Request::new(())).await;
        assert!(matches!(result, Err(RateLimiterError::MissingAuthContext)));
    }
}
