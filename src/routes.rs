//! Route table (§4.7) and the per-route glue that resolves auth, runs the
//! rate limiter and (where applicable) the response cache ahead of an
//! upstream call, and maps the result to an HTTP response.
//!
//! Each cached/limited route builds its upstream call as a boxed future and
//! threads it through [`sidecar_ratelimiter::RateLimiterLayer`] and
//! [`sidecar_cache::ResponseCacheLayer`] the same way any other Tower
//! service would be composed — [`OnceService`] is the adapter that lets a
//! single already-captured async block stand in for "the next service in
//! the stack" for the one request it's built for.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post, MethodRouter};
use axum::{Json, Router};
use serde::Deserialize;
use sidecar_auth::Resolved;
use sidecar_cache::{fingerprint, CacheKey, TtlPolicy};
use sidecar_http::SidecarError;
use sidecar_kvstore::KvStore;
use sidecar_peersync::Limit;
use sidecar_upstream::UpstreamError;
use tower::{Layer, Service, ServiceExt};

use crate::state::AppState;

type BoxedCompute = Pin<Box<dyn Future<Output = Result<Vec<u8>, UpstreamError>> + Send>>;

/// Adapts one already-started computation into a one-shot Tower [`Service`].
/// Cloning shares the same slot; every route calls the composed stack
/// exactly once per request, so the slot is always populated on its single
/// use.
#[derive(Clone)]
struct OnceService(Arc<Mutex<Option<BoxedCompute>>>);

impl OnceService {
    fn new(compute: BoxedCompute) -> Self {
        Self(Arc::new(Mutex::new(Some(compute))))
    }
}

impl Service<http::Request<()>> for OnceService {
    type Response = Vec<u8>;
    type Error = UpstreamError;
    type Future = BoxedCompute;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: http::Request<()>) -> Self::Future {
        self.0
            .lock()
            .expect("OnceService lock poisoned")
            .take()
            .expect("OnceService called more than once")
    }
}

/// Runs `compute` behind the rate limiter only — used by routes that are
/// authenticated/limited but never cached (`/v1.0/blocks/latest`).
async fn run_limited<K: KvStore>(
    state: &AppState<K>,
    resolved: Resolved,
    compute: BoxedCompute,
) -> Result<Vec<u8>, SidecarError> {
    let mut stack = state.rate_limiter.layer(OnceService::new(compute));

    let mut req = http::Request::new(());
    req.extensions_mut().insert(resolved);

    let ready = stack.ready().await.map_err(SidecarError::from)?;
    ready.call(req).await.map_err(SidecarError::from)
}

/// Runs `compute` behind the response cache, itself behind the rate
/// limiter — a cache hit never touches the limiter's inner service, but
/// still passes through the limiter's quota check first (§4.7: every route
/// but `/status` and `/tokens` is rate limited).
async fn run_limited_and_cached<K: KvStore>(
    state: &AppState<K>,
    resolved: Resolved,
    cache_key: CacheKey,
    compute: BoxedCompute,
) -> Result<Vec<u8>, SidecarError> {
    let cached = state.cache.layer(OnceService::new(compute));
    let mut stack = state.rate_limiter.layer(cached);

    let mut req = http::Request::new(());
    req.extensions_mut().insert(resolved);
    req.extensions_mut().insert(cache_key);

    let ready = stack.ready().await.map_err(SidecarError::from)?;
    ready.call(req).await.map_err(SidecarError::from)
}

/// Raw JSON bytes, already serialized by the upstream call — served as-is
/// rather than re-parsed, since every cached/limited route's payload is
/// already a complete JSON document.
struct JsonBytes(Vec<u8>);

impl IntoResponse for JsonBytes {
    fn into_response(self) -> Response {
        ([(axum::http::header::CONTENT_TYPE, "application/json")], self.0).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct AuthQuery {
    api_key: Option<String>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// `x-real-ip` wins over the transport peer address, mirroring a sidecar
/// deployed behind a reverse proxy (§4.1).
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| addr.ip().to_string())
}

async fn resolve_auth<K: KvStore>(
    state: &AppState<K>,
    headers: &HeaderMap,
    query: &AuthQuery,
    addr: SocketAddr,
) -> Result<Resolved, SidecarError> {
    let (principal, quota) = state
        .auth
        .resolve(query.api_key.as_deref(), bearer_token(headers), &client_ip(headers, addr))
        .await?;
    Ok(Resolved { principal, quota })
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, UpstreamError> {
    serde_json::to_vec(value).map_err(|err| UpstreamError::Other(format!("response encoding error: {err}")))
}

/// The `/v1.0/*` route table: the single source [`build_router`] registers
/// routes from and [`list_endpoints`] lists paths from, so the two can't
/// drift the way a hand-maintained listing and the live router would
/// (mirrors `original_source/sidecar/routes_v1_0.py::index`, which builds
/// its listing by iterating the same `router.routes` the app serves from —
/// axum's `Router` doesn't expose that kind of post-hoc introspection, so
/// this table is what both sides introspect instead).
fn v1_routes<K: KvStore>() -> Vec<(&'static str, MethodRouter<AppState<K>>)> {
    vec![
        ("/v1.0/", get(list_endpoints::<K>)),
        ("/v1.0/blocks/latest", get(get_block_latest::<K>)),
        ("/v1.0/blocks/:id", get(get_block::<K>)),
        ("/v1.0/transactions/:hash", get(get_transaction::<K>)),
        ("/v1.0/status", get(get_status::<K>)),
        ("/v1.0/tokens", get(get_tokens::<K>)),
    ]
}

async fn list_endpoints<K: KvStore>() -> Json<serde_json::Value> {
    let endpoints: Vec<&'static str> = v1_routes::<K>().into_iter().map(|(path, _)| path).collect();
    Json(serde_json::json!({ "endpoints": endpoints }))
}

async fn get_block_latest<K: KvStore>(
    State(state): State<AppState<K>>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<JsonBytes, SidecarError> {
    let resolved = resolve_auth(&state, &headers, &query, addr).await?;
    let ops = state.ops.clone();
    let compute: BoxedCompute = Box::pin(async move { encode(&ops.get_block_latest().await?) });

    run_limited(&state, resolved, compute).await.map(JsonBytes)
}

/// Dispatches on whether the path segment parses as an integer: an integer
/// is a block height (fixed TTL, the reorg window is bounded), anything
/// else is a block hash (extend-on-hit, the data behind it never changes).
async fn get_block<K: KvStore>(
    State(state): State<AppState<K>>,
    Path(id): Path<String>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<JsonBytes, SidecarError> {
    let resolved = resolve_auth(&state, &headers, &query, addr).await?;
    let ops = state.ops.clone();

    let (cache_key, compute): (CacheKey, BoxedCompute) = if let Ok(height) = id.parse::<u64>() {
        let fp = fingerprint("get_block_by_height", &[&height], &[]);
        let key = CacheKey::new(fp, Duration::from_secs(600), TtlPolicy::Fixed);
        let compute: BoxedCompute = Box::pin(async move { encode(&ops.get_block_by_height(height).await?) });
        (key, compute)
    } else {
        let fp = fingerprint("get_block_by_hash", &[], &[("block_hash", &id as &dyn std::fmt::Display)]);
        let key = CacheKey::new(fp, Duration::from_secs(600), TtlPolicy::ExtendOnHit);
        let hash = id;
        let compute: BoxedCompute = Box::pin(async move { encode(&ops.get_block_by_hash(&hash).await?) });
        (key, compute)
    };

    run_limited_and_cached(&state, resolved, cache_key, compute).await.map(JsonBytes)
}

async fn get_transaction<K: KvStore>(
    State(state): State<AppState<K>>,
    Path(hash): Path<String>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<JsonBytes, SidecarError> {
    let resolved = resolve_auth(&state, &headers, &query, addr).await?;
    let ops = state.ops.clone();

    let fp = fingerprint("get_transaction_by_hash", &[], &[("tx_hash", &hash as &dyn std::fmt::Display)]);
    let cache_key = CacheKey::new(fp, Duration::from_secs(600), TtlPolicy::ExtendOnHit);

    let tx_hash = hash;
    let compute: BoxedCompute = Box::pin(async move { encode(&ops.get_transaction_by_hash(&tx_hash).await?) });

    run_limited_and_cached(&state, resolved, cache_key, compute).await.map(JsonBytes)
}

/// Not rate limited or authenticated (§4.7): a liveness probe has to work
/// even when the caller has no API key and the quota is exhausted.
async fn get_status<K: KvStore>(State(state): State<AppState<K>>) -> Response {
    let healthy = state.ops.get_block_latest().await.is_ok();
    sidecar_http::status_response(healthy)
}

/// Also unauthenticated/unlimited — a static table derived from the
/// parser's configuration, not a per-request upstream call.
async fn get_tokens<K: KvStore>(State(state): State<AppState<K>>) -> Json<sidecar_upstream::TokenMap> {
    Json(state.ops.tokens().clone())
}

async fn post_limit<K: KvStore>(
    State(state): State<AppState<K>>,
    headers: HeaderMap,
    Json(limit): Json<Limit>,
) -> Result<StatusCode, SidecarError> {
    let expected = state.sidecar_token.as_deref().unwrap_or_default();
    sidecar_peersync::authorize(bearer_token(&headers), expected)?;
    sidecar_peersync::apply(&state.store, &limit).await?;
    Ok(StatusCode::OK)
}

pub fn build_router<K: KvStore>(state: AppState<K>) -> Router {
    let mut router = Router::new().route("/", get(|| async { Redirect::temporary("/v1.0/") }));

    for (path, method_router) in v1_routes::<K>() {
        router = router.route(path, method_router);
    }

    router.route("/limit", post(post_limit::<K>)).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use sidecar_kvstore::InMemoryKvStore;
    use tower::ServiceExt as _;

    use crate::config::SidecarConfig;
    use crate::upstream_http::{HttpAdapter, PassthroughParser};

    fn test_state() -> AppState<InMemoryKvStore> {
        let config = SidecarConfig {
            node_blockchain: "ethereum".to_string(),
            node_url: "http://127.0.0.1:0".to_string(),
            node_token: "test".to_string(),
            redis_host: "localhost".to_string(),
            limit_default: 10_000,
            limit_interval: 86_400,
            environment: "test".to_string(),
            sidecar_token: Some("shared-secret".to_string()),
            sidecar_urls: String::new(),
            sidecar_limit_sync_interval: 1_000,
            sentry_dsn: None,
        };
        let store = InMemoryKvStore::new();
        let adapter = HttpAdapter::new(&config.node_url, &config.node_token);
        let parser = PassthroughParser::new(&config.blockchain_id());
        AppState::new(&config, store, adapter, parser)
    }

    fn router() -> Router {
        build_router(test_state())
    }

    /// Routes that extract `ConnectInfo<SocketAddr>` need it on the request's
    /// extensions; normally `into_make_service_with_connect_info` inserts it,
    /// but a bare `oneshot` call bypasses that, so tests insert it directly.
    fn request_with_peer(method: &str, uri: &str, body: Body) -> HttpRequest<Body> {
        let mut req = HttpRequest::builder().method(method).uri(uri).body(body).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([203, 0, 113, 9], 54321))));
        req
    }

    #[tokio::test]
    async fn root_redirects_to_v1() {
        let response = router()
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get("location").unwrap(), "/v1.0/");
    }

    #[tokio::test]
    async fn endpoints_listing_is_ok() {
        let response = router()
            .oneshot(HttpRequest::builder().uri("/v1.0/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tokens_route_needs_no_auth_or_quota() {
        let response = router()
            .oneshot(HttpRequest::builder().uri("/v1.0/tokens").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn status_route_reflects_upstream_failure_as_503() {
        // The test adapter points at a closed port, so the upstream call fails
        // and `/v1.0/status` must report unhealthy rather than panicking.
        let response = router()
            .oneshot(HttpRequest::builder().uri("/v1.0/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn block_latest_route_requires_connect_info_and_surfaces_upstream_failure() {
        let response = router()
            .oneshot(request_with_peer("GET", "/v1.0/blocks/latest", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn limit_route_rejects_missing_bearer_token() {
        let body = serde_json::to_vec(&Limit { key: "k".to_string(), value: 1, ttl: 60 }).unwrap();
        let response = router()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/limit")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn limit_route_accepts_matching_bearer_token() {
        let body = serde_json::to_vec(&Limit {
            key: "ethereum/limits/ip/203.0.113.9".to_string(),
            value: 5,
            ttl: 60,
        })
        .unwrap();
        let response = router()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/limit")
                    .header("content-type", "application/json")
                    .header("authorization", "Bearer shared-secret")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn block_route_dispatches_height_vs_hash_on_the_same_path() {
        // Both requests hit the same `/v1.0/blocks/:id` route; only the
        // upstream call (which fails without a live node) differs by whether
        // `id` parsed as an integer, so both surface as 503 here rather than
        // the router rejecting either form.
        for id in ["42", "0xabc123"] {
            let response = router()
                .oneshot(request_with_peer("GET", &format!("/v1.0/blocks/{id}"), Body::empty()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE, "id={id}");
        }
    }
}
