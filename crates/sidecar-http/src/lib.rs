//! Maps the sidecar's internal error types to HTTP responses (§4.6
//! ErrorMapper / `transform_to_http_exception`).
//!
//! Every route handler returns `Result<T, SidecarError>`; `SidecarError`'s
//! [`IntoResponse`] impl is the single place that decision is made, so the
//! mapping can't drift between routes.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use sidecar_auth::AuthError;
use sidecar_cache::CacheError;
use sidecar_peersync::PeerSyncError;
use sidecar_ratelimiter::RateLimiterError;
use sidecar_upstream::UpstreamError;

#[derive(Debug)]
pub enum SidecarError {
    Upstream(UpstreamError),
    Auth(AuthError),
    RateLimited { retry_after_secs: u64 },
    PeerSync(PeerSyncError),
}

impl From<UpstreamError> for SidecarError {
    fn from(err: UpstreamError) -> Self {
        SidecarError::Upstream(err)
    }
}

impl From<AuthError> for SidecarError {
    fn from(err: AuthError) -> Self {
        SidecarError::Auth(err)
    }
}

impl From<PeerSyncError> for SidecarError {
    fn from(err: PeerSyncError) -> Self {
        SidecarError::PeerSync(err)
    }
}

impl<E> From<RateLimiterError<E>> for SidecarError
where
    SidecarError: From<E>,
{
    fn from(err: RateLimiterError<E>) -> Self {
        match err {
            RateLimiterError::QuotaExceeded { retry_after } => SidecarError::RateLimited {
                retry_after_secs: retry_after.as_secs(),
            },
            // An auth/store failure ahead of a decision is a server-side problem,
            // not the client's to retry — surfaced as a generic 500 below.
            RateLimiterError::Store(_) => SidecarError::Upstream(UpstreamError::Other(err.to_string())),
            RateLimiterError::MissingAuthContext => {
                SidecarError::Upstream(UpstreamError::Other(err.to_string()))
            }
            RateLimiterError::Inner(inner) => SidecarError::from(inner),
        }
    }
}

impl From<CacheError<UpstreamError>> for SidecarError {
    fn from(err: CacheError<UpstreamError>) -> Self {
        match err {
            CacheError::Inner(upstream) => SidecarError::Upstream(upstream),
            CacheError::MissingCacheKey => SidecarError::Upstream(UpstreamError::Other(err.to_string())),
        }
    }
}

impl IntoResponse for SidecarError {
    fn into_response(self) -> Response {
        match self {
            SidecarError::Upstream(UpstreamError::DoesNotExist) => {
                StatusCode::NOT_FOUND.into_response()
            }
            SidecarError::Upstream(UpstreamError::Unavailable)
            | SidecarError::Upstream(UpstreamError::TooManyRequests)
            | SidecarError::Upstream(UpstreamError::NodeNotReady) => {
                StatusCode::SERVICE_UNAVAILABLE.into_response()
            }
            SidecarError::Upstream(UpstreamError::SkippedBlock) => StatusCode::NO_CONTENT.into_response(),
            SidecarError::Upstream(other @ UpstreamError::Other(_)) => {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %other, "unmapped upstream failure");
                #[cfg(not(feature = "tracing"))]
                let _ = &other;
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            SidecarError::Auth(AuthError::Unauthorized) => StatusCode::UNAUTHORIZED.into_response(),
            SidecarError::Auth(AuthError::MalformedQuota) => {
                #[cfg(feature = "tracing")]
                tracing::error!("stored quota value could not be parsed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            SidecarError::Auth(AuthError::Store(_err)) => {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %_err, "auth store failure");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            SidecarError::RateLimited { retry_after_secs } => {
                let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                    response.headers_mut().insert("Retry-After", value);
                }
                response
            }
            SidecarError::PeerSync(PeerSyncError::Unauthorized) => StatusCode::UNAUTHORIZED.into_response(),
            SidecarError::PeerSync(PeerSyncError::Store(_err)) => {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %_err, "peer-sync store failure");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// `GET /v1.0/status`'s response body, built without going through
/// [`SidecarError`] since §4.7 asks for a 200/503 pair rather than the
/// general mapping.
pub fn status_response(is_ok: bool) -> Response {
    let status = if is_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let body = Json(serde_json::json!({ "status": if is_ok { "ok" } else { "ko" } }));
    (status, body).into_response()
}
