use std::time::Duration;

use thiserror::Error;

/// Errors the rate limiter middleware can produce.
///
/// Generic over the wrapped service's error type `E`, the same way
/// `sidecar_cache::CacheError<E>` is — a quota rejection never reaches the
/// inner service, but an allowed request's failure (a 404, a cache miss
/// that fails to decode upstream bytes, …) must still surface as itself
/// rather than being collapsed into a generic limiter error.
#[derive(Debug, Error)]
pub enum RateLimiterError<E> {
    /// The principal's quota is exhausted for the current window.
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    QuotaExceeded { retry_after: Duration },

    /// The KV store could not be reached or returned an unexpected value.
    #[error("rate limiter store error: {0}")]
    Store(#[source] sidecar_kvstore::KvError),

    /// No `(Principal, Quota)` extension was found on the request — the
    /// auth layer must run upstream of the rate limiter.
    #[error("request is missing auth resolution")]
    MissingAuthContext,

    /// The wrapped service failed; the original error is preserved so the
    /// caller can still apply its own mapping (e.g. `ErrorMapper`'s 404).
    #[error(transparent)]
    Inner(E),
}
