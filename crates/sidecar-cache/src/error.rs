use thiserror::Error;

/// Errors the cache middleware can produce. Store failures never surface
/// here on the read path — see §4.2's "no negative caching, writes never
/// block" guarantee — only a request missing its [`crate::CacheKey`]
/// extension, or the wrapped handler's own error, is fatal.
#[derive(Debug, Error)]
pub enum CacheError<E> {
    #[error("request is missing a cache key")]
    MissingCacheKey,

    #[error(transparent)]
    Inner(E),
}
