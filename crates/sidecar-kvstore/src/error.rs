//! Error taxonomy for [`crate::KvStore`] implementations.

use thiserror::Error;

/// Errors a [`crate::KvStore`] implementation can return.
///
/// Grounded in `kurab-hello-rust-api`'s `CacheClient`/`CacheError` split
/// (transport vs. command vs. value errors) — kept independent of any
/// higher-level sidecar error so callers decide how to fail (fail-closed for
/// the rate limiter, fail-open for a cache write).
#[derive(Debug, Error)]
pub enum KvError {
    /// Could not reach or authenticate with the backing store.
    #[error("kv store connection error: {0}")]
    Connection(String),

    /// The store rejected the command itself (wrong type, syntax, etc).
    #[error("kv store command error: {0}")]
    Command(String),

    /// A stored value could not be interpreted as the caller expected
    /// (e.g. a non-numeric counter value).
    #[error("kv store value error: {0}")]
    InvalidValue(String),
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for KvError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
            KvError::Connection(err.to_string())
        } else {
            KvError::Command(err.to_string())
        }
    }
}
