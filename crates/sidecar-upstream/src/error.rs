use thiserror::Error;

/// Upstream failure taxonomy (§4.6 ErrorMapper). The HTTP mapping itself
/// lives in `sidecar-http`, which depends on this crate rather than the
/// other way around — the adapter/parser layer should not know about HTTP.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("requested resource does not exist")]
    DoesNotExist,

    #[error("upstream node is unavailable")]
    Unavailable,

    #[error("upstream node rejected the request: too many requests")]
    TooManyRequests,

    #[error("upstream node is not ready")]
    NodeNotReady,

    #[error("block was skipped by the chain")]
    SkippedBlock,

    #[error("upstream adapter or parser error: {0}")]
    Other(String),
}
