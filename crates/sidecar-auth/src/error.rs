use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid api key")]
    Unauthorized,

    #[error("stored quota value could not be parsed")]
    MalformedQuota,

    #[error("kv store error: {0}")]
    Store(#[source] sidecar_kvstore::KvError),
}
