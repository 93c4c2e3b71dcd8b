use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeerSyncError {
    #[error("unauthorized peer-sync request")]
    Unauthorized,

    #[error("kv store error: {0}")]
    Store(#[source] sidecar_kvstore::KvError),
}
