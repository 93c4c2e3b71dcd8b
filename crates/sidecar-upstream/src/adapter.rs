use async_trait::async_trait;

use crate::error::UpstreamError;

/// The upstream node contract (§6 "Upstream adapter contract"): fetches raw,
/// undecoded bytes from a blockchain node. Decoding is [`crate::Parser`]'s job.
#[async_trait]
pub trait BlockchainAdapter: Send + Sync + 'static {
    async fn get_block_count(&self) -> Result<u64, UpstreamError>;
    async fn get_block_by_height(&self, height: u64) -> Result<Vec<u8>, UpstreamError>;
    async fn get_block_by_hash(&self, hash: &str) -> Result<Vec<u8>, UpstreamError>;
    async fn get_transaction(&self, hash: &str) -> Result<Vec<u8>, UpstreamError>;
}
