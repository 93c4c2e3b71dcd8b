//! The read operations a route handler invokes: fetch raw bytes from the
//! adapter, decode with the parser. Grounded in the upstream sidecar's
//! `operations_v1_0` module, including its height validation.

use std::sync::Arc;

use crate::adapter::BlockchainAdapter;
use crate::error::UpstreamError;
use crate::parser::Parser;

/// Glues one blockchain's [`BlockchainAdapter`] and [`Parser`] together.
///
/// Cheap to clone: both halves are held behind `Arc`.
pub struct Operations<A, P> {
    adapter: Arc<A>,
    parser: Arc<P>,
}

impl<A, P> Clone for Operations<A, P> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            parser: Arc::clone(&self.parser),
        }
    }
}

impl<A, P> Operations<A, P>
where
    A: BlockchainAdapter,
    P: Parser,
{
    pub fn new(adapter: Arc<A>, parser: Arc<P>) -> Self {
        Self { adapter, parser }
    }

    pub async fn get_block_latest(&self) -> Result<P::Block, UpstreamError> {
        let height = self.adapter.get_block_count().await?;
        self.get_block_by_height(height).await
    }

    pub async fn get_block_by_height(&self, height: u64) -> Result<P::Block, UpstreamError> {
        if height < 1 {
            return Err(UpstreamError::DoesNotExist);
        }
        let raw = self.adapter.get_block_by_height(height).await?;
        self.parser.decode_block(&raw)
    }

    pub async fn get_block_by_hash(&self, hash: &str) -> Result<P::Block, UpstreamError> {
        let raw = self.adapter.get_block_by_hash(hash).await?;
        self.parser.decode_block(&raw)
    }

    pub async fn get_transaction_by_hash(&self, hash: &str) -> Result<P::Transaction, UpstreamError> {
        let raw = self.adapter.get_transaction(hash).await?;
        self.parser.decode_transaction(&raw)
    }

    pub fn tokens(&self) -> &crate::parser::TokenMap {
        self.parser.tokens()
    }
}
