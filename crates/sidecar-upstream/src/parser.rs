use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::UpstreamError;

/// A token's metadata, as returned by `GET /v1.0/tokens`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
    pub address: Option<String>,
}

pub type TokenMap = BTreeMap<String, TokenInfo>;

/// Decodes raw adapter bytes into the JSON-serializable shapes the routes
/// return, and exposes the blockchain's static token table (§6 "Parser
/// contract").
///
/// `Block`/`Transaction` are left abstract rather than modeled after any one
/// chain's schema — the sidecar itself never inspects their fields, only
/// serializes them.
pub trait Parser: Send + Sync + 'static {
    type Block: Serialize + Send + Sync + 'static;
    type Transaction: Serialize + Send + Sync + 'static;

    fn decode_block(&self, raw: &[u8]) -> Result<Self::Block, UpstreamError>;
    fn decode_transaction(&self, raw: &[u8]) -> Result<Self::Transaction, UpstreamError>;
    fn tokens(&self) -> &TokenMap;
}
