//! A generic JSON-RPC adapter and passthrough parser.
//!
//! §1 scopes the real per-chain adapter/parser out: "treated as an external
//! collaborator with a fixed interface". This module provides the minimal
//! concrete implementation needed to boot the binary against any
//! JSON-RPC-speaking node — it decodes nothing chain-specific, just forwards
//! the node's JSON verbatim as the response body. A production deployment
//! swaps this for a real per-chain adapter/parser pair without touching any
//! other module; [`sidecar_upstream::BlockchainAdapter`]/[`sidecar_upstream::Parser`]
//! are the seam.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sidecar_upstream::{BlockchainAdapter, BlockchainId, Parser, TokenInfo, TokenMap, UpstreamError};

/// Speaks JSON-RPC 2.0 over HTTP to the configured upstream node.
pub struct HttpAdapter {
    client: reqwest::Client,
    node_url: String,
    node_token: String,
}

impl HttpAdapter {
    pub fn new(node_url: impl Into<String>, node_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            node_url: node_url.into(),
            node_token: node_token.into(),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, UpstreamError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.node_url)
            .bearer_auth(&self.node_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| map_transport_error(&err))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(UpstreamError::DoesNotExist);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::TooManyRequests);
        }
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(UpstreamError::Unavailable);
        }
        if !status.is_success() {
            return Err(UpstreamError::Other(format!("upstream returned status {status}")));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|err| UpstreamError::Other(format!("invalid JSON-RPC response: {err}")))?;

        if let Some(error) = envelope.get("error") {
            return Err(map_rpc_error(error));
        }

        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| UpstreamError::Other("JSON-RPC response missing \"result\"".to_string()))
    }
}

fn map_transport_error(err: &reqwest::Error) -> UpstreamError {
    if err.is_timeout() || err.is_connect() {
        UpstreamError::Unavailable
    } else {
        UpstreamError::Other(err.to_string())
    }
}

fn map_rpc_error(error: &Value) -> UpstreamError {
    match error.get("code").and_then(Value::as_i64) {
        Some(-32601) => UpstreamError::DoesNotExist,
        Some(-32000) => UpstreamError::NodeNotReady,
        _ => UpstreamError::Other(error.to_string()),
    }
}

#[async_trait]
impl BlockchainAdapter for HttpAdapter {
    async fn get_block_count(&self) -> Result<u64, UpstreamError> {
        let result = self.call("getblockcount", serde_json::json!([])).await?;
        result
            .as_u64()
            .ok_or_else(|| UpstreamError::Other("getblockcount did not return an integer".to_string()))
    }

    async fn get_block_by_height(&self, height: u64) -> Result<Vec<u8>, UpstreamError> {
        let result = self.call("getblockbyheight", serde_json::json!([height])).await?;
        serde_json::to_vec(&result).map_err(|err| UpstreamError::Other(err.to_string()))
    }

    async fn get_block_by_hash(&self, hash: &str) -> Result<Vec<u8>, UpstreamError> {
        let result = self.call("getblockbyhash", serde_json::json!([hash])).await?;
        serde_json::to_vec(&result).map_err(|err| UpstreamError::Other(err.to_string()))
    }

    async fn get_transaction(&self, hash: &str) -> Result<Vec<u8>, UpstreamError> {
        let result = self.call("gettransaction", serde_json::json!([hash])).await?;
        serde_json::to_vec(&result).map_err(|err| UpstreamError::Other(err.to_string()))
    }
}

/// Decodes raw adapter bytes as plain JSON, rather than any chain-specific
/// block/transaction schema (see module docs).
pub struct PassthroughParser {
    tokens: TokenMap,
}

impl PassthroughParser {
    pub fn new(blockchain: &BlockchainId) -> Self {
        Self {
            tokens: default_tokens(blockchain),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RawBlock(pub Value);

#[derive(Debug, Clone, Serialize)]
pub struct RawTransaction(pub Value);

impl Parser for PassthroughParser {
    type Block = RawBlock;
    type Transaction = RawTransaction;

    fn decode_block(&self, raw: &[u8]) -> Result<Self::Block, UpstreamError> {
        serde_json::from_slice(raw)
            .map(RawBlock)
            .map_err(|err| UpstreamError::Other(format!("block decode error: {err}")))
    }

    fn decode_transaction(&self, raw: &[u8]) -> Result<Self::Transaction, UpstreamError> {
        serde_json::from_slice(raw)
            .map(RawTransaction)
            .map_err(|err| UpstreamError::Other(format!("transaction decode error: {err}")))
    }

    fn tokens(&self) -> &TokenMap {
        &self.tokens
    }
}

/// A small built-in token table per known chain; `Other` chains start empty.
/// Real deployments are expected to supply their own [`Parser::tokens`].
fn default_tokens(blockchain: &BlockchainId) -> TokenMap {
    let mut tokens = TokenMap::new();
    match blockchain {
        BlockchainId::Ethereum => {
            tokens.insert(
                "ETH".to_string(),
                TokenInfo { symbol: "ETH".to_string(), decimals: 18, address: None },
            );
            tokens.insert(
                "USDC".to_string(),
                TokenInfo {
                    symbol: "USDC".to_string(),
                    decimals: 6,
                    address: Some("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string()),
                },
            );
        }
        BlockchainId::Bitcoin => {
            tokens.insert(
                "BTC".to_string(),
                TokenInfo { symbol: "BTC".to_string(), decimals: 8, address: None },
            );
        }
        BlockchainId::Polygon => {
            tokens.insert(
                "MATIC".to_string(),
                TokenInfo { symbol: "MATIC".to_string(), decimals: 18, address: None },
            );
        }
        BlockchainId::Avalanche => {
            tokens.insert(
                "AVAX".to_string(),
                TokenInfo { symbol: "AVAX".to_string(), decimals: 18, address: None },
            );
        }
        BlockchainId::Other(_) => {}
    }
    tokens
}
