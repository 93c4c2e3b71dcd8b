//! Blockchain-agnostic contracts for the sidecar's one stateful dependency:
//! the upstream node. A [`BlockchainAdapter`] fetches raw bytes; a [`Parser`]
//! decodes them and exposes a static token table; [`Operations`] glues the
//! two together into the calls a route handler actually makes.

mod adapter;
mod blockchain_id;
mod error;
mod operations;
mod parser;

pub use adapter::BlockchainAdapter;
pub use blockchain_id::BlockchainId;
pub use error::UpstreamError;
pub use operations::Operations;
pub use parser::{Parser, TokenInfo, TokenMap};
