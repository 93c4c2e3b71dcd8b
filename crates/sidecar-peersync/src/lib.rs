//! Gossip between sidecar replicas so a distributed rate limiter's counters
//! converge (§4.4 PeerSync): inbound application of a peer's reported
//! counter delta, and outbound fan-out when the local counter crosses a
//! sync boundary.

mod broadcaster;
mod error;
mod inbound;
mod model;

pub use broadcaster::Broadcaster;
pub use error::PeerSyncError;
pub use inbound::{apply, authorize};
pub use model::Limit;
