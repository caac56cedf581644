//! # Driving Ports (Inbound API)

use async_trait::async_trait;

use crate::domain::{DiscoveryError, NodeRecord};

/// Ask a peer for the records it holds at a log distance from itself.
///
/// Consumed by the recursive lookup; implemented by the discovery service,
/// which owns per-request timeouts.
#[async_trait]
pub trait FindNodes: Send + Sync {
    /// Send FINDNODE for `distance` to `peer` and collect the NODES reply.
    async fn find_nodes(
        &self,
        peer: &NodeRecord,
        distance: u16,
    ) -> Result<Vec<NodeRecord>, DiscoveryError>;
}
