//! Local node identity.

use std::net::SocketAddr;

use discv5_crypto::{Secp256k1KeyPair, Secp256k1Signature};
use parking_lot::RwLock;
use tracing::info;

use crate::domain::{NodeId, NodeRecord};

/// The local key pair and its current signed record.
pub struct LocalNode {
    keypair: Secp256k1KeyPair,
    node_id: NodeId,
    record: RwLock<NodeRecord>,
}

impl LocalNode {
    /// Create with an initial record at sequence 1.
    pub fn new(keypair: Secp256k1KeyPair, udp: SocketAddr, tcp_port: Option<u16>) -> Self {
        let record = NodeRecord::signed(&keypair, 1, udp, tcp_port);
        Self {
            node_id: *record.node_id(),
            keypair,
            record: RwLock::new(record),
        }
    }

    /// Local node id.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Snapshot of the current record.
    pub fn record(&self) -> NodeRecord {
        self.record.read().clone()
    }

    /// Current record sequence number.
    pub fn seq(&self) -> u64 {
        self.record.read().seq()
    }

    /// Identity key pair, used for ECDH and id-nonce signatures.
    pub fn keypair(&self) -> &Secp256k1KeyPair {
        &self.keypair
    }

    /// Sign with the identity key.
    pub fn sign(&self, message: &[u8]) -> Secp256k1Signature {
        self.keypair.sign(message)
    }

    /// Re-sign the record with a new UDP endpoint. No-op if unchanged.
    ///
    /// Returns the record in effect afterwards.
    pub fn update_endpoint(&self, udp: SocketAddr) -> NodeRecord {
        let mut record = self.record.write();
        if record.udp_socket_addr() != udp {
            let updated =
                NodeRecord::signed(&self.keypair, record.seq() + 1, udp, record.tcp_port());
            info!(
                "[discv5] Local endpoint changed to {}, record seq {}",
                udp,
                updated.seq()
            );
            *record = updated;
        }
        record.clone()
    }
}

impl std::fmt::Debug for LocalNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalNode")
            .field("node_id", &self.node_id)
            .field("seq", &self.seq())
            .finish_non_exhaustive()
    }
}
