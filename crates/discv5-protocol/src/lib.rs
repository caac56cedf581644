//! # discv5 Peer Discovery
//!
//! The core of a discv5 node: packet codec, session handshake, k-bucket
//! routing table and recursive lookup.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** node ids, log distance, signed node records, k-buckets
//! - **Wire:** packet framing, header masking, authdata variants
//! - **Session:** WHOAREYOU/HANDSHAKE state machine and session keys
//! - **Lookup:** bounded-concurrency iterative search
//! - **Ports Layer:** traits for transport, liveness, dispatch, time, config
//! - **Service Layer:** the inbound pipeline and request/response tracking
//! - **Adapters Layer:** system clock, config providers, transports
//!
//! ## Feature Flags
//!
//! - `network` - tokio UDP transport and TOML config files
//! - `test-utils` - controllable clock and recording collaborators
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use discv5_crypto::Secp256k1KeyPair;
//! use discv5_protocol::adapters::{ChannelLivenessChecker, SystemTimeSource};
//! use discv5_protocol::{log_distance, DiscoveryConfig, LocalNode, NodeRecord, RoutingTable};
//!
//! let local = Arc::new(LocalNode::new(
//!     Secp256k1KeyPair::generate(),
//!     "127.0.0.1:9000".parse().unwrap(),
//!     None,
//! ));
//! let (liveness, _checks) = ChannelLivenessChecker::channel();
//! let table = RoutingTable::new(
//!     local.clone(),
//!     &DiscoveryConfig::default(),
//!     Arc::new(liveness),
//!     Arc::new(SystemTimeSource::new()),
//! )
//! .unwrap();
//!
//! let peer = NodeRecord::signed(
//!     &Secp256k1KeyPair::generate(),
//!     1,
//!     "127.0.0.1:9001".parse().unwrap(),
//!     None,
//! );
//! table.offer(peer.clone());
//!
//! let distance = log_distance(local.node_id(), peer.node_id());
//! assert_eq!(table.get_all_node_records(distance), vec![peer]);
//! assert_eq!(table.get_all_node_records(0), vec![local.record()]);
//! ```

#![warn(missing_docs)]

pub mod adapters;
pub mod domain;
pub mod lookup;
pub mod message;
pub mod ports;
pub mod service;
pub mod session;
pub mod wire;

/// Test utilities (ManualTimeSource, recording collaborators).
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// RE-EXPORTS
// =============================================================================

// Domain
pub use domain::{
    find_k_closest, log_distance, sort_records_by_distance, xor_distance, DiscoveryConfig,
    DiscoveryError, KBucket, LocalNode, NodeId, NodeRecord, PacketError, RoutingTable,
    RoutingTableStats, Timestamp, XorDistance,
};

// Protocol
pub use lookup::RecursiveLookupTask;
pub use message::{Message, MessageType, RequestId};
pub use session::{SessionInfo, SessionManager, SessionState};
pub use wire::{AuthData, Packet, RawPacket};

// Ports
pub use ports::{
    AddressAccessPolicy, ConfigProvider, FindNodes, LivenessChecker, MessageDispatcher,
    TimeSource, Transport,
};

// Service
pub use service::{DiscoveryService, PacketOutcome, ServiceStats};
