//! # Driven Ports (Outbound SPI)
//!
//! These are the interfaces the host application implements.

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::domain::{DiscoveryConfig, DiscoveryError, NodeRecord, Timestamp};
use crate::message::Message;
use crate::session::SessionInfo;

/// Datagram transport.
///
/// No ordering or delivery guarantees are assumed. Inbound datagrams are
/// pushed into `DiscoveryService::handle_inbound` by the adapter.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one datagram.
    async fn send(&self, bytes: Vec<u8>, destination: SocketAddr) -> Result<(), DiscoveryError>;
}

/// Liveness probing used by the routing table for eviction decisions.
///
/// Must not block: implementations queue the probe and report the outcome
/// later through `RoutingTable::on_node_contacted`.
pub trait LivenessChecker: Send + Sync {
    /// Start a liveness check for `record`.
    fn check_liveness(&self, record: NodeRecord);
}

/// Receives every decrypted message together with its session.
pub trait MessageDispatcher: Send + Sync {
    /// Consume one message.
    fn dispatch(&self, message: &Message, session: &SessionInfo);
}

/// Dispatcher that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpDispatcher;

impl MessageDispatcher for NoOpDispatcher {
    fn dispatch(&self, _message: &Message, _session: &SessionInfo) {}
}

/// Decides which remote addresses we exchange packets with.
pub trait AddressAccessPolicy: Send + Sync {
    /// Whether packets from or to `addr` are allowed.
    fn allow(&self, addr: &SocketAddr) -> bool;
}

/// Policy that allows every address.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllPolicy;

impl AddressAccessPolicy for AllowAllPolicy {
    fn allow(&self, _addr: &SocketAddr) -> bool {
        true
    }
}

/// Abstract interface for time-related operations.
///
/// Enables deterministic testing by injecting controllable time sources.
pub trait TimeSource: Send + Sync {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}

/// Abstract interface for configuration loading.
pub trait ConfigProvider: Send + Sync {
    /// Records to seed the routing table with.
    fn get_bootstrap_nodes(&self) -> Vec<NodeRecord>;

    /// Protocol parameters.
    fn get_discovery_config(&self) -> DiscoveryConfig;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTimeSource(u64);

    impl TimeSource for FixedTimeSource {
        fn now(&self) -> Timestamp {
            Timestamp::new(self.0)
        }
    }

    #[test]
    fn test_fixed_time_source_returns_configured_value() {
        let source = FixedTimeSource(1000);
        assert_eq!(source.now().as_secs(), 1000);
    }

    #[test]
    fn test_allow_all_policy() {
        let addr: SocketAddr = "192.0.2.1:9000".parse().unwrap();
        assert!(AllowAllPolicy.allow(&addr));
    }
}
