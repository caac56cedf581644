//! Test utilities for discovery.
//!
//! Controllable clock, recording collaborators and record builders for
//! deterministic tests. Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust,ignore
//! use discv5_protocol::test_utils::ManualTimeSource;
//! use discv5_protocol::TimeSource;
//!
//! let time = ManualTimeSource::new(1000);
//! time.advance(5);
//! assert_eq!(time.now().as_secs(), 1005);
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use discv5_crypto::Secp256k1KeyPair;
use parking_lot::Mutex;

use crate::domain::{log_distance, LocalNode, NodeId, NodeRecord, Timestamp};
use crate::message::Message;
use crate::ports::{LivenessChecker, MessageDispatcher, TimeSource};
use crate::session::SessionInfo;

/// A time source that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    secs: AtomicU64,
}

impl ManualTimeSource {
    /// Start at `secs`.
    pub fn new(secs: u64) -> Self {
        Self {
            secs: AtomicU64::new(secs),
        }
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump to `secs`.
    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.secs.load(Ordering::SeqCst))
    }
}

/// Liveness checker that records every requested check.
#[derive(Debug, Default)]
pub struct RecordingLivenessChecker {
    checked: Mutex<Vec<NodeRecord>>,
}

impl RecordingLivenessChecker {
    /// Create with no recorded checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the recorded checks.
    pub fn take(&self) -> Vec<NodeRecord> {
        std::mem::take(&mut *self.checked.lock())
    }
}

impl LivenessChecker for RecordingLivenessChecker {
    fn check_liveness(&self, record: NodeRecord) {
        self.checked.lock().push(record);
    }
}

/// Dispatcher that records every message it receives.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    messages: Mutex<Vec<(Message, SessionInfo)>>,
}

impl RecordingDispatcher {
    /// Create with no recorded messages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded messages.
    pub fn messages(&self) -> Vec<(Message, SessionInfo)> {
        self.messages.lock().clone()
    }
}

impl MessageDispatcher for RecordingDispatcher {
    fn dispatch(&self, message: &Message, session: &SessionInfo) {
        self.messages.lock().push((message.clone(), session.clone()));
    }
}

/// Loopback address on `port`.
pub fn local_addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Fresh local node with a random key.
pub fn local_node(port: u16) -> Arc<LocalNode> {
    Arc::new(LocalNode::new(
        Secp256k1KeyPair::generate(),
        local_addr(port),
        None,
    ))
}

/// Signed record for a random key.
pub fn random_record() -> NodeRecord {
    NodeRecord::signed(&Secp256k1KeyPair::generate(), 1, local_addr(30303), None)
}

/// Signed record whose id is at `distance` from `local`.
///
/// Found by trying random keys, so only practical for distances near the
/// top of the range (a random id lands in bucket 256 half the time).
pub fn record_at_distance(local: &NodeId, distance: u16) -> NodeRecord {
    loop {
        let record = random_record();
        if log_distance(local, record.node_id()) == distance {
            return record;
        }
    }
}

/// Node id at exactly `distance` from `base`, varied by `salt`.
pub fn node_id_at_distance(base: &NodeId, distance: u16, salt: u8) -> NodeId {
    assert!((1..=256).contains(&distance), "distance out of range");
    let mut bytes = *base.as_bytes();
    let bit = usize::from(distance - 1);
    let byte_index = 31 - bit / 8;
    bytes[byte_index] ^= 1 << (bit % 8);
    if bit >= 8 {
        // Perturb a byte strictly below the flipped bit.
        bytes[31] ^= salt;
    }
    NodeId::new(bytes)
}
