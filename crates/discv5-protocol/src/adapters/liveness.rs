use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::domain::NodeRecord;
use crate::ports::LivenessChecker;

/// Liveness checker that hands records to a channel.
///
/// The receiving end goes to `DiscoveryService::run_liveness_checks`, which
/// PINGs each record; a PONG confirms the node in the routing table. The
/// routing table never waits on a check.
#[derive(Debug, Clone)]
pub struct ChannelLivenessChecker {
    tx: UnboundedSender<NodeRecord>,
}

impl ChannelLivenessChecker {
    /// Create the checker and the receiver that drains it.
    pub fn channel() -> (Self, UnboundedReceiver<NodeRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LivenessChecker for ChannelLivenessChecker {
    fn check_liveness(&self, record: NodeRecord) {
        if let Err(err) = self.tx.send(record) {
            debug!(
                "[discv5] Liveness check of {} dropped: receiver closed",
                err.0.node_id()
            );
        }
    }
}
