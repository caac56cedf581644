//! Main RoutingTable implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::bucket::KBucket;
use super::closest::ClosestNodes;
use super::config::{is_bucket_distance, LivenessConfig, MAXIMUM_BUCKET, MINIMUM_BUCKET};
use crate::domain::{log_distance, DiscoveryConfig, DiscoveryError, LocalNode, NodeId, NodeRecord};
use crate::ports::{LivenessChecker, TimeSource};

/// Routing table statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutingTableStats {
    /// Members across all buckets
    pub total_nodes: usize,
    /// Members confirmed live
    pub live_nodes: usize,
    /// Buckets with at least one member
    pub buckets_used: usize,
    /// Buckets holding a replacement candidate
    pub pending_replacements: usize,
}

/// Kademlia routing table keyed by log distance from the local node.
///
/// Every operation takes the single table lock, copies out what it needs
/// and releases it before returning. Liveness checks requested by a bucket
/// are issued after the lock is dropped.
pub struct RoutingTable {
    local: Arc<LocalNode>,
    buckets: Mutex<BTreeMap<u16, KBucket>>,
    config: LivenessConfig,
    liveness: Arc<dyn LivenessChecker>,
    time: Arc<dyn TimeSource>,
}

impl RoutingTable {
    /// Create an empty table.
    ///
    /// Fails with `InvalidArgument` if the config has a zero bucket size.
    pub fn new(
        local: Arc<LocalNode>,
        config: &DiscoveryConfig,
        liveness: Arc<dyn LivenessChecker>,
        time: Arc<dyn TimeSource>,
    ) -> Result<Self, DiscoveryError> {
        config.validate()?;
        Ok(Self {
            local,
            buckets: Mutex::new(BTreeMap::new()),
            config: LivenessConfig::from(config),
            liveness,
            time,
        })
    }

    /// Our local node id.
    pub fn local_node_id(&self) -> &NodeId {
        self.local.node_id()
    }

    fn distance_to(&self, node_id: &NodeId) -> u16 {
        log_distance(self.local.node_id(), node_id)
    }

    /// Offer a record for inclusion.
    ///
    /// The local node and anything outside the bucket range are ignored.
    pub fn offer(&self, record: NodeRecord) {
        let distance = self.distance_to(record.node_id());
        if !is_bucket_distance(distance) {
            trace!("[discv5] Ignoring offer of {} at distance {}", record.node_id(), distance);
            return;
        }
        let now = self.time.now();
        let to_check = {
            let mut buckets = self.buckets.lock();
            buckets
                .entry(distance)
                .or_insert_with(|| KBucket::new(self.config))
                .offer(record, now)
        };
        if let Some(record) = to_check {
            self.liveness.check_liveness(record);
        }
    }

    /// A locally initiated request to this node received a valid response.
    ///
    /// Never call this for unsolicited inbound traffic.
    pub fn on_node_contacted(&self, record: NodeRecord) {
        let distance = self.distance_to(record.node_id());
        if !is_bucket_distance(distance) {
            return;
        }
        let now = self.time.now();
        self.buckets
            .lock()
            .entry(distance)
            .or_insert_with(|| KBucket::new(self.config))
            .on_liveness_confirmed(record, now);
    }

    /// Live records at `distance`. Distance 0 yields the local record.
    pub fn get_live_node_records(&self, distance: u16) -> Vec<NodeRecord> {
        if distance == 0 {
            return vec![self.local.record()];
        }
        self.buckets
            .lock()
            .get(&distance)
            .map(KBucket::live_records)
            .unwrap_or_default()
    }

    /// All records at `distance`. Distance 0 yields the local record.
    pub fn get_all_node_records(&self, distance: u16) -> Vec<NodeRecord> {
        if distance == 0 {
            return vec![self.local.record()];
        }
        self.buckets
            .lock()
            .get(&distance)
            .map(KBucket::all_records)
            .unwrap_or_default()
    }

    /// Records ordered by distance to `target`, lazily, bucket by bucket.
    ///
    /// Each call starts a fresh pass over the current table state.
    pub fn stream_closest_nodes(&self, target: NodeId) -> ClosestNodes<'_> {
        ClosestNodes::new(self, target, self.distance_to(&target))
    }

    /// Copy out the records of one bucket.
    pub(super) fn bucket_records(&self, distance: u16) -> Vec<NodeRecord> {
        self.buckets
            .lock()
            .get(&distance)
            .map(KBucket::all_records)
            .unwrap_or_default()
    }

    /// Copy out the records of every bucket closer than `below`, merged.
    pub(super) fn records_below(&self, below: u16) -> Vec<NodeRecord> {
        if below <= MINIMUM_BUCKET {
            return Vec::new();
        }
        self.buckets
            .lock()
            .range(MINIMUM_BUCKET..below)
            .flat_map(|(_, bucket)| bucket.all_records())
            .collect()
    }

    /// First non-empty bucket at or beyond `from`, with its records.
    pub(super) fn next_bucket_from(&self, from: u16) -> Option<(u16, Vec<NodeRecord>)> {
        if from > MAXIMUM_BUCKET {
            return None;
        }
        self.buckets
            .lock()
            .range(from..=MAXIMUM_BUCKET)
            .find(|(_, bucket)| !bucket.is_empty())
            .map(|(distance, bucket)| (*distance, bucket.all_records()))
    }

    /// Run maintenance on the non-empty bucket that has waited longest.
    pub fn perform_maintenance(&self) {
        let now = self.time.now();
        let to_check = {
            let mut buckets = self.buckets.lock();
            let oldest = buckets
                .iter_mut()
                .filter(|(_, bucket)| !bucket.is_empty())
                .min_by_key(|(_, bucket)| bucket.last_maintenance());
            match oldest {
                Some((distance, bucket)) => {
                    trace!("[discv5] Maintaining bucket {}", distance);
                    bucket.perform_maintenance(now)
                }
                None => None,
            }
        };
        if let Some(record) = to_check {
            self.liveness.check_liveness(record);
        }
    }

    /// Look up a member by id.
    pub fn get_node(&self, node_id: &NodeId) -> Option<NodeRecord> {
        let distance = self.distance_to(node_id);
        self.buckets
            .lock()
            .get(&distance)
            .and_then(|bucket| bucket.get(node_id).cloned())
    }

    /// Whether `node_id` is a bucket member.
    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        let distance = self.distance_to(node_id);
        self.buckets
            .lock()
            .get(&distance)
            .is_some_and(|bucket| bucket.contains(node_id))
    }

    /// Unconditionally remove a node.
    pub fn delete_node(&self, node_id: &NodeId) {
        let distance = self.distance_to(node_id);
        if let Some(bucket) = self.buckets.lock().get_mut(&distance) {
            if bucket.remove(node_id).is_some() {
                debug!("[discv5] Removed {} from bucket {}", node_id, distance);
            }
        }
    }

    /// Snapshot of all buckets keyed by distance.
    pub fn buckets_snapshot(&self) -> BTreeMap<u16, KBucket> {
        self.buckets.lock().clone()
    }

    /// Get routing table statistics.
    pub fn stats(&self) -> RoutingTableStats {
        let buckets = self.buckets.lock();
        let mut stats = RoutingTableStats::default();
        for bucket in buckets.values() {
            stats.total_nodes += bucket.len();
            stats.live_nodes += bucket.entries().iter().filter(|e| e.is_live()).count();
            stats.buckets_used += usize::from(!bucket.is_empty());
            stats.pending_replacements += usize::from(bucket.pending().is_some());
        }
        stats
    }
}

impl std::fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingTable")
            .field("local", self.local.node_id())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
