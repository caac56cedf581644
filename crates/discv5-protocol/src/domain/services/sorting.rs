//! Record sorting and selection.

use super::distance::xor_distance;
use crate::domain::{NodeId, NodeRecord};

/// Sort records by XOR distance to `target` (closest first), ties broken
/// by node id.
pub fn sort_records_by_distance(records: &mut [NodeRecord], target: &NodeId) {
    records.sort_by(|a, b| {
        xor_distance(a.node_id(), target)
            .cmp(&xor_distance(b.node_id(), target))
            .then_with(|| a.node_id().cmp(b.node_id()))
    });
}

/// The `k` records closest to `target`.
pub fn find_k_closest(records: &[NodeRecord], target: &NodeId, k: usize) -> Vec<NodeRecord> {
    let mut sorted = records.to_vec();
    sort_records_by_distance(&mut sorted, target);
    sorted.truncate(k);
    sorted
}
