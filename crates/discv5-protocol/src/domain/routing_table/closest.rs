//! Lazy closest-first iteration over the routing table.

use std::vec;

use super::config::MINIMUM_BUCKET;
use super::table::RoutingTable;
use crate::domain::{sort_records_by_distance, NodeId, NodeRecord};

#[derive(Debug, Clone, Copy)]
enum Stage {
    /// The bucket at the target's own distance.
    TargetBucket,
    /// Every bucket closer to us than the target's.
    Closer,
    /// Buckets beyond the target's, one at a time, starting at the given
    /// distance.
    Farther(u16),
    Done,
}

/// Iterator over table records in ascending distance to a target.
///
/// Groups are fetched one at a time, each under a short table lock, and
/// sorted by XOR distance before being yielded. Dropping the iterator early
/// leaves the farther buckets untouched.
pub struct ClosestNodes<'a> {
    table: &'a RoutingTable,
    target: NodeId,
    target_distance: u16,
    stage: Stage,
    buffer: vec::IntoIter<NodeRecord>,
}

impl<'a> ClosestNodes<'a> {
    pub(super) fn new(table: &'a RoutingTable, target: NodeId, target_distance: u16) -> Self {
        Self {
            table,
            target,
            target_distance,
            stage: Stage::TargetBucket,
            buffer: Vec::new().into_iter(),
        }
    }

    /// Load the next group into the buffer. Returns false once exhausted.
    fn advance(&mut self) -> bool {
        let (next_stage, mut records) = match self.stage {
            Stage::TargetBucket => {
                let records = if self.target_distance >= MINIMUM_BUCKET {
                    self.table.bucket_records(self.target_distance)
                } else {
                    Vec::new()
                };
                (Stage::Closer, records)
            }
            Stage::Closer => (
                Stage::Farther(self.target_distance + 1),
                self.table.records_below(self.target_distance),
            ),
            Stage::Farther(from) => match self.table.next_bucket_from(from.max(MINIMUM_BUCKET)) {
                Some((distance, records)) => (Stage::Farther(distance + 1), records),
                None => (Stage::Done, Vec::new()),
            },
            Stage::Done => return false,
        };
        sort_records_by_distance(&mut records, &self.target);
        self.stage = next_stage;
        self.buffer = records.into_iter();
        true
    }
}

impl Iterator for ClosestNodes<'_> {
    type Item = NodeRecord;

    fn next(&mut self) -> Option<NodeRecord> {
        loop {
            if let Some(record) = self.buffer.next() {
                return Some(record);
            }
            if !self.advance() {
                return None;
            }
        }
    }
}
