//! K-Bucket implementation.

use super::config::LivenessConfig;
use crate::domain::{NodeId, NodeRecord, Timestamp};

/// A bucket member plus its liveness timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketEntry {
    record: NodeRecord,
    last_confirmed: Option<Timestamp>,
    last_check: Option<Timestamp>,
}

impl BucketEntry {
    fn new(record: NodeRecord) -> Self {
        Self {
            record,
            last_confirmed: None,
            last_check: None,
        }
    }

    fn confirmed(record: NodeRecord, now: Timestamp) -> Self {
        Self {
            record,
            last_confirmed: Some(now),
            last_check: None,
        }
    }

    /// The node record.
    pub fn record(&self) -> &NodeRecord {
        &self.record
    }

    /// Node id shorthand.
    pub fn node_id(&self) -> &NodeId {
        self.record.node_id()
    }

    /// Whether the node has ever answered one of our requests.
    pub fn is_live(&self) -> bool {
        self.last_confirmed.is_some()
    }

    /// When the node last answered one of our requests.
    pub fn last_confirmed(&self) -> Option<Timestamp> {
        self.last_confirmed
    }

    /// A check was sent, no confirmation arrived after it, and the timeout
    /// has passed.
    fn has_failed_liveness_check(&self, now: Timestamp, timeout_secs: u64) -> bool {
        match self.last_check {
            Some(check) => {
                let answered = self.last_confirmed.is_some_and(|confirmed| confirmed >= check);
                !answered && check.has_elapsed(now, timeout_secs)
            }
            None => false,
        }
    }

    fn needs_liveness_check(&self, now: Timestamp, interval_secs: u64) -> bool {
        self.last_check
            .map_or(true, |check| check.has_elapsed(now, interval_secs))
    }

    fn mark_checked(&mut self, now: Timestamp) -> NodeRecord {
        self.last_check = Some(now);
        self.record.clone()
    }

    /// Keep the newer of the two records.
    fn refresh_record(&mut self, record: NodeRecord) {
        if record.seq() > self.record.seq() {
            self.record = record;
        }
    }
}

/// Bounded set of nodes at one log distance.
///
/// Members are ordered most-recently-confirmed first; the tail is the
/// eviction candidate. Liveness checks are not performed here: methods
/// return the record that needs checking and the owning table hands it to
/// the liveness checker once its lock is released.
#[derive(Debug, Clone)]
pub struct KBucket {
    entries: Vec<BucketEntry>,
    pending: Option<BucketEntry>,
    last_maintenance: Timestamp,
    config: LivenessConfig,
}

impl KBucket {
    /// Create a new empty bucket.
    pub fn new(config: LivenessConfig) -> Self {
        Self {
            entries: Vec::with_capacity(config.bucket_size),
            pending: None,
            last_maintenance: Timestamp::default(),
            config,
        }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the bucket is at capacity.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.config.bucket_size
    }

    /// Members, most recently confirmed first.
    pub fn entries(&self) -> &[BucketEntry] {
        &self.entries
    }

    /// Replacement candidate waiting for a member to fail.
    pub fn pending(&self) -> Option<&BucketEntry> {
        self.pending.as_ref()
    }

    /// When maintenance last ran on this bucket.
    pub fn last_maintenance(&self) -> Timestamp {
        self.last_maintenance
    }

    /// All member records.
    pub fn all_records(&self) -> Vec<NodeRecord> {
        self.entries.iter().map(|e| e.record.clone()).collect()
    }

    /// Member records confirmed live.
    pub fn live_records(&self) -> Vec<NodeRecord> {
        self.entries
            .iter()
            .filter(|e| e.is_live())
            .map(|e| e.record.clone())
            .collect()
    }

    /// Member record by id.
    pub fn get(&self, node_id: &NodeId) -> Option<&NodeRecord> {
        self.position(node_id).map(|pos| &self.entries[pos].record)
    }

    /// Check if bucket contains a member.
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.position(node_id).is_some()
    }

    fn position(&self, node_id: &NodeId) -> Option<usize> {
        self.entries.iter().position(|e| e.node_id() == node_id)
    }

    fn is_pending(&self, node_id: &NodeId) -> bool {
        self.pending.as_ref().is_some_and(|p| p.node_id() == node_id)
    }

    /// Offer a candidate. Returns a record to liveness-check, if any.
    pub(crate) fn offer(&mut self, record: NodeRecord, now: Timestamp) -> Option<NodeRecord> {
        if let Some(pos) = self.position(record.node_id()) {
            self.entries[pos].refresh_record(record);
            return None;
        }
        if self.is_pending(record.node_id()) {
            if let Some(pending) = self.pending.as_mut() {
                pending.refresh_record(record);
            }
            return None;
        }
        if !self.is_full() {
            let mut entry = BucketEntry::new(record);
            let to_check = entry.mark_checked(now);
            self.entries.push(entry);
            return Some(to_check);
        }
        if self.pending.is_some() {
            // One replacement at a time; further candidates are dropped.
            return None;
        }
        self.pending = Some(BucketEntry::new(record));
        self.perform_maintenance(now)
    }

    /// A request to this node got a valid response: mark live and move to
    /// the front.
    pub(crate) fn on_liveness_confirmed(&mut self, record: NodeRecord, now: Timestamp) {
        if let Some(pos) = self.position(record.node_id()) {
            let mut entry = self.entries.remove(pos);
            entry.refresh_record(record);
            entry.last_confirmed = Some(now);
            self.entries.insert(0, entry);
            return;
        }
        if self.is_pending(record.node_id()) {
            if let Some(mut pending) = self.pending.take() {
                pending.refresh_record(record);
                pending.last_confirmed = Some(now);
                if self.is_full() {
                    self.pending = Some(pending);
                } else {
                    self.entries.insert(0, pending);
                }
            }
            return;
        }
        if !self.is_full() {
            self.entries.insert(0, BucketEntry::confirmed(record, now));
        } else if self.pending.is_none() {
            self.pending = Some(BucketEntry::confirmed(record, now));
        }
    }

    /// Re-validate the least recently confirmed member.
    ///
    /// If it failed its last check it is evicted and the pending candidate
    /// takes its place. Returns a record to liveness-check, if any.
    pub(crate) fn perform_maintenance(&mut self, now: Timestamp) -> Option<NodeRecord> {
        self.last_maintenance = now;
        let timeout = self.config.check_timeout_secs;
        let interval = self.config.check_interval_secs;

        let last = self.entries.last_mut()?;
        if last.has_failed_liveness_check(now, timeout) {
            self.entries.pop();
            let mut promoted = self.pending.take()?;
            let to_check = (!promoted.is_live()).then(|| promoted.mark_checked(now));
            self.entries.push(promoted);
            return to_check;
        }
        if last.needs_liveness_check(now, interval) {
            return Some(last.mark_checked(now));
        }
        None
    }

    /// Remove a member; the pending candidate, if any, fills the slot.
    pub(crate) fn remove(&mut self, node_id: &NodeId) -> Option<NodeRecord> {
        if self.is_pending(node_id) {
            return self.pending.take().map(|p| p.record);
        }
        let pos = self.position(node_id)?;
        let removed = self.entries.remove(pos);
        if let Some(pending) = self.pending.take() {
            self.entries.push(pending);
        }
        Some(removed.record)
    }
}
