//! Lookup task state and driver.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tracing::{debug, trace};

use crate::domain::{
    log_distance, xor_distance, DiscoveryError, NodeId, NodeRecord, RoutingTable, XorDistance,
};
use crate::ports::FindNodes;

/// Queries in flight at once unless configured otherwise.
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 3;

type QueryResult = (NodeRecord, Result<Vec<NodeRecord>, DiscoveryError>);

/// What a scheduling pass decided.
#[derive(Debug)]
enum Pass {
    /// Send these queries (possibly none, while others are in flight).
    Query(Vec<NodeRecord>),
    /// Nothing left to do.
    Complete,
}

/// Bookkeeping for one lookup. Only touched by the task's own driver, so
/// the initial pass and every completion are serialized.
#[derive(Debug)]
struct LookupState {
    target: NodeId,
    local_id: NodeId,
    queried: HashSet<NodeId>,
    found: BTreeMap<(XorDistance, NodeId), NodeRecord>,
    max_slots: usize,
    available_slots: usize,
    remaining_budget: usize,
    done: bool,
}

impl LookupState {
    fn schedule(&mut self, table: &RoutingTable) -> Pass {
        debug_assert!(self.available_slots <= self.max_slots);
        if self.done {
            return Pass::Complete;
        }
        if table.contains_node(&self.target) {
            trace!("[discv5] Lookup target {} is in the table", self.target);
            self.done = true;
            return Pass::Complete;
        }

        let max = self.available_slots.min(self.remaining_budget);
        let batch = if max == 0 {
            Vec::new()
        } else {
            self.candidates(table, max)
        };
        for record in &batch {
            self.queried.insert(*record.node_id());
        }
        self.available_slots -= batch.len();
        self.remaining_budget -= batch.len();

        if batch.is_empty() && self.available_slots == self.max_slots {
            self.done = true;
            return Pass::Complete;
        }
        Pass::Query(batch)
    }

    /// Closest unqueried records from the table and from earlier answers.
    fn candidates(&self, table: &RoutingTable, max: usize) -> Vec<NodeRecord> {
        let unqueried = |record: &NodeRecord| !self.queried.contains(record.node_id());
        let mut merged: BTreeMap<(XorDistance, NodeId), NodeRecord> = table
            .stream_closest_nodes(self.target)
            .filter(|record| unqueried(record))
            .take(max)
            .map(|record| (self.key(&record), record))
            .collect();
        merged.extend(
            self.found
                .iter()
                .filter(|(_, record)| unqueried(record))
                .take(max)
                .map(|(key, record)| (*key, record.clone())),
        );
        merged.into_values().take(max).collect()
    }

    fn complete(&mut self, peer: &NodeRecord, result: Result<Vec<NodeRecord>, DiscoveryError>) {
        self.available_slots += 1;
        match result {
            Ok(records) => {
                trace!(
                    "[discv5] Lookup got {} records from {}",
                    records.len(),
                    peer.node_id()
                );
                for record in records {
                    self.insert_found(record);
                }
            }
            Err(err) => debug!(
                "[discv5] Lookup query to {} failed: {}",
                peer.node_id(),
                err
            ),
        }
    }

    fn insert_found(&mut self, record: NodeRecord) {
        if record.node_id() == &self.local_id {
            return;
        }
        let key = self.key(&record);
        match self.found.get(&key) {
            Some(known) if known.seq() >= record.seq() => {}
            _ => {
                self.found.insert(key, record);
            }
        }
    }

    fn key(&self, record: &NodeRecord) -> (XorDistance, NodeId) {
        (xor_distance(record.node_id(), &self.target), *record.node_id())
    }
}

/// One lookup towards `target`.
///
/// Each pass asks the closest not-yet-queried nodes (from the table and
/// from earlier answers) for the bucket that should hold the target, until
/// nothing is left to ask or the budget runs out. A node is queried at most
/// once per task, the local node never.
pub struct RecursiveLookupTask {
    table: Arc<RoutingTable>,
    finder: Arc<dyn FindNodes>,
    state: LookupState,
}

impl RecursiveLookupTask {
    /// Create a task allowed at most `budget` queries in total.
    pub fn new(
        table: Arc<RoutingTable>,
        finder: Arc<dyn FindNodes>,
        target: NodeId,
        local_id: NodeId,
        budget: usize,
    ) -> Result<Self, DiscoveryError> {
        if budget == 0 {
            return Err(DiscoveryError::InvalidArgument(
                "lookup query budget must be positive".into(),
            ));
        }
        let mut queried = HashSet::new();
        queried.insert(local_id);
        Ok(Self {
            table,
            finder,
            state: LookupState {
                target,
                local_id,
                queried,
                found: BTreeMap::new(),
                max_slots: DEFAULT_MAX_CONCURRENT_QUERIES,
                available_slots: DEFAULT_MAX_CONCURRENT_QUERIES,
                remaining_budget: budget,
                done: false,
            },
        })
    }

    /// Override the concurrency window.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Result<Self, DiscoveryError> {
        if max_concurrent == 0 {
            return Err(DiscoveryError::InvalidArgument(
                "lookup concurrency must be positive".into(),
            ));
        }
        self.state.max_slots = max_concurrent;
        self.state.available_slots = max_concurrent;
        Ok(self)
    }

    /// Target of this lookup.
    pub fn target(&self) -> &NodeId {
        &self.state.target
    }

    /// Run to completion. Never fails: query errors only mean fewer results.
    ///
    /// Returns every record learned from answers, closest to the target
    /// first. Finishing early because the target reached the table, or
    /// dropping the future, abandons queries still in flight.
    pub async fn execute(mut self) -> Vec<NodeRecord> {
        let mut in_flight: FuturesUnordered<BoxFuture<'static, QueryResult>> =
            FuturesUnordered::new();
        loop {
            match self.state.schedule(&self.table) {
                Pass::Complete => break,
                Pass::Query(batch) => {
                    for peer in batch {
                        in_flight.push(self.query(peer));
                    }
                }
            }
            match in_flight.next().await {
                Some((peer, result)) => self.state.complete(&peer, result),
                None => break,
            }
        }
        debug!(
            "[discv5] Lookup for {} finished: {} found, {} queried",
            self.state.target,
            self.state.found.len(),
            self.state.queried.len() - 1
        );
        self.state.found.into_values().collect()
    }

    fn query(&self, peer: NodeRecord) -> BoxFuture<'static, QueryResult> {
        let finder = Arc::clone(&self.finder);
        let distance = log_distance(peer.node_id(), &self.state.target);
        async move {
            let result = finder.find_nodes(&peer, distance).await;
            (peer, result)
        }
        .boxed()
    }
}

impl std::fmt::Debug for RecursiveLookupTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecursiveLookupTask")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
