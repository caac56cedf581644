//! Tests for the routing table.

use std::sync::Arc;

use super::*;
use crate::domain::{log_distance, xor_distance, DiscoveryConfig, DiscoveryError, LocalNode};
use crate::test_utils::{
    local_node, random_record, record_at_distance, ManualTimeSource, RecordingLivenessChecker,
};

struct Fixture {
    table: RoutingTable,
    local: Arc<LocalNode>,
    liveness: Arc<RecordingLivenessChecker>,
    time: Arc<ManualTimeSource>,
}

fn setup() -> Fixture {
    let local = local_node(9000);
    let liveness = Arc::new(RecordingLivenessChecker::new());
    let time = Arc::new(ManualTimeSource::new(1_000));
    let table = RoutingTable::new(
        local.clone(),
        &DiscoveryConfig::for_testing(),
        liveness.clone(),
        time.clone(),
    )
    .unwrap();
    Fixture {
        table,
        local,
        liveness,
        time,
    }
}

/// Fill the 256 bucket to capacity (3 with the test config).
fn fill_top_bucket(f: &Fixture) -> Vec<crate::domain::NodeRecord> {
    let members: Vec<_> = (0..3)
        .map(|_| record_at_distance(f.local.node_id(), 256))
        .collect();
    for record in &members {
        f.table.offer(record.clone());
    }
    members
}

// =============================================================================
// Construction and range
// =============================================================================

#[test]
fn test_zero_bucket_size_rejected() {
    let config = DiscoveryConfig {
        bucket_size: 0,
        ..DiscoveryConfig::for_testing()
    };
    let result = RoutingTable::new(
        local_node(9000),
        &config,
        Arc::new(RecordingLivenessChecker::new()),
        Arc::new(ManualTimeSource::new(0)),
    );
    assert!(matches!(result, Err(DiscoveryError::InvalidArgument(_))));
}

#[test]
fn test_bucket_range() {
    assert!(!is_bucket_distance(0));
    assert!(is_bucket_distance(MINIMUM_BUCKET));
    assert!(is_bucket_distance(MAXIMUM_BUCKET));
    assert!(!is_bucket_distance(MAXIMUM_BUCKET + 1));
}

#[test]
fn test_distance_zero_returns_local_record() {
    let f = setup();

    assert_eq!(f.table.get_all_node_records(0), vec![f.local.record()]);
    assert_eq!(f.table.get_live_node_records(0), vec![f.local.record()]);
}

#[test]
fn test_local_record_never_bucketed() {
    let f = setup();

    f.table.offer(f.local.record());
    f.table.on_node_contacted(f.local.record());

    assert!(!f.table.contains_node(f.local.node_id()));
    assert!(f.table.get_node(f.local.node_id()).is_none());
    assert_eq!(f.table.stats().total_nodes, 0);
}

#[test]
fn test_out_of_range_distance_is_empty() {
    let f = setup();
    fill_top_bucket(&f);

    assert!(f.table.get_all_node_records(MAXIMUM_BUCKET + 1).is_empty());
    assert!(f.table.get_live_node_records(MAXIMUM_BUCKET + 1).is_empty());
}

// =============================================================================
// Offer and liveness
// =============================================================================

#[test]
fn test_offer_adds_and_requests_liveness_check() {
    let f = setup();
    let record = random_record();

    f.table.offer(record.clone());

    assert_eq!(f.table.get_node(record.node_id()), Some(record.clone()));
    assert_eq!(f.liveness.take(), vec![record.clone()]);
    let distance = log_distance(f.local.node_id(), record.node_id());
    assert_eq!(f.table.get_all_node_records(distance), vec![record]);
    assert!(f.table.get_live_node_records(distance).is_empty());
}

#[test]
fn test_on_node_contacted_marks_live_and_moves_to_front() {
    let f = setup();
    let members = fill_top_bucket(&f);

    f.table.on_node_contacted(members[2].clone());

    let live = f.table.get_live_node_records(256);
    assert_eq!(live, vec![members[2].clone()]);
    assert_eq!(f.table.get_all_node_records(256)[0], members[2]);
    assert_eq!(f.table.stats().live_nodes, 1);
}

#[test]
fn test_offer_beyond_capacity_never_exceeds_bucket_size() {
    let f = setup();
    fill_top_bucket(&f);

    for _ in 0..5 {
        f.table.offer(record_at_distance(f.local.node_id(), 256));
    }

    assert_eq!(f.table.get_all_node_records(256).len(), 3);
    assert_eq!(f.table.stats().pending_replacements, 1);
}

#[test]
fn test_newer_record_replaces_older() {
    let f = setup();
    let keypair = discv5_crypto::Secp256k1KeyPair::generate();
    let addr = crate::test_utils::local_addr(1);
    let old = crate::domain::NodeRecord::signed(&keypair, 1, addr, None);
    let new = crate::domain::NodeRecord::signed(&keypair, 2, addr, Some(5));

    f.table.offer(old.clone());
    f.table.offer(new.clone());
    f.table.offer(old);

    assert_eq!(f.table.get_node(new.node_id()), Some(new));
}

#[test]
fn test_failed_member_evicted_for_pending() {
    let f = setup();
    let members = fill_top_bucket(&f);
    let candidate = record_at_distance(f.local.node_id(), 256);
    f.liveness.take();

    // Full bucket: candidate waits as the pending replacement.
    f.table.offer(candidate.clone());
    assert!(!f.table.contains_node(candidate.node_id()));

    // None of the members answered their initial check.
    f.time.advance(2);
    f.table.perform_maintenance();

    assert!(!f.table.contains_node(members[2].node_id()));
    assert!(f.table.contains_node(candidate.node_id()));
    assert_eq!(f.table.get_all_node_records(256).len(), 3);
    assert_eq!(f.liveness.take(), vec![candidate]);
}

#[test]
fn test_live_members_keep_their_slots() {
    let f = setup();
    let members = fill_top_bucket(&f);
    for record in &members {
        f.table.on_node_contacted(record.clone());
    }
    let candidate = record_at_distance(f.local.node_id(), 256);

    f.table.offer(candidate.clone());
    f.time.advance(2);
    f.table.perform_maintenance();

    assert!(!f.table.contains_node(candidate.node_id()));
    for record in &members {
        assert!(f.table.contains_node(record.node_id()));
    }
}

#[test]
fn test_second_candidate_dropped_while_one_pending() {
    let f = setup();
    fill_top_bucket(&f);
    for record in f.table.get_all_node_records(256) {
        f.table.on_node_contacted(record);
    }
    let first = record_at_distance(f.local.node_id(), 256);
    let second = record_at_distance(f.local.node_id(), 256);

    f.table.offer(first.clone());
    f.table.offer(second);

    let snapshot = f.table.buckets_snapshot();
    let pending = snapshot[&256].pending().map(|p| p.record().clone());
    assert_eq!(pending, Some(first));
}

#[test]
fn test_stale_member_rechecked_then_evicted() {
    let f = setup();
    let members = fill_top_bucket(&f);
    for record in &members {
        f.table.on_node_contacted(record.clone());
    }
    let candidate = record_at_distance(f.local.node_id(), 256);
    f.table.offer(candidate.clone());
    f.liveness.take();

    // Past the check interval: the tail member gets a fresh check.
    f.time.advance(5);
    f.table.perform_maintenance();
    let tail = members[0].clone();
    assert_eq!(f.liveness.take(), vec![tail.clone()]);

    // It never answers.
    f.time.advance(2);
    f.table.perform_maintenance();

    assert!(!f.table.contains_node(tail.node_id()));
    assert!(f.table.contains_node(candidate.node_id()));
}

#[test]
fn test_maintenance_rotates_through_buckets() {
    let f = setup();
    f.table.offer(record_at_distance(f.local.node_id(), 256));
    f.table.offer(record_at_distance(f.local.node_id(), 255));

    f.time.set(2_000);
    f.table.perform_maintenance();
    f.time.set(3_000);
    f.table.perform_maintenance();

    let snapshot = f.table.buckets_snapshot();
    let mut stamps: Vec<_> = snapshot
        .values()
        .map(|b| b.last_maintenance().as_secs())
        .collect();
    stamps.sort_unstable();
    assert_eq!(stamps, vec![2_000, 3_000]);
}

#[test]
fn test_delete_node_promotes_pending() {
    let f = setup();
    let members = fill_top_bucket(&f);
    for record in &members {
        f.table.on_node_contacted(record.clone());
    }
    let candidate = record_at_distance(f.local.node_id(), 256);
    f.table.offer(candidate.clone());

    f.table.delete_node(members[1].node_id());

    assert!(!f.table.contains_node(members[1].node_id()));
    assert!(f.table.contains_node(candidate.node_id()));
    assert_eq!(f.table.stats().pending_replacements, 0);
}

// =============================================================================
// Closest-node stream
// =============================================================================

#[test]
fn test_stream_closest_nodes_is_sorted_and_complete() {
    let f = setup();
    for _ in 0..12 {
        f.table.offer(random_record());
    }
    let target = *random_record().node_id();

    let streamed: Vec<_> = f.table.stream_closest_nodes(target).collect();

    assert_eq!(streamed.len(), f.table.stats().total_nodes);
    for pair in streamed.windows(2) {
        assert!(
            xor_distance(pair[0].node_id(), &target) < xor_distance(pair[1].node_id(), &target)
        );
    }
}

#[test]
fn test_stream_closest_nodes_is_restartable() {
    let f = setup();
    for _ in 0..6 {
        f.table.offer(random_record());
    }
    let target = *random_record().node_id();

    let first: Vec<_> = f.table.stream_closest_nodes(target).take(2).collect();
    let second: Vec<_> = f.table.stream_closest_nodes(target).take(2).collect();
    assert_eq!(first, second);

    let extra = random_record();
    f.table.offer(extra.clone());
    assert!(f
        .table
        .stream_closest_nodes(target)
        .any(|r| r.node_id() == extra.node_id()));
}

#[test]
fn test_stream_closest_nodes_toward_local_id() {
    let f = setup();
    for _ in 0..5 {
        f.table.offer(random_record());
    }

    let streamed: Vec<_> = f.table.stream_closest_nodes(*f.local.node_id()).collect();

    assert_eq!(streamed.len(), f.table.stats().total_nodes);
}
