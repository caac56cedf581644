//! Tests for domain services.

use super::*;
use crate::domain::NodeId;
use crate::test_utils::{node_id_at_distance, random_record};

fn make_node_id(first_byte: u8) -> NodeId {
    let mut bytes = [0u8; 32];
    bytes[0] = first_byte;
    NodeId::new(bytes)
}

// =============================================================================
// Log distance
// =============================================================================

#[test]
fn test_log_distance_to_self_is_zero() {
    let a = make_node_id(0b1010_1010);
    assert_eq!(log_distance(&a, &a), 0);
}

#[test]
fn test_log_distance_is_symmetric() {
    let a = make_node_id(0b1010_0000);
    let b = make_node_id(0b0101_0000);

    assert_eq!(log_distance(&a, &b), log_distance(&b, &a));
}

#[test]
fn test_log_distance_top_bit_is_256() {
    let a = make_node_id(0b1000_0000);
    let b = make_node_id(0b0000_0000);

    assert_eq!(log_distance(&a, &b), 256);
}

#[test]
fn test_log_distance_lowest_bit_is_one() {
    let mut bytes = [0u8; 32];
    bytes[31] = 1;

    assert_eq!(log_distance(&NodeId::zero(), &NodeId::new(bytes)), 1);
}

#[test]
fn test_log_distance_matches_xor_log2() {
    let a = make_node_id(0x3C);
    let b = make_node_id(0x05);

    assert_eq!(log_distance(&a, &b), xor_distance(&a, &b).log2());
}

#[test]
fn test_node_id_at_distance_helper() {
    let local = NodeId::new([0x42; 32]);
    for distance in [1u16, 8, 9, 128, 255, 256] {
        let id = node_id_at_distance(&local, distance, 0);
        assert_eq!(log_distance(&local, &id), distance);
    }
}

// =============================================================================
// Sorting
// =============================================================================

#[test]
fn test_sort_records_closest_first() {
    let target = NodeId::zero();
    let mut records: Vec<_> = (0..8).map(|_| random_record()).collect();

    sort_records_by_distance(&mut records, &target);

    for pair in records.windows(2) {
        assert!(
            xor_distance(pair[0].node_id(), &target) <= xor_distance(pair[1].node_id(), &target)
        );
    }
}

#[test]
fn test_find_k_closest_truncates() {
    let records: Vec<_> = (0..5).map(|_| random_record()).collect();
    let target = *records[2].node_id();

    let closest = find_k_closest(&records, &target, 2);

    assert_eq!(closest.len(), 2);
    assert_eq!(closest[0].node_id(), &target);
}
