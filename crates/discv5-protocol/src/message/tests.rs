//! Tests for discovery messages.

use super::*;
use crate::test_utils::random_record;

#[test]
fn test_ping_layout() {
    let ping = Message::Ping {
        request_id: 0x0102,
        enr_seq: 3,
    };

    let bytes = ping.encode();

    assert_eq!(bytes.len(), 17);
    assert_eq!(bytes[0], MessageType::Ping as u8);
    assert_eq!(Message::decode(&bytes).unwrap(), ping);
}

#[test]
fn test_pong_carries_observed_address() {
    for observed in ["203.0.113.7:30303", "[2001:db8::1]:9000"] {
        let pong = Message::Pong {
            request_id: 9,
            enr_seq: 1,
            observed: observed.parse().unwrap(),
        };

        assert_eq!(Message::decode(&pong.encode()).unwrap(), pong);
    }
}

#[test]
fn test_findnode_distances() {
    let find = Message::FindNode {
        request_id: 77,
        distances: vec![0, 255, 256],
    };

    assert_eq!(Message::decode(&find.encode()).unwrap(), find);
}

#[test]
fn test_nodes_records_verified() {
    let nodes = Message::Nodes {
        request_id: 5,
        total: 1,
        records: vec![random_record(), random_record()],
    };
    let mut bytes = nodes.encode();
    assert_eq!(Message::decode(&bytes).unwrap(), nodes);

    // Corrupt a signature byte of the last record.
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert!(Message::decode(&bytes).is_err());
}

#[test]
fn test_unknown_type_rejected() {
    let mut bytes = Message::Ping {
        request_id: 1,
        enr_seq: 1,
    }
    .encode();
    bytes[0] = 0x7F;

    assert!(matches!(
        Message::decode(&bytes),
        Err(DiscoveryError::Message(_))
    ));
}

#[test]
fn test_trailing_bytes_rejected() {
    let mut bytes = Message::Ping {
        request_id: 1,
        enr_seq: 1,
    }
    .encode();
    bytes.push(0);

    assert!(Message::decode(&bytes).is_err());
}

#[test]
fn test_nodes_responses_split() {
    let records: Vec<_> = (0..5).map(|_| random_record()).collect();

    let responses = Message::nodes_responses(42, records, 2);

    assert_eq!(responses.len(), 3);
    for response in &responses {
        match response {
            Message::Nodes {
                request_id, total, ..
            } => {
                assert_eq!(*request_id, 42);
                assert_eq!(*total, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[test]
fn test_empty_nodes_response_still_sent() {
    let responses = Message::nodes_responses(1, Vec::new(), 4);

    assert_eq!(
        responses,
        vec![Message::Nodes {
            request_id: 1,
            total: 1,
            records: Vec::new(),
        }]
    );
}

#[test]
fn test_findnode_encoding_caps_distances() {
    let distances: Vec<u16> = (0..300).collect();
    let find = Message::FindNode {
        request_id: 5,
        distances: distances.clone(),
    };

    match Message::decode(&find.encode()).unwrap() {
        Message::FindNode { distances: decoded, .. } => {
            assert_eq!(decoded, distances[..MAX_FIND_NODE_DISTANCES].to_vec())
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_nodes_responses_capped_at_message_limit() {
    let record = random_record();
    let records = vec![record; 300];

    let messages = Message::nodes_responses(8, records, 1);

    assert_eq!(messages.len(), MAX_NODES_MESSAGES);
    for message in &messages {
        match message {
            Message::Nodes { total, records, .. } => {
                assert_eq!(usize::from(*total), MAX_NODES_MESSAGES);
                assert_eq!(records.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
