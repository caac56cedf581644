//! Tests for node records.

use std::net::{Ipv6Addr, SocketAddr};

use discv5_crypto::Secp256k1KeyPair;

use super::*;
use crate::domain::DiscoveryError;

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, 1], port))
}

#[test]
fn test_record_roundtrip_verifies() {
    let keypair = Secp256k1KeyPair::generate();
    let record = NodeRecord::signed(&keypair, 7, addr(9000), Some(30303));

    let decoded = NodeRecord::decode(&record.encode()).unwrap();

    assert_eq!(decoded, record);
    assert_eq!(decoded.seq(), 7);
    assert_eq!(decoded.udp_socket_addr(), addr(9000));
    assert_eq!(decoded.tcp_port(), Some(30303));
}

#[test]
fn test_record_ipv6_fits_max_size() {
    let keypair = Secp256k1KeyPair::generate();
    let v6 = SocketAddr::new(Ipv6Addr::LOCALHOST.into(), 9000);
    let record = NodeRecord::signed(&keypair, 1, v6, None);

    let encoded = record.encode();

    assert_eq!(encoded.len(), MAX_RECORD_SIZE);
    assert_eq!(NodeRecord::decode(&encoded).unwrap().tcp_port(), None);
}

#[test]
fn test_node_id_matches_public_key() {
    let keypair = Secp256k1KeyPair::generate();
    let record = NodeRecord::signed(&keypair, 1, addr(1), None);

    assert_eq!(record.node_id().0, keypair.public_key().to_node_id());
}

#[test]
fn test_tampered_record_rejected() {
    let keypair = Secp256k1KeyPair::generate();
    let mut encoded = NodeRecord::signed(&keypair, 1, addr(9000), None).encode();
    // Flip a bit in the UDP port.
    encoded[8 + 33 + 1 + 4] ^= 0x01;

    assert!(matches!(
        NodeRecord::decode(&encoded),
        Err(DiscoveryError::Crypto(_))
    ));
}

#[test]
fn test_truncated_record_rejected() {
    let keypair = Secp256k1KeyPair::generate();
    let encoded = NodeRecord::signed(&keypair, 1, addr(9000), None).encode();

    assert!(matches!(
        NodeRecord::decode(&encoded[..encoded.len() - 1]),
        Err(DiscoveryError::Message(_))
    ));
}

#[test]
fn test_local_node_update_bumps_seq() {
    let local = LocalNode::new(Secp256k1KeyPair::generate(), addr(9000), None);
    assert_eq!(local.seq(), 1);

    let same = local.update_endpoint(addr(9000));
    assert_eq!(same.seq(), 1);

    let moved = local.update_endpoint(addr(9001));
    assert_eq!(moved.seq(), 2);
    assert_eq!(local.record().udp_socket_addr(), addr(9001));
    assert_eq!(local.record().node_id(), local.node_id());
    assert!(NodeRecord::decode(&moved.encode()).is_ok());
}
