//! Tests for the wire codec.

use discv5_crypto::{mask_in_place, MaskingKey, Secp256k1KeyPair};

use super::*;
use crate::domain::{NodeId, PacketError};
use crate::test_utils::random_record;

fn dest() -> NodeId {
    NodeId::new([0x5A; 32])
}

fn message_packet(body_len: usize) -> Packet {
    let header = Header::new(
        [7u8; NONCE_SIZE],
        AuthData::Message(OrdinaryAuthData {
            src_id: NodeId::new([0x11; 32]),
        }),
    );
    Packet::new(Packet::random_iv(), header, vec![0xEE; body_len])
}

fn whoareyou_packet() -> Packet {
    let header = Header::new(
        [3u8; NONCE_SIZE],
        AuthData::WhoAreYou(ChallengeAuthData {
            id_nonce: [9u8; ID_NONCE_SIZE],
            enr_seq: 4,
        }),
    );
    Packet::new(Packet::random_iv(), header, Vec::new())
}

fn handshake_packet(with_record: bool) -> Packet {
    let keypair = Secp256k1KeyPair::generate();
    let header = Header::new(
        [1u8; NONCE_SIZE],
        AuthData::Handshake(HandshakeAuthData {
            src_id: NodeId::new(keypair.public_key().to_node_id()),
            id_signature: keypair.sign(b"proof"),
            ephemeral_pubkey: Secp256k1KeyPair::generate().public_key(),
            record: with_record.then(random_record),
        }),
    );
    Packet::new(Packet::random_iv(), header, vec![0xAB; 40])
}

// =============================================================================
// Static header
// =============================================================================

#[test]
fn test_static_header_layout() {
    let header = StaticHeader {
        flag: PacketFlag::Handshake,
        nonce: [0xCC; NONCE_SIZE],
        auth_data_size: 0x0102,
    };

    let bytes = header.encode();

    assert_eq!(&bytes[..6], PROTOCOL_ID);
    assert_eq!(&bytes[6..8], &[0x00, 0x01]);
    assert_eq!(bytes[8], 1);
    assert_eq!(&bytes[21..23], &[0x01, 0x02]);
    assert_eq!(StaticHeader::decode(&bytes).unwrap(), header);
}

#[test]
fn test_static_header_rejects_bad_protocol_id() {
    let mut bytes = StaticHeader {
        flag: PacketFlag::Message,
        nonce: [0; NONCE_SIZE],
        auth_data_size: 32,
    }
    .encode();
    bytes[0] = b'x';

    assert!(matches!(
        StaticHeader::decode(&bytes),
        Err(PacketError::Decode(_))
    ));
}

#[test]
fn test_static_header_rejects_unknown_flag() {
    let mut bytes = StaticHeader {
        flag: PacketFlag::Message,
        nonce: [0; NONCE_SIZE],
        auth_data_size: 32,
    }
    .encode();
    bytes[8] = 3;

    assert!(StaticHeader::decode(&bytes).is_err());
}

// =============================================================================
// Size bounds
// =============================================================================

#[test]
fn test_decode_rejects_out_of_range_sizes() {
    for len in [0, 1, MIN_PACKET_SIZE - 1, MAX_PACKET_SIZE + 1, 4096] {
        assert!(
            matches!(RawPacket::decode(&vec![0u8; len]), Err(PacketError::Decode(_))),
            "size {len} should be rejected"
        );
    }
}

#[test]
fn test_decode_accepts_boundary_sizes() {
    assert!(RawPacket::decode(&[0u8; MIN_PACKET_SIZE]).is_ok());
    assert!(RawPacket::decode(&[0u8; MAX_PACKET_SIZE]).is_ok());
}

#[test]
fn test_whoareyou_is_minimum_size() {
    assert_eq!(whoareyou_packet().encode(&dest()).len(), MIN_PACKET_SIZE);
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn test_raw_packet_roundtrips_bytes() {
    for body_len in [16usize, 100, MAX_PACKET_SIZE - 16 - STATIC_HEADER_SIZE - 32] {
        let bytes = message_packet(body_len).encode(&dest());

        let raw = RawPacket::decode(&bytes).unwrap();

        assert_eq!(raw.encode(), bytes);
    }
}

#[test]
fn test_demask_then_mask_restores_bytes() {
    for packet in [message_packet(48), whoareyou_packet(), handshake_packet(true)] {
        let bytes = packet.encode(&dest());

        let demasked = RawPacket::decode(&bytes).unwrap().demask(&dest()).unwrap();

        assert_eq!(demasked, packet);
        assert_eq!(demasked.mask(&dest()).encode(), bytes);
    }
}

#[test]
fn test_handshake_without_record() {
    let packet = handshake_packet(false);
    let bytes = packet.encode(&dest());

    let demasked = RawPacket::decode(&bytes).unwrap().demask(&dest()).unwrap();

    match demasked.header().auth_data() {
        AuthData::Handshake(auth) => assert!(auth.record.is_none()),
        other => panic!("unexpected authdata {other:?}"),
    }
}

#[test]
fn test_header_is_masked() {
    let bytes = message_packet(16).encode(&dest());
    assert!(!bytes.windows(PROTOCOL_ID.len()).any(|w| w == PROTOCOL_ID));
}

#[test]
fn test_demask_with_wrong_id_fails() {
    let bytes = message_packet(16).encode(&dest());

    let result = RawPacket::decode(&bytes)
        .unwrap()
        .demask(&NodeId::new([0x01; 32]));

    assert!(matches!(result, Err(PacketError::Decode(_))));
}

#[test]
fn test_authenticated_data_is_iv_and_header() {
    let packet = whoareyou_packet();
    let ad = packet.authenticated_data();

    assert_eq!(&ad[..16], packet.masking_iv());
    assert_eq!(ad.len(), MIN_PACKET_SIZE);
}

// =============================================================================
// Header invariants
// =============================================================================

#[test]
fn test_from_parts_rejects_size_mismatch() {
    let auth = AuthData::Message(OrdinaryAuthData {
        src_id: NodeId::zero(),
    });
    let static_header = StaticHeader {
        flag: PacketFlag::Message,
        nonce: [0; NONCE_SIZE],
        auth_data_size: 31,
    };

    assert!(Header::from_parts(static_header, auth).is_err());
}

#[test]
fn test_from_parts_rejects_flag_mismatch() {
    let auth = AuthData::Message(OrdinaryAuthData {
        src_id: NodeId::zero(),
    });
    let static_header = StaticHeader {
        flag: PacketFlag::Handshake,
        nonce: [0; NONCE_SIZE],
        auth_data_size: 32,
    };

    assert!(Header::from_parts(static_header, auth).is_err());
}

#[test]
fn test_demask_rejects_authdata_size_past_end() {
    let iv = [4u8; 16];
    let mut header = StaticHeader {
        flag: PacketFlag::Message,
        nonce: [0; NONCE_SIZE],
        auth_data_size: 500,
    }
    .encode()
    .to_vec();
    header.extend_from_slice(&[0u8; 32]);
    mask_in_place(&MaskingKey::from_node_id(dest().as_bytes()), &iv, &mut header);
    let mut bytes = iv.to_vec();
    bytes.extend_from_slice(&header);

    let result = RawPacket::decode(&bytes).unwrap().demask(&dest());

    assert!(matches!(result, Err(PacketError::Decode(_))));
}

#[test]
fn test_truncated_handshake_authdata_rejected() {
    let mut bytes = vec![0u8; 32];
    bytes.push(64);
    bytes.push(33);
    bytes.extend_from_slice(&[0u8; 10]);

    assert!(AuthData::decode(PacketFlag::Handshake, &bytes).is_err());
}
