//! Flag-specific authenticated data.

use discv5_crypto::{Secp256k1PublicKey, Secp256k1Signature};

use super::header::{PacketFlag, ID_NONCE_SIZE};
use super::reader::ByteReader;
use crate::domain::{NodeId, NodeRecord, PacketError};

/// WHOAREYOU authdata: a fresh id-nonce and the record seq we know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeAuthData {
    /// Random nonce the responder must sign over
    pub id_nonce: [u8; ID_NONCE_SIZE],
    /// Sequence of the responder's record we hold (0 if none)
    pub enr_seq: u64,
}

/// Handshake authdata: identity proof plus ephemeral key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeAuthData {
    /// Initiator node id
    pub src_id: NodeId,
    /// Signature over the challenge data, ephemeral key and recipient id
    pub id_signature: Secp256k1Signature,
    /// Initiator's ephemeral public key
    pub ephemeral_pubkey: Secp256k1PublicKey,
    /// Initiator's record, attached when the challenger's copy is stale
    pub record: Option<NodeRecord>,
}

/// Ordinary message authdata: the sender id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdinaryAuthData {
    /// Sender node id
    pub src_id: NodeId,
}

/// Authdata of one packet; the variant always matches the header flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthData {
    /// WHOAREYOU
    WhoAreYou(ChallengeAuthData),
    /// Handshake
    Handshake(HandshakeAuthData),
    /// Ordinary message
    Message(OrdinaryAuthData),
}

impl AuthData {
    /// Header flag for this variant.
    pub fn flag(&self) -> PacketFlag {
        match self {
            Self::WhoAreYou(_) => PacketFlag::WhoAreYou,
            Self::Handshake(_) => PacketFlag::Handshake,
            Self::Message(_) => PacketFlag::Message,
        }
    }

    /// Sender id, absent for WHOAREYOU.
    pub fn src_id(&self) -> Option<&NodeId> {
        match self {
            Self::WhoAreYou(_) => None,
            Self::Handshake(auth) => Some(&auth.src_id),
            Self::Message(auth) => Some(&auth.src_id),
        }
    }

    /// Serialize.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::WhoAreYou(auth) => {
                let mut out = Vec::with_capacity(ID_NONCE_SIZE + 8);
                out.extend_from_slice(&auth.id_nonce);
                out.extend_from_slice(&auth.enr_seq.to_be_bytes());
                out
            }
            Self::Handshake(auth) => {
                let signature = auth.id_signature.as_bytes();
                let pubkey = auth.ephemeral_pubkey.as_bytes();
                let mut out = Vec::with_capacity(34 + signature.len() + pubkey.len());
                out.extend_from_slice(auth.src_id.as_bytes());
                out.push(signature.len() as u8);
                out.push(pubkey.len() as u8);
                out.extend_from_slice(signature);
                out.extend_from_slice(pubkey);
                if let Some(record) = &auth.record {
                    out.extend_from_slice(&record.encode());
                }
                out
            }
            Self::Message(auth) => auth.src_id.as_bytes().to_vec(),
        }
    }

    /// Decode the variant selected by `flag`.
    pub fn decode(flag: PacketFlag, bytes: &[u8]) -> Result<Self, PacketError> {
        match flag {
            PacketFlag::WhoAreYou => decode_challenge(bytes).map(Self::WhoAreYou),
            PacketFlag::Handshake => decode_handshake(bytes).map(Self::Handshake),
            PacketFlag::Message => decode_ordinary(bytes).map(Self::Message),
        }
    }
}

fn decode_challenge(bytes: &[u8]) -> Result<ChallengeAuthData, PacketError> {
    let mut reader = ByteReader::new(bytes);
    let id_nonce = reader.array("id-nonce")?;
    let enr_seq = reader.u64("enr-seq")?;
    expect_consumed(&reader, "WHOAREYOU")?;
    Ok(ChallengeAuthData { id_nonce, enr_seq })
}

fn decode_handshake(bytes: &[u8]) -> Result<HandshakeAuthData, PacketError> {
    let mut reader = ByteReader::new(bytes);
    let src_id = NodeId::new(reader.array("src-id")?);
    let sig_size = usize::from(reader.u8("sig-size")?);
    let key_size = usize::from(reader.u8("eph-key-size")?);
    let id_signature = Secp256k1Signature::from_slice(reader.take(sig_size, "id-signature")?)
        .map_err(|e| PacketError::decode(format!("id-signature: {e}")))?;
    let ephemeral_pubkey = Secp256k1PublicKey::from_slice(reader.take(key_size, "eph-pubkey")?)
        .map_err(|e| PacketError::decode(format!("eph-pubkey: {e}")))?;
    let record = if reader.is_empty() {
        None
    } else {
        let record = NodeRecord::decode(reader.rest())
            .map_err(|e| PacketError::decode(format!("handshake record: {e}")))?;
        Some(record)
    };
    Ok(HandshakeAuthData {
        src_id,
        id_signature,
        ephemeral_pubkey,
        record,
    })
}

fn decode_ordinary(bytes: &[u8]) -> Result<OrdinaryAuthData, PacketError> {
    let mut reader = ByteReader::new(bytes);
    let src_id = NodeId::new(reader.array("src-id")?);
    expect_consumed(&reader, "message")?;
    Ok(OrdinaryAuthData { src_id })
}

fn expect_consumed(reader: &ByteReader<'_>, kind: &str) -> Result<(), PacketError> {
    if reader.is_empty() {
        Ok(())
    } else {
        Err(PacketError::decode(format!(
            "{} trailing bytes in {kind} authdata",
            reader.remaining()
        )))
    }
}
