//! Static packet header.

use super::reader::ByteReader;
use crate::domain::PacketError;

/// Protocol identifier at the start of every header.
pub const PROTOCOL_ID: &[u8; 6] = b"discv5";

/// Protocol version.
pub const PROTOCOL_VERSION: u16 = 0x0001;

/// Size of the AES-GCM nonce carried in the header.
pub const NONCE_SIZE: usize = 12;

/// Size of the challenge id-nonce.
pub const ID_NONCE_SIZE: usize = 16;

/// Protocol id, version, flag, nonce and authdata size.
pub const STATIC_HEADER_SIZE: usize = 6 + 2 + 1 + NONCE_SIZE + 2;

/// Offset of the authdata inside an unmasked header.
pub const AUTH_DATA_OFFSET: usize = STATIC_HEADER_SIZE;

/// Smallest valid packet: a WHOAREYOU (iv + static header + 24-byte authdata).
pub const MIN_PACKET_SIZE: usize = 16 + STATIC_HEADER_SIZE + ID_NONCE_SIZE + 8;

/// Largest datagram we send or accept.
pub const MAX_PACKET_SIZE: usize = 1280;

/// Per-packet AES-GCM nonce.
pub type Nonce = [u8; NONCE_SIZE];

/// Packet type selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketFlag {
    /// Challenge (WHOAREYOU)
    WhoAreYou = 0,
    /// Handshake message
    Handshake = 1,
    /// Ordinary message
    Message = 2,
}

impl TryFrom<u8> for PacketFlag {
    type Error = PacketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::WhoAreYou),
            1 => Ok(Self::Handshake),
            2 => Ok(Self::Message),
            other => Err(PacketError::decode(format!("unknown packet flag {other}"))),
        }
    }
}

/// Decoded static header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticHeader {
    /// Packet type
    pub flag: PacketFlag,
    /// AES-GCM nonce (echoed by WHOAREYOU)
    pub nonce: Nonce,
    /// Byte length of the authdata that follows
    pub auth_data_size: u16,
}

impl StaticHeader {
    /// Serialize to the fixed 23-byte layout.
    pub fn encode(&self) -> [u8; STATIC_HEADER_SIZE] {
        let mut out = [0u8; STATIC_HEADER_SIZE];
        out[..6].copy_from_slice(PROTOCOL_ID);
        out[6..8].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        out[8] = self.flag as u8;
        out[9..21].copy_from_slice(&self.nonce);
        out[21..23].copy_from_slice(&self.auth_data_size.to_be_bytes());
        out
    }

    /// Parse and validate protocol id, version and flag.
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        let mut reader = ByteReader::new(bytes);
        let protocol_id: [u8; 6] = reader.array("protocol id")?;
        if &protocol_id != PROTOCOL_ID {
            return Err(PacketError::decode("bad protocol id"));
        }
        let version = reader.u16("version")?;
        if version != PROTOCOL_VERSION {
            return Err(PacketError::decode(format!(
                "unsupported version {version:#06x}"
            )));
        }
        let flag = PacketFlag::try_from(reader.u8("flag")?)?;
        let nonce = reader.array("nonce")?;
        let auth_data_size = reader.u16("authdata size")?;
        Ok(Self {
            flag,
            nonce,
            auth_data_size,
        })
    }
}
