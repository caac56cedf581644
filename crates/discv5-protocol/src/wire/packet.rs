//! Header, masked and unmasked packets.

use discv5_crypto::{mask_in_place, MaskingKey, MASKING_IV_SIZE};
use rand::RngCore;

use super::auth_data::AuthData;
use super::header::{
    Nonce, PacketFlag, StaticHeader, MAX_PACKET_SIZE, MIN_PACKET_SIZE, STATIC_HEADER_SIZE,
};
use crate::domain::{NodeId, PacketError};

/// Static header plus the authdata it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    static_header: StaticHeader,
    auth_data: AuthData,
}

impl Header {
    /// Build a header; flag and authdata size are derived from `auth_data`.
    pub fn new(nonce: Nonce, auth_data: AuthData) -> Self {
        let static_header = StaticHeader {
            flag: auth_data.flag(),
            nonce,
            auth_data_size: auth_data.encode().len() as u16,
        };
        Self {
            static_header,
            auth_data,
        }
    }

    /// Pair a decoded static header with decoded authdata.
    ///
    /// Fails if the flag does not select this variant or the declared
    /// authdata size differs from the encoded length.
    pub fn from_parts(static_header: StaticHeader, auth_data: AuthData) -> Result<Self, PacketError> {
        if static_header.flag != auth_data.flag() {
            return Err(PacketError::decode(format!(
                "flag {:?} does not match {:?} authdata",
                static_header.flag,
                auth_data.flag()
            )));
        }
        let actual = auth_data.encode().len();
        if usize::from(static_header.auth_data_size) != actual {
            return Err(PacketError::decode(format!(
                "authdata-size {} but authdata is {} bytes",
                static_header.auth_data_size, actual
            )));
        }
        Ok(Self {
            static_header,
            auth_data,
        })
    }

    /// The static header.
    pub fn static_header(&self) -> &StaticHeader {
        &self.static_header
    }

    /// The authdata.
    pub fn auth_data(&self) -> &AuthData {
        &self.auth_data
    }

    /// Packet type.
    pub fn flag(&self) -> PacketFlag {
        self.static_header.flag
    }

    /// Header nonce.
    pub fn nonce(&self) -> &Nonce {
        &self.static_header.nonce
    }

    /// Unmasked `static-header || authdata`.
    pub fn encode(&self) -> Vec<u8> {
        let auth = self.auth_data.encode();
        let mut out = Vec::with_capacity(STATIC_HEADER_SIZE + auth.len());
        out.extend_from_slice(&self.static_header.encode());
        out.extend_from_slice(&auth);
        out
    }
}

/// Datagram as received: IV plus still-masked bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    masking_iv: [u8; MASKING_IV_SIZE],
    masked: Vec<u8>,
}

impl RawPacket {
    /// Split a datagram into IV and masked remainder.
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        if !(MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(&bytes.len()) {
            return Err(PacketError::decode(format!(
                "packet size {} outside [{MIN_PACKET_SIZE}, {MAX_PACKET_SIZE}]",
                bytes.len()
            )));
        }
        let mut masking_iv = [0u8; MASKING_IV_SIZE];
        masking_iv.copy_from_slice(&bytes[..MASKING_IV_SIZE]);
        Ok(Self {
            masking_iv,
            masked: bytes[MASKING_IV_SIZE..].to_vec(),
        })
    }

    /// The datagram bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MASKING_IV_SIZE + self.masked.len());
        out.extend_from_slice(&self.masking_iv);
        out.extend_from_slice(&self.masked);
        out
    }

    /// Masking IV.
    pub fn masking_iv(&self) -> &[u8; MASKING_IV_SIZE] {
        &self.masking_iv
    }

    /// Unmask the header with our own id and decode it.
    ///
    /// The static header is unmasked first to learn the authdata size, then
    /// the whole header is unmasked in one pass of the key stream.
    pub fn demask(&self, local_id: &NodeId) -> Result<Packet, PacketError> {
        let key = MaskingKey::from_node_id(local_id.as_bytes());

        let mut static_bytes = [0u8; STATIC_HEADER_SIZE];
        static_bytes.copy_from_slice(&self.masked[..STATIC_HEADER_SIZE]);
        mask_in_place(&key, &self.masking_iv, &mut static_bytes);
        let static_header = StaticHeader::decode(&static_bytes)?;

        let header_len = STATIC_HEADER_SIZE + usize::from(static_header.auth_data_size);
        if self.masked.len() < header_len {
            return Err(PacketError::decode(format!(
                "authdata-size {} exceeds packet",
                static_header.auth_data_size
            )));
        }
        let mut header_bytes = self.masked[..header_len].to_vec();
        mask_in_place(&key, &self.masking_iv, &mut header_bytes);

        let auth_data = AuthData::decode(static_header.flag, &header_bytes[STATIC_HEADER_SIZE..])?;
        let header = Header::from_parts(static_header, auth_data)?;
        let message = self.masked[header_len..].to_vec();
        if header.flag() == PacketFlag::WhoAreYou && !message.is_empty() {
            return Err(PacketError::decode("WHOAREYOU carries a message"));
        }

        Ok(Packet {
            masking_iv: self.masking_iv,
            header,
            message,
        })
    }
}

/// Unmasked packet: header in the clear, message still sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    masking_iv: [u8; MASKING_IV_SIZE],
    header: Header,
    message: Vec<u8>,
}

impl Packet {
    /// Assemble a packet from its parts.
    pub fn new(masking_iv: [u8; MASKING_IV_SIZE], header: Header, message: Vec<u8>) -> Self {
        Self {
            masking_iv,
            header,
            message,
        }
    }

    /// Fresh random masking IV.
    pub fn random_iv() -> [u8; MASKING_IV_SIZE] {
        let mut iv = [0u8; MASKING_IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);
        iv
    }

    /// Masking IV.
    pub fn masking_iv(&self) -> &[u8; MASKING_IV_SIZE] {
        &self.masking_iv
    }

    /// Decoded header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Sealed message bytes (empty for WHOAREYOU).
    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// `masking-iv || header`: the AEAD associated data of the message, and
    /// for WHOAREYOU packets the challenge data both sides sign and derive
    /// keys from.
    pub fn authenticated_data(&self) -> Vec<u8> {
        let header = self.header.encode();
        let mut out = Vec::with_capacity(MASKING_IV_SIZE + header.len());
        out.extend_from_slice(&self.masking_iv);
        out.extend_from_slice(&header);
        out
    }

    /// Mask the header for `dest_id`.
    pub fn mask(&self, dest_id: &NodeId) -> RawPacket {
        let key = MaskingKey::from_node_id(dest_id.as_bytes());
        let mut masked = self.header.encode();
        mask_in_place(&key, &self.masking_iv, &mut masked);
        masked.extend_from_slice(&self.message);
        RawPacket {
            masking_iv: self.masking_iv,
            masked,
        }
    }

    /// Datagram bytes for `dest_id`.
    pub fn encode(&self, dest_id: &NodeId) -> Vec<u8> {
        self.mask(dest_id).encode()
    }
}
