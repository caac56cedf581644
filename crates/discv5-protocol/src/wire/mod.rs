//! # Wire Codec
//!
//! Packet framing for discv5:
//!
//! ```text
//! packet        = masking-iv || masked-header || message
//! masked-header = aes128ctr(key = dest-id[..16], iv = masking-iv, header)
//! header        = static-header || authdata
//! static-header = "discv5" || version(2) || flag(1) || nonce(12) || authdata-size(2)
//! ```
//!
//! The header flag selects exactly one [`AuthData`] variant. Masking hides
//! the packet type from passive observers; the message itself is sealed
//! separately with the session keys (see [`crate::session`]).

mod auth_data;
mod header;
mod packet;
pub(crate) mod reader;

pub use auth_data::{AuthData, ChallengeAuthData, HandshakeAuthData, OrdinaryAuthData};
pub use header::{
    Nonce, PacketFlag, StaticHeader, AUTH_DATA_OFFSET, ID_NONCE_SIZE, MAX_PACKET_SIZE,
    MIN_PACKET_SIZE, NONCE_SIZE, PROTOCOL_ID, PROTOCOL_VERSION, STATIC_HEADER_SIZE,
};
pub use packet::{Header, Packet, RawPacket};
pub use reader::Truncated;

#[cfg(test)]
mod tests;
