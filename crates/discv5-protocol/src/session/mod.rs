//! # Sessions
//!
//! Per-peer handshake state and the keys it produces.
//!
//! ```text
//!            outbound msg                     WHOAREYOU (our nonce)
//! Unestablished ──────────► RandomPacketSent ─────────────────────► Established
//!       │                                                               ▲
//!       │ undecryptable MESSAGE                                          │
//!       ▼                                 HANDSHAKE (valid signature)    │
//! ChallengeSent ─────────────────────────────────────────────────────────┘
//! ```
//!
//! A decrypt failure while established issues a fresh challenge but keeps
//! the old keys until a new handshake replaces them.

mod crypto;
mod handshake;
mod manager;
mod node_session;

pub use crypto::{
    complete_handshake, decrypt_message, id_signature_input, initiate_handshake, seal_packet,
    HandshakeInitiation, ID_SIGNATURE_TEXT,
};
pub use handshake::MessageOutcome;
pub use manager::SessionManager;
pub use node_session::{Challenge, NodeSession, SessionInfo, SessionState};
