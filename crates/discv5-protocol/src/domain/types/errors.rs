//! Domain errors for the discovery protocol.

use discv5_crypto::CryptoError;
use thiserror::Error;

/// Packet-level failure. Always recoverable: the packet is dropped and
/// counted as bad, the session and the process carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// Malformed structure: wrong size, bad protocol id, length mismatch.
    #[error("packet decode failed: {0}")]
    Decode(String),

    /// Cipher or authentication-tag failure.
    #[error("packet decrypt failed: {0}")]
    Decrypt(String),
}

impl PacketError {
    /// Shorthand for a decode failure.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode(reason.into())
    }
}

/// Top-level discovery error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// Wire-level decode or decrypt failure.
    #[error(transparent)]
    Packet(#[from] PacketError),

    /// Construction-time precondition violated.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// WHOAREYOU whose nonce matches nothing we sent.
    #[error("unexpected challenge: no outbound packet with this nonce")]
    UnexpectedChallenge,

    /// Handshake could not be built or verified.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Cryptographic primitive failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// No session exists for the peer.
    #[error("no session for node {0}")]
    UnknownSession(String),

    /// Malformed discovery message or node record.
    #[error("invalid message: {0}")]
    Message(String),

    /// Request did not receive a response in time.
    #[error("request timed out")]
    Timeout,

    /// Outbound send failed or was refused.
    #[error("transport error: {0}")]
    Transport(String),
}

impl DiscoveryError {
    /// Whether this error means the peer sent us something broken, as
    /// opposed to a local or transport failure.
    pub fn is_bad_packet(&self) -> bool {
        matches!(
            self,
            Self::Packet(_)
                | Self::UnexpectedChallenge
                | Self::Handshake(_)
                | Self::UnknownSession(_)
                | Self::Message(_)
                | Self::Crypto(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_error_converts() {
        let err: DiscoveryError = PacketError::decode("too short").into();
        assert_eq!(err.to_string(), "packet decode failed: too short");
        assert!(err.is_bad_packet());
    }

    #[test]
    fn test_local_failures_are_not_bad_packets() {
        assert!(!DiscoveryError::Timeout.is_bad_packet());
        assert!(!DiscoveryError::Transport("closed".into()).is_bad_packet());
        assert!(!DiscoveryError::InvalidArgument("budget".into()).is_bad_packet());
    }
}
