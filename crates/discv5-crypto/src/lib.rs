//! # discv5 Crypto - Session and Identity Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `ecdsa` | secp256k1 | Node identity signing, ephemeral ECDH |
//! | `kdf` | HKDF-SHA256 | Session key agreement |
//! | `symmetric` | AES-128-GCM | Message payload encryption |
//! | `masking` | AES-128-CTR | Packet header masking |
//! | `hashing` | Keccak-256, SHA-256 | Node id derivation |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, low-S normalization
//! - **AES-GCM**: 96-bit nonces supplied by the session layer, never reused per key
//! - **AES-CTR masking**: not authenticated; it only hides packet type from observers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod kdf;
pub mod masking;
pub mod symmetric;

// Re-exports
pub use ecdsa::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature, SharedSecret};
pub use errors::CryptoError;
pub use hashing::{keccak256, sha256};
pub use kdf::{derive_session_keys, SessionKeys, KEY_AGREEMENT_INFO};
pub use masking::{mask_in_place, MaskingKey, MASKING_IV_SIZE};
pub use symmetric::{decrypt, encrypt, AesKey, AesNonce, AES_KEY_SIZE, AES_NONCE_SIZE, TAG_SIZE};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
