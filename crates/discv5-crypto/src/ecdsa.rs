//! # ECDSA Signatures and ECDH (secp256k1)
//!
//! Node identity keys and the ephemeral keys used during the handshake.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Messages are hashed with SHA-256 before signing
//! - ECDH output is the compressed shared point (33 bytes), as the key
//!   agreement expects

use crate::hashing::keccak256;
use crate::CryptoError;
use k256::{
    ecdsa::{
        signature::{Signer, Verifier},
        Signature, SigningKey, VerifyingKey,
    },
    elliptic_curve::sec1::ToEncodedPoint,
    PublicKey,
};
use zeroize::Zeroize;

/// Size of a compressed secp256k1 public key.
pub const COMPRESSED_PUBKEY_SIZE: usize = 33;

/// Size of a compact (r || s) signature.
pub const SIGNATURE_SIZE: usize = 64;

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Secp256k1PublicKey([u8; COMPRESSED_PUBKEY_SIZE]);

impl Secp256k1PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; COMPRESSED_PUBKEY_SIZE]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Create from a slice, checking length and curve membership.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; COMPRESSED_PUBKEY_SIZE] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: COMPRESSED_PUBKEY_SIZE,
                actual: bytes.len(),
            })?;
        Self::from_bytes(array)
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; COMPRESSED_PUBKEY_SIZE] {
        &self.0
    }

    /// Verify a signature over `message` (SHA-256 prehash).
    pub fn verify(
        &self,
        message: &[u8],
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = Signature::from_slice(&signature.0)
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Derive the 32-byte node id: Keccak-256 over the uncompressed `x || y`.
    pub fn to_node_id(&self) -> [u8; 32] {
        match PublicKey::from_sec1_bytes(&self.0) {
            Ok(key) => {
                let uncompressed = key.to_encoded_point(false);
                // Skip the 0x04 SEC1 tag.
                keccak256(&uncompressed.as_bytes()[1..])
            }
            // Unreachable for keys built through `from_bytes`.
            Err(_) => keccak256(&self.0),
        }
    }
}

/// ECDSA signature (64 bytes, r||s format).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1Signature([u8; SIGNATURE_SIZE]);

impl Secp256k1Signature {
    /// Create from bytes (64 bytes).
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice of exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; SIGNATURE_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Ok(Self(array))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }
}

/// Result of an ECDH exchange: the compressed shared point.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SharedSecret([u8; COMPRESSED_PUBKEY_SIZE]);

impl SharedSecret {
    /// Get the compressed shared point.
    pub fn as_bytes(&self) -> &[u8; COMPRESSED_PUBKEY_SIZE] {
        &self.0
    }
}

/// secp256k1 keypair, used both for static node identity and for the
/// per-handshake ephemeral key.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        let mut bytes = [0u8; COMPRESSED_PUBKEY_SIZE];
        bytes.copy_from_slice(point.as_bytes());
        Secp256k1PublicKey(bytes)
    }

    /// Sign a message (deterministic RFC 6979, SHA-256 prehash).
    pub fn sign(&self, message: &[u8]) -> Secp256k1Signature {
        let sig: Signature = self.signing_key.sign(message);
        let bytes: [u8; SIGNATURE_SIZE] = sig.to_bytes().into();
        Secp256k1Signature(bytes)
    }

    /// Diffie-Hellman with a remote public key.
    pub fn ecdh(&self, remote: &Secp256k1PublicKey) -> Result<SharedSecret, CryptoError> {
        let remote =
            PublicKey::from_sec1_bytes(remote.as_bytes()).map_err(|_| CryptoError::InvalidPublicKey)?;
        let scalar = self.signing_key.as_nonzero_scalar();
        let shared = (remote.to_projective() * **scalar).to_affine();
        let encoded = shared.to_encoded_point(true);

        let mut bytes = [0u8; COMPRESSED_PUBKEY_SIZE];
        bytes.copy_from_slice(encoded.as_bytes());
        Ok(SharedSecret(bytes))
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl std::fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl Drop for Secp256k1KeyPair {
    fn drop(&mut self) {
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Secp256k1KeyPair::generate();
        let message = b"discovery v5 identity proof";

        let signature = keypair.sign(message);
        let result = keypair.public_key().verify(message, &signature);

        assert!(result.is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = Secp256k1KeyPair::generate();

        let signature = keypair.sign(b"message1");
        let result = keypair.public_key().verify(b"message2", &signature);

        assert_eq!(result, Err(CryptoError::SignatureVerificationFailed));
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Secp256k1KeyPair::from_bytes([0xABu8; 32]).unwrap();
        let message = b"deterministic test";

        assert_eq!(keypair.sign(message), keypair.sign(message));
    }

    #[test]
    fn test_ecdh_is_symmetric() {
        let alice = Secp256k1KeyPair::generate();
        let bob = Secp256k1KeyPair::generate();

        let ab = alice.ecdh(&bob.public_key()).unwrap();
        let ba = bob.ecdh(&alice.public_key()).unwrap();

        assert_eq!(ab.as_bytes(), ba.as_bytes());
        assert!(ab.as_bytes()[0] == 0x02 || ab.as_bytes()[0] == 0x03);
    }

    #[test]
    fn test_node_id_derivation_is_stable() {
        let keypair = Secp256k1KeyPair::from_bytes([0x11u8; 32]).unwrap();
        let pubkey = keypair.public_key();

        assert_eq!(pubkey.to_node_id(), pubkey.to_node_id());
        assert_ne!(
            pubkey.to_node_id(),
            Secp256k1KeyPair::generate().public_key().to_node_id()
        );
    }

    #[test]
    fn test_public_key_from_slice_rejects_bad_length() {
        let result = Secp256k1PublicKey::from_slice(&[0x02; 20]);
        assert_eq!(
            result,
            Err(CryptoError::InvalidKeyLength {
                expected: 33,
                actual: 20
            })
        );
    }

    #[test]
    fn test_roundtrip_bytes() {
        let original = Secp256k1KeyPair::generate();
        let restored = Secp256k1KeyPair::from_bytes(original.to_bytes()).unwrap();

        assert_eq!(original.public_key(), restored.public_key());
    }
}
