//! # Symmetric Encryption
//!
//! AES-128-GCM for message payloads. The nonce is the 12-byte packet nonce
//! and the associated data is `masking-iv || header`, so a ciphertext is
//! only valid inside the packet it was produced for.

use crate::CryptoError;
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes128Gcm, Nonce,
};

/// AES-128 key size.
pub const AES_KEY_SIZE: usize = 16;

/// GCM nonce size.
pub const AES_NONCE_SIZE: usize = 12;

/// GCM authentication tag size.
pub const TAG_SIZE: usize = 16;

/// Session key (128-bit).
pub type AesKey = [u8; AES_KEY_SIZE];

/// Packet nonce (96-bit).
pub type AesNonce = [u8; AES_NONCE_SIZE];

/// Encrypt plaintext with AES-128-GCM.
///
/// # Errors
///
/// Returns `CryptoError::EncryptionFailed` if encryption fails.
pub fn encrypt(
    key: &AesKey,
    nonce: &AesNonce,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes128Gcm::new(key.into());
    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Decrypt ciphertext with AES-128-GCM.
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` on a wrong key, truncated input or
/// tag mismatch.
pub fn decrypt(
    key: &AesKey,
    nonce: &AesNonce,
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::DecryptionFailed(format!(
            "ciphertext shorter than tag: {} bytes",
            ciphertext.len()
        )));
    }
    let cipher = Aes128Gcm::new(key.into());
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = [0x42u8; AES_KEY_SIZE];
        let nonce = [0x01u8; AES_NONCE_SIZE];

        let ciphertext = encrypt(&key, &nonce, b"ping", b"header").unwrap();
        assert_eq!(ciphertext.len(), 4 + TAG_SIZE);

        let plaintext = decrypt(&key, &nonce, &ciphertext, b"header").unwrap();
        assert_eq!(plaintext, b"ping");
    }

    #[test]
    fn test_wrong_key_fails() {
        let nonce = [0x01u8; AES_NONCE_SIZE];
        let ciphertext = encrypt(&[1u8; 16], &nonce, b"secret", b"").unwrap();

        assert!(decrypt(&[2u8; 16], &nonce, &ciphertext, b"").is_err());
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = [7u8; 16];
        let nonce = [0x01u8; AES_NONCE_SIZE];
        let ciphertext = encrypt(&key, &nonce, b"secret", b"header-a").unwrap();

        assert!(decrypt(&key, &nonce, &ciphertext, b"header-b").is_err());
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let result = decrypt(&[7u8; 16], &[0u8; 12], &[0u8; 5], b"");
        assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
    }
}
