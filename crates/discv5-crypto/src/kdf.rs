//! # Session Key Agreement
//!
//! HKDF-SHA256 over the ECDH secret. The salt is the challenge data of the
//! WHOAREYOU packet that started the handshake, and the info string binds
//! both node ids in initiator/recipient order.

use crate::ecdsa::SharedSecret;
use crate::symmetric::{AesKey, AES_KEY_SIZE};
use crate::CryptoError;
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

/// Prefix of the HKDF info parameter.
pub const KEY_AGREEMENT_INFO: &[u8] = b"discovery v5 key agreement";

/// Keys produced by one handshake.
///
/// `initiator_key` encrypts traffic sent by the handshake initiator,
/// `recipient_key` encrypts traffic sent by the other side.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SessionKeys {
    /// Key used by the node that sent the HANDSHAKE packet.
    pub initiator_key: AesKey,
    /// Key used by the node that issued the WHOAREYOU challenge.
    pub recipient_key: AesKey,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKeys(..)")
    }
}

/// Derive the session keys.
///
/// # Arguments
///
/// * `secret` - ECDH(ephemeral, static) shared point
/// * `challenge_data` - `masking-iv || static-header || authdata` of the WHOAREYOU packet
/// * `initiator_id` - node id of the handshake initiator
/// * `recipient_id` - node id of the challenger
pub fn derive_session_keys(
    secret: &SharedSecret,
    challenge_data: &[u8],
    initiator_id: &[u8; 32],
    recipient_id: &[u8; 32],
) -> Result<SessionKeys, CryptoError> {
    let mut info = Vec::with_capacity(KEY_AGREEMENT_INFO.len() + 64);
    info.extend_from_slice(KEY_AGREEMENT_INFO);
    info.extend_from_slice(initiator_id);
    info.extend_from_slice(recipient_id);

    let hk = Hkdf::<Sha256>::new(Some(challenge_data), secret.as_bytes());
    let mut okm = [0u8; 2 * AES_KEY_SIZE];
    hk.expand(&info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

    let mut initiator_key = [0u8; AES_KEY_SIZE];
    let mut recipient_key = [0u8; AES_KEY_SIZE];
    initiator_key.copy_from_slice(&okm[..AES_KEY_SIZE]);
    recipient_key.copy_from_slice(&okm[AES_KEY_SIZE..]);
    okm.zeroize();

    Ok(SessionKeys {
        initiator_key,
        recipient_key,
    })
}
