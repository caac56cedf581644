//! # Header Masking
//!
//! AES-128-CTR keyed by the first 16 bytes of the destination node id, with
//! the packet's random masking IV as the initial counter block. Applying the
//! key stream twice restores the input.

use ctr::cipher::{KeyIvInit, StreamCipher};

/// Size of the masking IV that prefixes every packet.
pub const MASKING_IV_SIZE: usize = 16;

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

/// Masking key derived from a destination node id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskingKey([u8; 16]);

impl MaskingKey {
    /// Take the first 16 bytes of the destination node id.
    pub fn from_node_id(node_id: &[u8; 32]) -> Self {
        let mut key = [0u8; 16];
        key.copy_from_slice(&node_id[..16]);
        Self(key)
    }

    /// Get raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

/// Mask (or unmask) `data` in place.
pub fn mask_in_place(key: &MaskingKey, iv: &[u8; MASKING_IV_SIZE], data: &mut [u8]) {
    let mut cipher = Aes128Ctr::new(key.as_bytes().into(), iv.into());
    cipher.apply_keystream(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_twice_restores_input() {
        let key = MaskingKey::from_node_id(&[9u8; 32]);
        let iv = [3u8; MASKING_IV_SIZE];
        let original = b"discv5 static header bytes".to_vec();

        let mut data = original.clone();
        mask_in_place(&key, &iv, &mut data);
        assert_ne!(data, original);

        mask_in_place(&key, &iv, &mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn test_split_masking_matches_single_pass() {
        // The header and authdata are masked by one continuous key stream.
        let key = MaskingKey::from_node_id(&[5u8; 32]);
        let iv = [1u8; MASKING_IV_SIZE];
        let mut whole = [0u8; 40];
        mask_in_place(&key, &iv, &mut whole);

        let mut cipher = Aes128Ctr::new(key.as_bytes().into(), (&iv).into());
        let mut parts = [0u8; 40];
        let (head, tail) = parts.split_at_mut(23);
        cipher.apply_keystream(head);
        cipher.apply_keystream(tail);

        assert_eq!(whole, parts);
    }
}
