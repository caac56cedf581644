//! Session key agreement and message sealing.

use discv5_crypto::{
    decrypt, derive_session_keys, encrypt, AesKey, Secp256k1KeyPair, Secp256k1PublicKey,
    Secp256k1Signature, SessionKeys,
};

use crate::domain::{DiscoveryError, LocalNode, NodeId, NodeRecord, PacketError};
use crate::wire::{HandshakeAuthData, Header, Packet};

/// Domain separator for the id-nonce signature.
pub const ID_SIGNATURE_TEXT: &[u8] = b"discovery v5 identity proof";

/// Bytes signed by the handshake initiator:
/// `text || challenge-data || ephemeral-pubkey || recipient-id`.
pub fn id_signature_input(
    challenge_data: &[u8],
    ephemeral_pubkey: &Secp256k1PublicKey,
    recipient_id: &NodeId,
) -> Vec<u8> {
    let mut input = Vec::with_capacity(ID_SIGNATURE_TEXT.len() + challenge_data.len() + 33 + 32);
    input.extend_from_slice(ID_SIGNATURE_TEXT);
    input.extend_from_slice(challenge_data);
    input.extend_from_slice(ephemeral_pubkey.as_bytes());
    input.extend_from_slice(recipient_id.as_bytes());
    input
}

/// What the initiator puts in its HANDSHAKE packet.
#[derive(Debug)]
pub struct HandshakeInitiation {
    /// Derived session keys
    pub keys: SessionKeys,
    /// Ephemeral public key to send
    pub ephemeral_pubkey: Secp256k1PublicKey,
    /// Id-nonce signature to send
    pub id_signature: Secp256k1Signature,
}

/// Initiator side: answer a WHOAREYOU from `remote`.
pub fn initiate_handshake(
    local: &LocalNode,
    remote: &NodeRecord,
    challenge_data: &[u8],
) -> Result<HandshakeInitiation, DiscoveryError> {
    let ephemeral = Secp256k1KeyPair::generate();
    let ephemeral_pubkey = ephemeral.public_key();
    let secret = ephemeral.ecdh(remote.public_key())?;
    let keys = derive_session_keys(
        &secret,
        challenge_data,
        local.node_id().as_bytes(),
        remote.node_id().as_bytes(),
    )?;
    let id_signature = local.sign(&id_signature_input(
        challenge_data,
        &ephemeral_pubkey,
        remote.node_id(),
    ));
    Ok(HandshakeInitiation {
        keys,
        ephemeral_pubkey,
        id_signature,
    })
}

/// Recipient side: verify the initiator's proof and derive the same keys.
///
/// `remote` is the initiator's record, either attached to the handshake or
/// already known.
pub fn complete_handshake(
    local: &LocalNode,
    remote: &NodeRecord,
    auth: &HandshakeAuthData,
    challenge_data: &[u8],
) -> Result<SessionKeys, DiscoveryError> {
    let signed = id_signature_input(challenge_data, &auth.ephemeral_pubkey, local.node_id());
    remote
        .public_key()
        .verify(&signed, &auth.id_signature)
        .map_err(|e| DiscoveryError::Handshake(format!("id signature: {e}")))?;

    let secret = local.keypair().ecdh(&auth.ephemeral_pubkey)?;
    Ok(derive_session_keys(
        &secret,
        challenge_data,
        remote.node_id().as_bytes(),
        local.node_id().as_bytes(),
    )?)
}

/// Seal `plaintext` under `key` and assemble the packet.
///
/// The header nonce is the AEAD nonce; `masking-iv || header` is the
/// associated data.
pub fn seal_packet(
    masking_iv: [u8; 16],
    header: Header,
    key: &AesKey,
    plaintext: &[u8],
) -> Result<Packet, DiscoveryError> {
    let mut aad = masking_iv.to_vec();
    aad.extend_from_slice(&header.encode());
    let ciphertext = encrypt(key, header.nonce(), plaintext, &aad)?;
    Ok(Packet::new(masking_iv, header, ciphertext))
}

/// Open the message of `packet` with `key`.
pub fn decrypt_message(key: &AesKey, packet: &Packet) -> Result<Vec<u8>, PacketError> {
    decrypt(
        key,
        packet.header().nonce(),
        packet.message(),
        &packet.authenticated_data(),
    )
    .map_err(|e| PacketError::Decrypt(e.to_string()))
}
