//! Session state transitions driven by packets.

use std::net::SocketAddr;

use rand::RngCore;
use tracing::debug;

use super::crypto::{complete_handshake, decrypt_message, initiate_handshake, seal_packet};
use super::node_session::{Challenge, EstablishedKeys, NodeSession, SessionState};
use crate::domain::{DiscoveryError, LocalNode, Timestamp};
use crate::message::{random_request_id, Message};
use crate::wire::{
    AuthData, ChallengeAuthData, HandshakeAuthData, Header, Nonce, OrdinaryAuthData, Packet,
    ID_NONCE_SIZE,
};

/// Filler length of the random packet that opens a handshake.
const RANDOM_MESSAGE_SIZE: usize = 20;

/// Result of an inbound ordinary message.
#[derive(Debug)]
pub enum MessageOutcome {
    /// Opened with the session keys.
    Decrypted(Vec<u8>),
    /// Could not be opened; send this WHOAREYOU back.
    Challenge(Packet),
}

impl NodeSession {
    /// Prepare `message` for sending.
    ///
    /// With keys it is sealed right away. Without, it is queued and, unless
    /// the peer is the one handshaking towards us, a random packet is
    /// returned to provoke a WHOAREYOU. Each new random packet supersedes
    /// the previous one.
    pub fn prepare_outbound(
        &mut self,
        local: &LocalNode,
        message: Message,
        now: Timestamp,
    ) -> Result<Option<Packet>, DiscoveryError> {
        self.last_seen = now;
        if self.keys.is_some() {
            return self.seal_ordinary(local, &message).map(Some);
        }
        self.queued.push_back(message);
        match self.state {
            SessionState::ChallengeSent => Ok(None),
            _ => {
                self.state = SessionState::RandomPacketSent;
                Ok(Some(self.random_packet(local)))
            }
        }
    }

    /// Answer a WHOAREYOU that echoed our last nonce.
    ///
    /// Returns the HANDSHAKE packet (carrying the first queued message)
    /// followed by the rest of the queue sealed with the new keys.
    pub fn handle_challenge(
        &mut self,
        local: &LocalNode,
        packet: &Packet,
        challenge: &ChallengeAuthData,
        now: Timestamp,
    ) -> Result<Vec<Packet>, DiscoveryError> {
        let record = self
            .node_record
            .clone()
            .ok_or_else(|| DiscoveryError::Handshake("no record for challenger".into()))?;
        let challenge_data = packet.authenticated_data();
        let initiation = initiate_handshake(local, &record, &challenge_data)?;

        let local_record = local.record();
        let attached = (challenge.enr_seq < local_record.seq()).then_some(local_record);
        let first = self.queued.pop_front().unwrap_or_else(|| Message::Ping {
            request_id: random_request_id(),
            enr_seq: local.seq(),
        });

        let header = Header::new(
            self.next_nonce(),
            AuthData::Handshake(HandshakeAuthData {
                src_id: *local.node_id(),
                id_signature: initiation.id_signature,
                ephemeral_pubkey: initiation.ephemeral_pubkey,
                record: attached,
            }),
        );
        let handshake = seal_packet(
            Packet::random_iv(),
            header,
            &initiation.keys.initiator_key,
            &first.encode(),
        )?;

        self.keys = Some(EstablishedKeys::new(initiation.keys, true));
        self.state = SessionState::Established;
        self.challenge = None;
        self.last_seen = now;
        debug!("[discv5] Session with {} established (initiator)", self.node_id);

        let mut packets = vec![handshake];
        packets.extend(self.drain_queued(local)?);
        Ok(packets)
    }

    /// Verify a HANDSHAKE answering our challenge and open its message.
    ///
    /// On success the session moves to `source`. On any failure the session
    /// is left as it was, challenge and address included.
    pub fn handle_handshake(
        &mut self,
        local: &LocalNode,
        packet: &Packet,
        auth: &HandshakeAuthData,
        source: SocketAddr,
        now: Timestamp,
    ) -> Result<Vec<u8>, DiscoveryError> {
        let challenge = match (&self.state, &self.challenge) {
            (SessionState::ChallengeSent, Some(challenge)) => challenge,
            _ => {
                return Err(DiscoveryError::Handshake(format!(
                    "no outstanding challenge in state {:?}",
                    self.state
                )))
            }
        };

        let record = match (&auth.record, &self.node_record) {
            (Some(attached), known) => {
                if attached.node_id() != &auth.src_id {
                    return Err(DiscoveryError::Handshake(
                        "attached record does not match source id".into(),
                    ));
                }
                match known {
                    Some(known) if known.seq() > attached.seq() => known.clone(),
                    _ => attached.clone(),
                }
            }
            (None, Some(known)) => known.clone(),
            (None, None) => {
                return Err(DiscoveryError::Handshake(
                    "record required but not attached".into(),
                ))
            }
        };

        let keys = complete_handshake(local, &record, auth, &challenge.challenge_data)?;
        let plaintext = decrypt_message(&keys.initiator_key, packet)?;

        self.keys = Some(EstablishedKeys::new(keys, false));
        self.state = SessionState::Established;
        self.challenge = None;
        self.node_record = Some(record);
        self.remote_addr = source;
        self.last_seen = now;
        debug!("[discv5] Session with {} established (recipient)", self.node_id);
        Ok(plaintext)
    }

    /// Open an ordinary message, or issue a challenge if we cannot.
    ///
    /// Only a message that opens moves the session to `source`. For one
    /// that does not, the session keeps the address it had.
    pub fn handle_message(
        &mut self,
        packet: &Packet,
        source: SocketAddr,
        now: Timestamp,
    ) -> MessageOutcome {
        self.last_seen = now;
        if let Some(keys) = &self.keys {
            match decrypt_message(keys.inbound(), packet) {
                Ok(plaintext) => {
                    self.remote_addr = source;
                    if self.state == SessionState::ChallengeSent {
                        // The retained keys still work, so the re-challenge is moot.
                        self.state = SessionState::Established;
                        self.challenge = None;
                    }
                    return MessageOutcome::Decrypted(plaintext);
                }
                Err(err) => debug!(
                    "[discv5] Message from {} failed to decrypt ({}), re-challenging",
                    self.node_id, err
                ),
            }
        }
        MessageOutcome::Challenge(self.issue_challenge(packet.header().nonce(), now))
    }

    /// Seal everything still queued with the current keys.
    pub fn drain_queued(&mut self, local: &LocalNode) -> Result<Vec<Packet>, DiscoveryError> {
        if self.keys.is_none() {
            return Ok(Vec::new());
        }
        let queued: Vec<Message> = self.queued.drain(..).collect();
        queued
            .iter()
            .map(|message| self.seal_ordinary(local, message))
            .collect()
    }

    /// Build a WHOAREYOU echoing `nonce` and remember it.
    fn issue_challenge(&mut self, nonce: &Nonce, now: Timestamp) -> Packet {
        let mut id_nonce = [0u8; ID_NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut id_nonce);
        let enr_seq = self.node_record.as_ref().map_or(0, |record| record.seq());

        let header = Header::new(
            *nonce,
            AuthData::WhoAreYou(ChallengeAuthData { id_nonce, enr_seq }),
        );
        let packet = Packet::new(Packet::random_iv(), header, Vec::new());
        self.challenge = Some(Challenge {
            challenge_data: packet.authenticated_data(),
            issued_at: now,
        });
        self.state = SessionState::ChallengeSent;
        packet
    }

    fn seal_ordinary(
        &mut self,
        local: &LocalNode,
        message: &Message,
    ) -> Result<Packet, DiscoveryError> {
        let key = match &self.keys {
            Some(keys) => *keys.outbound(),
            None => return Err(DiscoveryError::UnknownSession(self.node_id.to_string())),
        };
        let header = Header::new(
            self.next_nonce(),
            AuthData::Message(OrdinaryAuthData {
                src_id: *local.node_id(),
            }),
        );
        seal_packet(Packet::random_iv(), header, &key, &message.encode())
    }

    pub(super) fn random_packet(&mut self, local: &LocalNode) -> Packet {
        let header = Header::new(
            self.next_nonce(),
            AuthData::Message(OrdinaryAuthData {
                src_id: *local.node_id(),
            }),
        );
        let mut filler = vec![0u8; RANDOM_MESSAGE_SIZE];
        rand::thread_rng().fill_bytes(&mut filler);
        Packet::new(Packet::random_iv(), header, filler)
    }
}
