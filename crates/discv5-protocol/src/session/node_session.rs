//! Per-peer session state.

use std::collections::VecDeque;
use std::net::SocketAddr;

use discv5_crypto::{AesKey, SessionKeys};
use rand::RngCore;

use crate::domain::{NodeId, NodeRecord, Timestamp};
use crate::message::Message;
use crate::wire::Nonce;

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No keys and nothing sent yet.
    Unestablished,
    /// We sent a random packet to provoke a WHOAREYOU.
    RandomPacketSent,
    /// We sent a WHOAREYOU and wait for the HANDSHAKE.
    ChallengeSent,
    /// Keys agreed.
    Established,
}

/// A WHOAREYOU we issued and have not seen answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// `masking-iv || header` of the WHOAREYOU packet
    pub challenge_data: Vec<u8>,
    /// When it was sent
    pub issued_at: Timestamp,
}

/// Keys plus which side of the handshake we were on.
#[derive(Debug, Clone)]
pub(super) struct EstablishedKeys {
    keys: SessionKeys,
    we_initiated: bool,
}

impl EstablishedKeys {
    pub(super) fn new(keys: SessionKeys, we_initiated: bool) -> Self {
        Self { keys, we_initiated }
    }

    /// Key for packets we send.
    pub(super) fn outbound(&self) -> &AesKey {
        if self.we_initiated {
            &self.keys.initiator_key
        } else {
            &self.keys.recipient_key
        }
    }

    /// Key for packets we receive.
    pub(super) fn inbound(&self) -> &AesKey {
        if self.we_initiated {
            &self.keys.recipient_key
        } else {
            &self.keys.initiator_key
        }
    }
}

/// Copy of a session's public state, safe to hand out past the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Peer id
    pub node_id: NodeId,
    /// Last address we saw the peer at
    pub remote_addr: SocketAddr,
    /// Handshake progress
    pub state: SessionState,
    /// Peer record, once known
    pub node_record: Option<NodeRecord>,
}

/// State for one peer: keys, nonces, handshake progress and messages
/// waiting for the handshake to finish.
///
/// Only ever mutated under the `SessionManager` lock.
#[derive(Debug)]
pub struct NodeSession {
    pub(super) node_id: NodeId,
    pub(super) remote_addr: SocketAddr,
    pub(super) node_record: Option<NodeRecord>,
    pub(super) state: SessionState,
    pub(super) keys: Option<EstablishedKeys>,
    pub(super) challenge: Option<Challenge>,
    pub(super) queued: VecDeque<Message>,
    pub(super) last_seen: Timestamp,
    nonce_counter: u32,
    last_outbound_nonce: Option<Nonce>,
}

impl NodeSession {
    /// New unestablished session.
    pub fn new(node_id: NodeId, remote_addr: SocketAddr, now: Timestamp) -> Self {
        Self {
            node_id,
            remote_addr,
            node_record: None,
            state: SessionState::Unestablished,
            keys: None,
            challenge: None,
            queued: VecDeque::new(),
            last_seen: now,
            nonce_counter: 0,
            last_outbound_nonce: None,
        }
    }

    /// Peer id.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Peer record, if known.
    pub fn node_record(&self) -> Option<&NodeRecord> {
        self.node_record.as_ref()
    }

    /// Handshake progress.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last address we saw the peer at.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Key used to open packets from the peer, once established.
    pub fn recipient_key(&self) -> Option<&AesKey> {
        self.keys.as_ref().map(EstablishedKeys::inbound)
    }

    /// Nonce of the last packet we sent to the peer.
    pub fn last_outbound_nonce(&self) -> Option<&Nonce> {
        self.last_outbound_nonce.as_ref()
    }

    /// Outstanding challenge, if any.
    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    /// Messages waiting for the handshake.
    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// When the peer was last active.
    pub fn last_seen(&self) -> Timestamp {
        self.last_seen
    }

    /// Public snapshot.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            node_id: self.node_id,
            remote_addr: self.remote_addr,
            state: self.state,
            node_record: self.node_record.clone(),
        }
    }

    /// Record the peer's record, keeping whichever has the higher seq.
    pub fn set_node_record(&mut self, record: NodeRecord) {
        let newer = self
            .node_record
            .as_ref()
            .map_or(true, |known| record.seq() > known.seq());
        if newer && record.node_id() == &self.node_id {
            self.node_record = Some(record);
        }
    }

    /// Point the session at `addr`. Only for endpoints vouched for by the
    /// peer's signed record or its keys.
    pub(crate) fn set_remote_addr(&mut self, addr: SocketAddr) {
        self.remote_addr = addr;
    }

    /// Next outbound nonce: a 32-bit counter followed by 8 random bytes.
    ///
    /// Becomes the session's last outbound nonce, which is how an inbound
    /// WHOAREYOU finds its way back here.
    pub(super) fn next_nonce(&mut self) -> Nonce {
        self.nonce_counter = self.nonce_counter.wrapping_add(1);
        let mut nonce = [0u8; 12];
        nonce[..4].copy_from_slice(&self.nonce_counter.to_be_bytes());
        rand::thread_rng().fill_bytes(&mut nonce[4..]);
        self.last_outbound_nonce = Some(nonce);
        nonce
    }
}
