//! Session table.

use std::collections::HashMap;
use std::net::SocketAddr;

use discv5_crypto::AesKey;
use parking_lot::Mutex;
use tracing::debug;

use super::node_session::{NodeSession, SessionInfo};
use crate::domain::{NodeId, Timestamp};
use crate::wire::Nonce;

#[derive(Default)]
struct SessionTable {
    sessions: HashMap<NodeId, NodeSession>,
    /// Last outbound nonce of each session, so a WHOAREYOU echoing it can
    /// be routed back. Does not keep the session alive.
    by_nonce: HashMap<Nonce, NodeId>,
}

impl SessionTable {
    /// Run `f` on the session for `node_id` and keep the nonce index in
    /// step with whatever nonce the session used last.
    fn run<R>(&mut self, node_id: &NodeId, f: impl FnOnce(&mut NodeSession) -> R) -> Option<R> {
        let session = self.sessions.get_mut(node_id)?;
        Some(Self::run_on(&mut self.by_nonce, session, f))
    }

    fn run_on<R>(
        by_nonce: &mut HashMap<Nonce, NodeId>,
        session: &mut NodeSession,
        f: impl FnOnce(&mut NodeSession) -> R,
    ) -> R {
        let before = session.last_outbound_nonce().copied();
        let result = f(session);
        let after = session.last_outbound_nonce().copied();
        if before != after {
            if let Some(old) = before {
                by_nonce.remove(&old);
            }
            if let Some(new) = after {
                by_nonce.insert(new, *session.node_id());
            }
        }
        result
    }
}

/// Owns every `NodeSession`, keyed by peer id and by last outbound nonce.
///
/// One lock covers the whole table. Closures passed in run under it, which
/// serializes all state and nonce changes for a session; they must not
/// block or await.
pub struct SessionManager {
    table: Mutex<SessionTable>,
    timeout_secs: u64,
}

impl SessionManager {
    /// Create an empty manager evicting sessions idle for `timeout_secs`.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            table: Mutex::new(SessionTable::default()),
            timeout_secs,
        }
    }

    /// Run `f` on the session for `node_id`, creating an unestablished one
    /// at `remote_addr` if none exists.
    ///
    /// An existing session keeps its address: only traffic that opens with
    /// its keys or a verified handshake moves it.
    pub fn with_session<R>(
        &self,
        node_id: NodeId,
        remote_addr: SocketAddr,
        now: Timestamp,
        f: impl FnOnce(&mut NodeSession) -> R,
    ) -> R {
        let mut guard = self.table.lock();
        let table = &mut *guard;
        let session = table
            .sessions
            .entry(node_id)
            .or_insert_with(|| NodeSession::new(node_id, remote_addr, now));
        SessionTable::run_on(&mut table.by_nonce, session, f)
    }

    /// Run `f` on an existing session only.
    pub fn with_existing_session<R>(
        &self,
        node_id: &NodeId,
        f: impl FnOnce(&mut NodeSession) -> R,
    ) -> Option<R> {
        self.table.lock().run(node_id, f)
    }

    /// Run `f` on the session whose last outbound packet used `nonce`.
    pub fn with_session_by_nonce<R>(
        &self,
        nonce: &Nonce,
        f: impl FnOnce(&mut NodeSession) -> R,
    ) -> Option<R> {
        let mut table = self.table.lock();
        let node_id = *table.by_nonce.get(nonce)?;
        table.run(&node_id, f)
    }

    /// Session awaiting a WHOAREYOU for `nonce`, if any.
    pub fn find_session_by_challenge_nonce(&self, nonce: &Nonce) -> Option<SessionInfo> {
        let table = self.table.lock();
        let node_id = table.by_nonce.get(nonce)?;
        table.sessions.get(node_id).map(NodeSession::info)
    }

    /// Snapshot of the session for `node_id`.
    pub fn get_session(&self, node_id: &NodeId) -> Option<SessionInfo> {
        self.table.lock().sessions.get(node_id).map(NodeSession::info)
    }

    /// Key for opening packets from `node_id`, once established.
    pub fn recipient_key(&self, node_id: &NodeId) -> Option<AesKey> {
        self.table
            .lock()
            .sessions
            .get(node_id)
            .and_then(|session| session.recipient_key().copied())
    }

    /// Drop a session explicitly.
    pub fn remove_session(&self, node_id: &NodeId) -> bool {
        let mut table = self.table.lock();
        match table.sessions.remove(node_id) {
            Some(session) => {
                if let Some(nonce) = session.last_outbound_nonce() {
                    table.by_nonce.remove(nonce);
                }
                true
            }
            None => false,
        }
    }

    /// Evict sessions idle for longer than the timeout. Returns how many.
    pub fn evict_idle(&self, now: Timestamp) -> usize {
        let mut table = self.table.lock();
        let expired: Vec<NodeId> = table
            .sessions
            .values()
            .filter(|session| session.last_seen().has_elapsed(now, self.timeout_secs))
            .map(|session| *session.node_id())
            .collect();
        for node_id in &expired {
            if let Some(session) = table.sessions.remove(node_id) {
                if let Some(nonce) = session.last_outbound_nonce() {
                    table.by_nonce.remove(nonce);
                }
            }
        }
        if !expired.is_empty() {
            debug!("[discv5] Evicted {} idle sessions", expired.len());
        }
        expired.len()
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.table.lock().sessions.len()
    }

    /// Check if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.len())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
