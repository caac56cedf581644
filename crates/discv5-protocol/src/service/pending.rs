//! Outstanding requests awaiting a response.

use std::collections::HashMap;
use std::net::SocketAddr;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::domain::{NodeId, NodeRecord};
use crate::message::{Message, MessageType, RequestId};

/// A complete response to one of our requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Answer to a PING.
    Pong {
        /// Responder's record seq
        enr_seq: u64,
        /// Our address as the responder saw it
        observed: SocketAddr,
    },
    /// Every record from every NODES part of a FINDNODE answer.
    Nodes(Vec<NodeRecord>),
}

struct PendingRequest {
    peer: NodeId,
    expected: MessageType,
    parts_seen: u8,
    records: Vec<NodeRecord>,
    tx: oneshot::Sender<Response>,
}

/// Request table keyed by request id.
///
/// A response only matches when it comes from the peer the request was
/// sent to and has the expected type.
#[derive(Default)]
pub(crate) struct PendingRequests {
    requests: Mutex<HashMap<RequestId, PendingRequest>>,
}

impl PendingRequests {
    /// Track a request; the receiver resolves once the response is complete.
    ///
    /// The entry lives as long as the returned guard, so a requester that
    /// gives up, times out or is dropped mid-flight leaves nothing behind.
    pub(crate) fn register(
        &self,
        request_id: RequestId,
        peer: NodeId,
        expected: MessageType,
    ) -> (PendingGuard<'_>, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        self.requests.lock().insert(
            request_id,
            PendingRequest {
                peer,
                expected,
                parts_seen: 0,
                records: Vec::new(),
                tx,
            },
        );
        let guard = PendingGuard {
            pending: self,
            request_id,
        };
        (guard, rx)
    }

    /// Feed a response message from `from`. Returns false if it matched no
    /// outstanding request.
    pub(crate) fn on_response(&self, from: &NodeId, message: &Message) -> bool {
        let request_id = message.request_id();
        let mut requests = self.requests.lock();
        let matches = requests.get(&request_id).is_some_and(|pending| {
            &pending.peer == from && pending.expected == message.message_type()
        });
        if !matches {
            return false;
        }

        let response = match message {
            Message::Pong {
                enr_seq, observed, ..
            } => Response::Pong {
                enr_seq: *enr_seq,
                observed: *observed,
            },
            Message::Nodes { total, records, .. } => {
                let Some(pending) = requests.get_mut(&request_id) else {
                    return false;
                };
                pending.parts_seen = pending.parts_seen.saturating_add(1);
                pending.records.extend(records.iter().cloned());
                if pending.parts_seen < (*total).max(1) {
                    return true;
                }
                Response::Nodes(std::mem::take(&mut pending.records))
            }
            Message::Ping { .. } | Message::FindNode { .. } => return false,
        };

        if let Some(pending) = requests.remove(&request_id) {
            // The requester may have given up already.
            let _ = pending.tx.send(response);
        }
        true
    }

    /// Forget a request. A no-op once it has been answered.
    pub(crate) fn cancel(&self, request_id: RequestId) {
        self.requests.lock().remove(&request_id);
    }

    pub(crate) fn len(&self) -> usize {
        self.requests.lock().len()
    }
}

/// Removes its request from the table when dropped.
pub(crate) struct PendingGuard<'a> {
    pending: &'a PendingRequests,
    request_id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.cancel(self.request_id);
    }
}
