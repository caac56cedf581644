//! Discovery messages carried inside MESSAGE and HANDSHAKE packets.
//!
//! Wire format: a type byte followed by big-endian fields.
//!
//! | Type | Fields |
//! |------|--------|
//! | PING (0x01) | request-id(8), enr-seq(8) |
//! | PONG (0x02) | request-id(8), enr-seq(8), ip-len(1), ip, port(2) |
//! | FINDNODE (0x03) | request-id(8), count(1), distance(2) x count |
//! | NODES (0x04) | request-id(8), total(1), count(1), (len(2), record) x count |

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use rand::Rng;
use tracing::debug;

use crate::domain::{DiscoveryError, NodeRecord};
use crate::wire::reader::ByteReader;

/// Correlates a response with its request.
pub type RequestId = u64;

/// Most distances one FINDNODE can carry (one-byte count).
pub const MAX_FIND_NODE_DISTANCES: usize = u8::MAX as usize;

/// Most NODES messages in one response, and most records in one of them
/// (both one-byte counts).
pub const MAX_NODES_MESSAGES: usize = u8::MAX as usize;

/// Fresh random request id.
pub fn random_request_id() -> RequestId {
    rand::thread_rng().gen()
}

/// Discovery message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Liveness probe.
    Ping = 0x01,
    /// Response to a PING.
    Pong = 0x02,
    /// Request for records at given log distances.
    FindNode = 0x03,
    /// Response containing records.
    Nodes = 0x04,
}

impl TryFrom<u8> for MessageType {
    type Error = DiscoveryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Ping),
            0x02 => Ok(Self::Pong),
            0x03 => Ok(Self::FindNode),
            0x04 => Ok(Self::Nodes),
            other => Err(DiscoveryError::Message(format!(
                "unknown message type {other:#04x}"
            ))),
        }
    }
}

/// A decoded discovery message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Liveness probe, carrying the sender's record seq.
    Ping {
        /// Request id
        request_id: RequestId,
        /// Sender's record sequence number
        enr_seq: u64,
    },
    /// PING response, reporting the address the PING came from.
    Pong {
        /// Request id of the PING
        request_id: RequestId,
        /// Responder's record sequence number
        enr_seq: u64,
        /// Address the responder observed for us
        observed: SocketAddr,
    },
    /// Ask for records at the given log distances from the recipient.
    FindNode {
        /// Request id
        request_id: RequestId,
        /// Log distances, each in 0..=256
        distances: Vec<u16>,
    },
    /// One part of a FINDNODE response.
    Nodes {
        /// Request id of the FINDNODE
        request_id: RequestId,
        /// Number of NODES messages in the full response
        total: u8,
        /// Records in this part
        records: Vec<NodeRecord>,
    },
}

impl Message {
    /// Message type.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Ping { .. } => MessageType::Ping,
            Self::Pong { .. } => MessageType::Pong,
            Self::FindNode { .. } => MessageType::FindNode,
            Self::Nodes { .. } => MessageType::Nodes,
        }
    }

    /// Request id.
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Ping { request_id, .. }
            | Self::Pong { request_id, .. }
            | Self::FindNode { request_id, .. }
            | Self::Nodes { request_id, .. } => *request_id,
        }
    }

    /// Split `records` into NODES messages of at most `per_message` records.
    ///
    /// Always yields at least one message so an empty answer is still an
    /// answer. Records beyond what [`MAX_NODES_MESSAGES`] messages can hold
    /// are left out.
    pub fn nodes_responses(
        request_id: RequestId,
        mut records: Vec<NodeRecord>,
        per_message: usize,
    ) -> Vec<Message> {
        let per_message = per_message.clamp(1, MAX_NODES_MESSAGES);
        let limit = per_message * MAX_NODES_MESSAGES;
        if records.len() > limit {
            debug!(
                "[discv5] NODES answer to {:#x} capped at {} of {} records",
                request_id,
                limit,
                records.len()
            );
            records.truncate(limit);
        }
        let chunks: Vec<Vec<NodeRecord>> = if records.is_empty() {
            vec![Vec::new()]
        } else {
            records.chunks(per_message).map(<[NodeRecord]>::to_vec).collect()
        };
        let total = chunks.len() as u8;
        chunks
            .into_iter()
            .map(|records| Message::Nodes {
                request_id,
                total,
                records,
            })
            .collect()
    }

    /// Serialize.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.message_type() as u8];
        out.extend_from_slice(&self.request_id().to_be_bytes());
        match self {
            Self::Ping { enr_seq, .. } => out.extend_from_slice(&enr_seq.to_be_bytes()),
            Self::Pong {
                enr_seq, observed, ..
            } => {
                out.extend_from_slice(&enr_seq.to_be_bytes());
                match observed.ip() {
                    IpAddr::V4(v4) => {
                        out.push(4);
                        out.extend_from_slice(&v4.octets());
                    }
                    IpAddr::V6(v6) => {
                        out.push(16);
                        out.extend_from_slice(&v6.octets());
                    }
                }
                out.extend_from_slice(&observed.port().to_be_bytes());
            }
            Self::FindNode { distances, .. } => {
                if distances.len() > MAX_FIND_NODE_DISTANCES {
                    debug!(
                        "[discv5] FINDNODE capped at {} of {} distances",
                        MAX_FIND_NODE_DISTANCES,
                        distances.len()
                    );
                }
                let count = distances.len().min(MAX_FIND_NODE_DISTANCES);
                out.push(count as u8);
                for distance in &distances[..count] {
                    out.extend_from_slice(&distance.to_be_bytes());
                }
            }
            Self::Nodes { total, records, .. } => {
                if records.len() > MAX_NODES_MESSAGES {
                    debug!(
                        "[discv5] NODES capped at {} of {} records",
                        MAX_NODES_MESSAGES,
                        records.len()
                    );
                }
                let count = records.len().min(MAX_NODES_MESSAGES);
                out.push(*total);
                out.push(count as u8);
                for record in &records[..count] {
                    let encoded = record.encode();
                    out.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
                    out.extend_from_slice(&encoded);
                }
            }
        }
        out
    }

    /// Parse a message; records in NODES are signature-checked.
    pub fn decode(bytes: &[u8]) -> Result<Self, DiscoveryError> {
        let mut reader = ByteReader::new(bytes);
        let message_type = MessageType::try_from(reader.u8("message type")?)?;
        let request_id = reader.u64("request id")?;
        let message = match message_type {
            MessageType::Ping => Self::Ping {
                request_id,
                enr_seq: reader.u64("enr-seq")?,
            },
            MessageType::Pong => {
                let enr_seq = reader.u64("enr-seq")?;
                let ip = match reader.u8("ip length")? {
                    4 => IpAddr::V4(Ipv4Addr::from(reader.array::<4>("ipv4")?)),
                    16 => IpAddr::V6(Ipv6Addr::from(reader.array::<16>("ipv6")?)),
                    other => {
                        return Err(DiscoveryError::Message(format!(
                            "PONG ip length {other} is neither 4 nor 16"
                        )))
                    }
                };
                let port = reader.u16("port")?;
                Self::Pong {
                    request_id,
                    enr_seq,
                    observed: SocketAddr::new(ip, port),
                }
            }
            MessageType::FindNode => {
                let count = reader.u8("distance count")?;
                let distances = (0..count)
                    .map(|_| reader.u16("distance"))
                    .collect::<Result<Vec<_>, _>>()?;
                Self::FindNode {
                    request_id,
                    distances,
                }
            }
            MessageType::Nodes => {
                let total = reader.u8("total")?;
                let count = reader.u8("record count")?;
                let mut records = Vec::with_capacity(usize::from(count));
                for _ in 0..count {
                    let len = usize::from(reader.u16("record length")?);
                    records.push(NodeRecord::decode(reader.take(len, "record")?)?);
                }
                Self::Nodes {
                    request_id,
                    total,
                    records,
                }
            }
        };
        if !reader.is_empty() {
            return Err(DiscoveryError::Message(format!(
                "{} trailing bytes after {:?}",
                reader.remaining(),
                message_type
            )));
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests;
