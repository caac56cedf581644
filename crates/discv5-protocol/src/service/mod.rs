//! # Discovery Service
//!
//! The packet pipeline: every inbound datagram runs through
//! decode → demask → session resolution → decrypt → message handling as
//! one unit of work. Requests (PING, FINDNODE) are tracked by request id and
//! time out on their own; their responses mark the peer live in the routing
//! table.

mod discovery;
mod pending;

pub use discovery::{DiscoveryService, PacketOutcome, PongResponse, ServiceStats};
pub use pending::Response;
