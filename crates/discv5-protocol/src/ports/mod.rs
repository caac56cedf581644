//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** capabilities this crate exposes
//! - **Driven Ports (Outbound):** collaborators the host must provide
//!
//! The wire codec, sessions, routing table and lookup only ever talk to
//! the outside world through these traits.

pub mod inbound;
pub mod outbound;

pub use inbound::FindNodes;
pub use outbound::{
    AddressAccessPolicy, AllowAllPolicy, ConfigProvider, LivenessChecker, MessageDispatcher,
    NoOpDispatcher, TimeSource, Transport,
};
