//! Node records and the local node identity.
//!
//! A record is the self-signed statement of a node's public key and
//! endpoint. Only the fields discovery needs are carried: sequence number,
//! key, IP and ports.

mod local;
mod record;

pub use local::LocalNode;
pub use record::{NodeRecord, MAX_RECORD_SIZE};

#[cfg(test)]
mod tests;
