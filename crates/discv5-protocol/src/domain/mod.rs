//! Domain Layer - Pure protocol logic with no I/O
//!
//! This module contains the discovery core data model:
//! - Node identifiers and log-distance calculation
//! - Signed node records and the local node identity
//! - Routing table with k-buckets and liveness-driven eviction

pub mod enr;
pub mod routing_table;
pub mod services;
/// Core domain types (entities, values, errors)
pub mod types;

pub use enr::*;
pub use routing_table::*;
pub use services::*;
pub use types::*;
