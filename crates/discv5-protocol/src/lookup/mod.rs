//! # Recursive Lookup
//!
//! Iterative search for the nodes closest to a target id, bounded by a
//! concurrency window and a total query budget.

mod task;

pub use task::{RecursiveLookupTask, DEFAULT_MAX_CONCURRENT_QUERIES};
