//! Domain Services - Pure functions over node ids
//!
//! All functions in this module are pure (no I/O, no state mutation)
//! and deterministic (same inputs → same outputs).

mod distance;
mod sorting;

pub use distance::{log_distance, xor_distance};
pub use sorting::{find_k_closest, sort_records_by_distance};

#[cfg(test)]
mod tests;
