//! Routing Table Implementation
//!
//! Known nodes partitioned into k-buckets by log distance from the local
//! id. Buckets are created lazily; full buckets hold a single pending
//! replacement that is promoted only when a member fails its liveness check.

mod bucket;
mod closest;
mod config;
mod table;

pub use bucket::{BucketEntry, KBucket};
pub use closest::ClosestNodes;
pub use config::{is_bucket_distance, LivenessConfig, MAXIMUM_BUCKET, MINIMUM_BUCKET};
pub use table::{RoutingTable, RoutingTableStats};

#[cfg(test)]
mod tests;
