//! Routing table constants and configuration.

use crate::domain::DiscoveryConfig;

/// Closest bucket (ids differing only in the lowest bit).
pub const MINIMUM_BUCKET: u16 = 1;

/// Farthest bucket (ids differing in the top bit).
pub const MAXIMUM_BUCKET: u16 = 256;

/// Whether `distance` maps to a bucket. Distance 0 is the local node.
pub fn is_bucket_distance(distance: u16) -> bool {
    (MINIMUM_BUCKET..=MAXIMUM_BUCKET).contains(&distance)
}

/// Bucket sizing and liveness timing, taken from [`DiscoveryConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    /// Bucket capacity
    pub bucket_size: usize,
    /// Minimum seconds between checks of one entry
    pub check_interval_secs: u64,
    /// Seconds after which an unanswered check counts as failed
    pub check_timeout_secs: u64,
}

impl From<&DiscoveryConfig> for LivenessConfig {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            bucket_size: config.bucket_size,
            check_interval_secs: config.liveness_check_interval_secs,
            check_timeout_secs: config.liveness_timeout_secs,
        }
    }
}
