//! Value objects: XOR distance and protocol configuration.

use super::entities::{NodeId, NODE_ID_SIZE};
use super::errors::DiscoveryError;

/// Full 256-bit XOR distance between two node ids.
///
/// Ordering is numeric (big-endian), so sorting by `XorDistance` sorts
/// nearest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct XorDistance([u8; NODE_ID_SIZE]);

impl XorDistance {
    /// Distance between `a` and `b`.
    pub fn between(a: &NodeId, b: &NodeId) -> Self {
        let mut out = [0u8; NODE_ID_SIZE];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = a.0[i] ^ b.0[i];
        }
        Self(out)
    }

    /// Bit length of the distance: 0 for identical ids, 256 when the top
    /// bit differs.
    pub fn log2(&self) -> u16 {
        for (i, byte) in self.0.iter().enumerate() {
            if *byte != 0 {
                let bits_below = (NODE_ID_SIZE - i - 1) * 8;
                return (bits_below + (8 - byte.leading_zeros() as usize)) as u16;
            }
        }
        0
    }

    /// Raw distance bytes.
    pub fn as_bytes(&self) -> &[u8; NODE_ID_SIZE] {
        &self.0
    }
}

/// Configuration for the discovery protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "network", derive(serde::Deserialize))]
#[cfg_attr(feature = "network", serde(default))]
pub struct DiscoveryConfig {
    /// Bucket capacity (default: 16)
    pub bucket_size: usize,
    /// Concurrent FINDNODE queries per lookup (default: 3)
    pub max_concurrent_queries: usize,
    /// Total FINDNODE queries per lookup (default: 16)
    pub lookup_query_budget: usize,
    /// Idle time after which a session is evicted (default: 24h)
    pub session_timeout_secs: u64,
    /// Per-request response timeout (default: 1000ms)
    pub request_timeout_millis: u64,
    /// Minimum time between liveness checks of one entry (default: 30s)
    pub liveness_check_interval_secs: u64,
    /// Time after which an unanswered check counts as failed (default: 10s)
    pub liveness_timeout_secs: u64,
    /// Records per NODES message (default: 8, keeps packets under 1280 bytes)
    pub max_nodes_per_response: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bucket_size: 16,
            max_concurrent_queries: 3,
            lookup_query_budget: 16,
            session_timeout_secs: 86_400,
            request_timeout_millis: 1_000,
            liveness_check_interval_secs: 30,
            liveness_timeout_secs: 10,
            max_nodes_per_response: 8,
        }
    }
}

impl DiscoveryConfig {
    /// Create a config suitable for testing (smaller values)
    pub fn for_testing() -> Self {
        Self {
            bucket_size: 3, // Small buckets fill quickly
            max_concurrent_queries: 3,
            lookup_query_budget: 8,
            session_timeout_secs: 60,
            request_timeout_millis: 200,
            liveness_check_interval_secs: 5,
            liveness_timeout_secs: 2,
            max_nodes_per_response: 4,
        }
    }

    /// Reject values that would make the table or lookups degenerate.
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if self.bucket_size == 0 {
            return Err(DiscoveryError::InvalidArgument(
                "bucket_size must be positive".into(),
            ));
        }
        if self.max_concurrent_queries == 0 {
            return Err(DiscoveryError::InvalidArgument(
                "max_concurrent_queries must be positive".into(),
            ));
        }
        if self.lookup_query_budget == 0 {
            return Err(DiscoveryError::InvalidArgument(
                "lookup_query_budget must be positive".into(),
            ));
        }
        if self.max_nodes_per_response == 0 {
            return Err(DiscoveryError::InvalidArgument(
                "max_nodes_per_response must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xor_distance_ordering() {
        let target = NodeId::zero();
        let mut near = [0u8; 32];
        near[31] = 1;
        let mut far = [0u8; 32];
        far[0] = 1;

        let d_near = XorDistance::between(&target, &NodeId::new(near));
        let d_far = XorDistance::between(&target, &NodeId::new(far));

        assert!(d_near < d_far);
        assert_eq!(d_near.log2(), 1);
        assert_eq!(d_far.log2(), 249);
    }

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.bucket_size, 16);
        assert_eq!(config.max_concurrent_queries, 3);
        assert_eq!(config.lookup_query_budget, 16);
        assert!(config.validate().is_ok());
        assert!(DiscoveryConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_zero_bucket_size_rejected() {
        let config = DiscoveryConfig {
            bucket_size: 0,
            ..DiscoveryConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DiscoveryError::InvalidArgument(_))
        ));
    }
}
