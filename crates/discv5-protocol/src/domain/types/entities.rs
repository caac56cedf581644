//! Core domain entities: node identity and time.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

/// Size of a node identifier in bytes.
pub const NODE_ID_SIZE: usize = 32;

/// 256-bit node identifier, the Keccak-256 hash of the node's public key.
///
/// Equality is constant-time: the byte-array `PartialEq` short-circuits on
/// the first difference and leaks where two ids diverge.
#[allow(clippy::derived_hash_with_manual_eq)]
#[derive(Clone, Copy, Hash)]
pub struct NodeId(pub [u8; NODE_ID_SIZE]);

impl PartialEq for NodeId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        let mut result = 0u8;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            result |= a ^ b;
        }
        result == 0
    }
}

impl Eq for NodeId {}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Big-endian byte order, used to break ties between equidistant nodes.
impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl NodeId {
    /// Create a NodeId from raw 32-byte array.
    pub fn new(bytes: [u8; NODE_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice of exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; NODE_ID_SIZE] {
        &self.0
    }

    /// All-zero id, handy as a fixed point in tests.
    pub fn zero() -> Self {
        Self([0u8; NODE_ID_SIZE])
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({self})")
    }
}

/// Short hex prefix, enough to tell peers apart in logs.
impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        f.write_str("..")
    }
}

/// Unix timestamp in seconds.
///
/// Values are clamped so that `u64::MAX` cannot be used to corrupt
/// ordering-based maintenance decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    /// Create a new timestamp, clamping to MAX_REASONABLE.
    pub const fn new(secs: u64) -> Self {
        if secs > Self::MAX_REASONABLE {
            Self(Self::MAX_REASONABLE)
        } else {
            Self(secs)
        }
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Add seconds to timestamp (saturating at MAX_REASONABLE).
    pub fn add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs).min(Self::MAX_REASONABLE))
    }

    /// Subtract seconds from timestamp (saturating at 0).
    pub fn sub_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Whether at least `secs` have elapsed between `self` and `now`.
    pub fn has_elapsed(&self, now: Timestamp, secs: u64) -> bool {
        now.0 >= self.0.saturating_add(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_ordering_is_big_endian() {
        let mut low = [0u8; 32];
        low[31] = 0xFF;
        let mut high = [0u8; 32];
        high[0] = 0x01;

        assert!(NodeId::new(low) < NodeId::new(high));
    }

    #[test]
    fn test_node_id_from_slice_checks_length() {
        assert!(NodeId::from_slice(&[0u8; 31]).is_none());
        assert_eq!(NodeId::from_slice(&[7u8; 32]), Some(NodeId::new([7u8; 32])));
    }

    #[test]
    fn test_node_id_display_is_short_hex() {
        let id = NodeId::new([0xAB; 32]);
        assert_eq!(id.to_string(), "abababab..");
    }

    #[test]
    fn test_timestamp_clamps_and_elapses() {
        assert_eq!(Timestamp::new(u64::MAX).as_secs(), Timestamp::MAX_REASONABLE);

        let start = Timestamp::new(100);
        assert!(!start.has_elapsed(Timestamp::new(109), 10));
        assert!(start.has_elapsed(Timestamp::new(110), 10));
        assert_eq!(start.sub_secs(200).as_secs(), 0);
    }
}
