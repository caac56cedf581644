//! Logarithmic distance.

use crate::domain::{NodeId, XorDistance};

/// Full XOR distance between two node ids.
pub fn xor_distance(a: &NodeId, b: &NodeId) -> XorDistance {
    XorDistance::between(a, b)
}

/// Bit length of `a XOR b`, in `0..=256`.
///
/// Symmetric, and zero only for identical ids. Bucket `d` of the routing
/// table holds the nodes at log distance `d` from the local id.
#[inline]
pub fn log_distance(a: &NodeId, b: &NodeId) -> u16 {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    for i in 0..32 {
        let xor = a_bytes[i] ^ b_bytes[i];
        if xor != 0 {
            return ((31 - i) * 8 + (8 - xor.leading_zeros() as usize)) as u16;
        }
    }
    0
}
