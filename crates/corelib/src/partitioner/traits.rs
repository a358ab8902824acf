//! Core partitioner trait definitions.

use crate::node::Key;
use crate::ring::RingCapacity;

/// A partitioner converts names into keys for placement on the ring.
///
/// Partitioners are stateless and thread-safe.
pub trait Partitioner: Send + Sync + 'static {
    /// Digest of `name` as a big-endian unsigned integer.
    fn digest(&self, name: &[u8]) -> Vec<u8>;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;

    /// Key of `name` on a ring of the given capacity.
    fn key_for(&self, name: &[u8], capacity: RingCapacity) -> Key {
        Key(reduce(&self.digest(name), capacity))
    }
}

/// Reduce a big-endian integer of any width modulo the ring size.
///
/// [`RingCapacity`] is never zero, so the reduction cannot divide by zero.
pub fn reduce(digest: &[u8], capacity: RingCapacity) -> u64 {
    let modulus = capacity.get() as u128;
    let rem = digest
        .iter()
        .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % modulus);
    rem as u64
}
