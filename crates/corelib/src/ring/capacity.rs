//! Fixed ring capacity `R`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Size of the identifier space, agreed at cluster formation.
///
/// Independent of how many peers are alive; it fixes the finger count
/// `m = ceil(log2 R)` for the lifetime of the ring.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct RingCapacity(u64);

impl RingCapacity {
    /// Capacity used by the reference deployment.
    pub const DEFAULT: u64 = 40;

    pub fn new(capacity: u64) -> Result<Self> {
        if capacity < 2 {
            return Err(Error::InvalidCapacity(capacity));
        }
        Ok(Self(capacity))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Number of finger table entries, `ceil(log2 R)`.
    pub fn finger_count(self) -> usize {
        (u64::BITS - (self.0 - 1).leading_zeros()) as usize
    }

    /// Start of finger `i` for `owner`: `(owner + 2^i) mod R`.
    pub fn finger_start(self, owner: u64, i: usize) -> u64 {
        let stride = 1u128 << i;
        ((owner as u128 + stride) % self.0 as u128) as u64
    }

    /// True if `position` is a valid ring coordinate.
    #[inline]
    pub fn contains(self, position: u64) -> bool {
        position < self.0
    }
}
