//! Ring arithmetic and membership.
//!
//! Pure functions over positions in `[0, R)` plus the sorted view of live
//! peers every routing decision is computed from.

pub mod capacity;
pub mod interval;
pub mod membership;

pub use capacity::RingCapacity;
pub use interval::{in_interval, in_open_interval, is_responsible};
pub use membership::Membership;
