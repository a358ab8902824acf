//! Partitioner abstraction for the ring.
//!
//! Partitioners turn opaque blob names into keys on the ring. The digest must
//! be stable across process restarts so that every node agrees on where a
//! name lives.

pub mod blake3;
pub mod sip;
pub mod traits;

pub use self::blake3::Blake3Partitioner;
pub use self::sip::SipPartitioner;
pub use self::traits::{reduce, Partitioner};
