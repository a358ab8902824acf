//! Core library for the Chord ring.
//!
//! This crate provides the pure, synchronous parts of a ring node:
//! - Ring arithmetic (wraparound intervals, responsibility)
//! - Membership and the fixed ring capacity
//! - Finger table construction and incremental repair
//! - Node state and next-hop selection
//! - Partitioners that map blob names to keys

pub mod error;
pub mod finger;
pub mod node;
pub mod partitioner;
pub mod ring;
pub mod state;

pub use error::{Error, Result};
pub use finger::FingerTable;
pub use node::{Key, NodeId};
pub use partitioner::Partitioner;
pub use ring::{Membership, RingCapacity};
pub use state::{Hop, LeavePropagation, NodeState};
