//! Error types for the core library.

use crate::node::NodeId;
use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while shaping a ring view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Ring capacity too small to hold a successor pointer.
    #[error("invalid ring capacity {0}: must be at least 2")]
    InvalidCapacity(u64),
    /// Node id outside `[0, R)`.
    #[error("node {id} does not fit a ring of capacity {capacity}")]
    NodeOutOfRange { id: NodeId, capacity: u64 },
    /// The seed list does not contain the local node.
    #[error("node {0} is not part of the seed membership")]
    NotAMember(NodeId),
    /// Seed list could not be parsed.
    #[error("invalid seed list entry {0:?}")]
    InvalidSeed(String),
}
