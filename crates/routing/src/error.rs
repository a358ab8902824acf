//! Error taxonomy for routed operations.
//!
//! Four classes matter to callers: an absent blob, a dead hop, a request that
//! ran out of retries, and everything else. Only [`RouteError::Unreachable`]
//! is a liveness signal; the router is the one place that turns it into a
//! membership change.

use corelib::{Key, NodeId};
use thiserror::Error;

/// A specialized `Result` type for routing operations.
pub type Result<T> = std::result::Result<T, RouteError>;

/// Maximum number of peer-death repairs a single routing call absorbs.
pub const MAX_ROUTING_RETRIES: u32 = 10;

/// Maximum number of forwards a routed request may take across the ring.
pub const MAX_FORWARD_HOPS: u32 = 32;

#[derive(Debug, Error)]
pub enum RouteError {
    /// The responsible node does not hold the named blob.
    #[error("not found: {0}")]
    NotFound(String),

    /// The peer did not answer or the transport failed.
    #[error("node {peer} unreachable: {reason}")]
    Unreachable { peer: NodeId, reason: String },

    /// Too many dead hops while routing `key`.
    #[error("routing key {key} gave up after {attempts} attempts, dead hops {dead_hops:?}")]
    RetryExhausted {
        key: Key,
        attempts: u32,
        dead_hops: Vec<NodeId>,
    },

    /// The request was forwarded more than [`MAX_FORWARD_HOPS`] times.
    #[error("routing key {key} exceeded {hops} forwards")]
    HopLimit { key: Key, hops: u32 },

    /// Every member the request could go to is excluded.
    #[error("no live peer left to take key {0}")]
    Stranded(Key),

    #[error("node {0} is already leaving the ring")]
    LeaveInProgress(NodeId),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid blob name {0:?}")]
    InvalidName(String),

    #[error(transparent)]
    Ring(#[from] corelib::Error),

    #[error("{0}")]
    Generic(String),
}

/// Caller-visible class of a [`RouteError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unreachable,
    RetryExhausted,
    Generic,
}

impl RouteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RouteError::NotFound(_) => ErrorKind::NotFound,
            RouteError::Unreachable { .. } => ErrorKind::Unreachable,
            RouteError::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            _ => ErrorKind::Generic,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        self.kind() == ErrorKind::Unreachable
    }

    pub fn unreachable(peer: NodeId, reason: impl ToString) -> Self {
        RouteError::Unreachable {
            peer,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(RouteError::NotFound("a".into()).kind(), ErrorKind::NotFound);
        assert!(RouteError::unreachable(NodeId(3), "refused").is_unreachable());
        assert_eq!(
            RouteError::LeaveInProgress(NodeId(1)).kind(),
            ErrorKind::Generic
        );
        let err = RouteError::RetryExhausted {
            key: Key(7),
            attempts: 11,
            dead_hops: vec![NodeId(2)],
        };
        assert_eq!(err.kind(), ErrorKind::RetryExhausted);
        assert!(err.to_string().contains("key 7"));

        let err = RouteError::HopLimit {
            key: Key(4),
            hops: MAX_FORWARD_HOPS + 1,
        };
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert!(err.to_string().contains("33 forwards"));
        assert_eq!(RouteError::Stranded(Key(1)).kind(), ErrorKind::Generic);
    }
}
