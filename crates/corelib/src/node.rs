//! Identities on the ring.
//!
//! Nodes and stored items share one coordinate space, `[0, R)`. They are kept
//! as distinct newtypes so a key can never be handed where a peer is expected.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compact identifier for a peer on the ring.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Ring position of this node.
    #[inline]
    pub fn position(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses both the bare form (`"4"`) and the host form (`"node4"`) used by
/// deployment seed lists.
impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed.trim_start_matches(|c: char| !c.is_ascii_digit());
        digits
            .parse::<u64>()
            .map(NodeId)
            .map_err(|_| Error::InvalidSeed(trimmed.to_string()))
    }
}

/// Position of a stored item, obtained by hashing its name modulo `R`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Key(pub u64);

impl Key {
    /// Ring position of this key.
    #[inline]
    pub fn position(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
