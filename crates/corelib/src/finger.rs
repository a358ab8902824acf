//! Finger table: a node's logarithmic routing shortcuts.
//!
//! Entry `i` points at the first known peer at or after `(owner + 2^i) mod R`.
//! Entry 0 is therefore the immediate successor. The table is built once from
//! the seed membership and afterwards only repaired in place, one removed peer
//! at a time.

use crate::node::NodeId;
use crate::ring::{Membership, RingCapacity};
use std::fmt;

/// Fixed-size routing table of `m = ceil(log2 R)` entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FingerTable {
    owner: NodeId,
    capacity: RingCapacity,
    entries: Vec<NodeId>,
}

impl FingerTable {
    /// Build every entry from `membership`.
    ///
    /// An empty membership degenerates to a table pointing at `owner`.
    pub fn build(owner: NodeId, capacity: RingCapacity, membership: &Membership) -> Self {
        let entries = (0..capacity.finger_count())
            .map(|i| Self::resolve(owner, capacity, i, membership))
            .collect();
        Self {
            owner,
            capacity,
            entries,
        }
    }

    /// Recompute only the entries that pointed at `removed`.
    ///
    /// Returns the repaired indexes.
    pub fn repair(&mut self, removed: NodeId, membership: &Membership) -> Vec<usize> {
        let mut repaired = Vec::new();
        for i in 0..self.entries.len() {
            if self.entries[i] == removed {
                self.entries[i] = Self::resolve(self.owner, self.capacity, i, membership);
                repaired.push(i);
            }
        }
        repaired
    }

    fn resolve(owner: NodeId, capacity: RingCapacity, i: usize, membership: &Membership) -> NodeId {
        let start = capacity.finger_start(owner.position(), i);
        membership.successor_of(start).unwrap_or(owner)
    }

    /// Immediate ring successor (entry 0).
    pub fn successor(&self) -> NodeId {
        self.entries.first().copied().unwrap_or(self.owner)
    }

    pub fn entries(&self) -> &[NodeId] {
        &self.entries
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains(&id)
    }
}

/// Operator-facing rendering, one line per entry.
impl fmt::Display for FingerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Finger table for node {} with m: {}", self.owner, self.entries.len())?;
        writeln!(f, "-------------------------------------------")?;
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "Entry {} | related node = {}", i, entry)?;
        }
        Ok(())
    }
}
