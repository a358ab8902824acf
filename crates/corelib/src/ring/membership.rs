//! Sorted view of the peers a node currently believes alive.

use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::ring::capacity::RingCapacity;

/// Known peers, sorted ascending and deduplicated.
///
/// Seeded once from the static cluster list and only ever shrinks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Membership {
    ids: Vec<NodeId>,
}

impl Membership {
    /// Build from a seed list, validating every id against the capacity.
    pub fn from_seed<I>(seed: I, capacity: RingCapacity) -> Result<Self>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut ids = Vec::new();
        for id in seed {
            if !capacity.contains(id.position()) {
                return Err(Error::NodeOutOfRange {
                    id,
                    capacity: capacity.get(),
                });
            }
            ids.push(id);
        }
        ids.sort_unstable();
        ids.dedup();
        Ok(Self { ids })
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Drop `id`. Returns false if it was not a member.
    pub fn remove(&mut self, id: NodeId) -> bool {
        match self.ids.binary_search(&id) {
            Ok(idx) => {
                self.ids.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    /// First member at or after `target`, wrapping to the smallest member.
    ///
    /// Returns `None` only for an empty membership.
    pub fn successor_of(&self, target: u64) -> Option<NodeId> {
        let idx = self.ids.partition_point(|id| id.position() < target);
        self.ids.get(idx).or_else(|| self.ids.first()).copied()
    }

    /// Member immediately before `id`, wrapping to the largest member.
    ///
    /// `id` need not be a member itself.
    pub fn predecessor_of(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.ids.partition_point(|x| *x < id);
        if idx == 0 {
            self.ids.last().copied()
        } else {
            self.ids.get(idx - 1).copied()
        }
    }

    /// Like [`predecessor_of`](Self::predecessor_of), as if every id in
    /// `excluded` had already been removed. Falls back to `id` itself when
    /// nothing else is left.
    pub fn predecessor_excluding(&self, id: NodeId, excluded: &[NodeId]) -> NodeId {
        let before = self.ids.iter().rev().find(|x| **x < id && !excluded.contains(*x));
        let wrapped = || self.ids.iter().rev().find(|x| !excluded.contains(*x));
        before.or_else(wrapped).copied().unwrap_or(id)
    }

    /// Member immediately after `id` that is not in `excluded`, wrapping to
    /// the smallest such member. Falls back to `id` itself when nothing else
    /// is left.
    pub fn successor_excluding(&self, id: NodeId, excluded: &[NodeId]) -> NodeId {
        let after = self.ids.iter().find(|x| **x > id && !excluded.contains(*x));
        let wrapped = || self.ids.iter().find(|x| !excluded.contains(*x));
        after.or_else(wrapped).copied().unwrap_or(id)
    }
}
