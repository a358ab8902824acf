//! Per-node ring view: identity, membership, predecessor and fingers.
//!
//! [`NodeState`] is the one piece of mutable routing state a node owns. Its
//! only mutators are [`NodeState::remove_node`] and
//! [`NodeState::absorb_leave_notice`]; everything else is a read used to pick
//! the next hop. Callers are expected to keep it behind a single lock so a
//! routing decision never sees a half-repaired view.

use crate::error::{Error, Result};
use crate::finger::FingerTable;
use crate::node::{Key, NodeId};
use crate::ring::{in_interval, in_open_interval, Membership, RingCapacity};
use std::collections::BTreeSet;

/// Where a request for some key should go next.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Hop {
    /// This node is responsible; execute here.
    Local,
    /// Forward the whole request to this peer.
    Forward(NodeId),
    /// This node is excluded and every other member is too.
    Stranded,
}

/// Outcome of processing a leave notice.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LeavePropagation {
    /// Relay `(leaving, origin)` to `to`.
    Forward { to: NodeId, origin: NodeId },
    /// The flood ends here.
    Stop,
}

#[derive(Clone, Debug)]
pub struct NodeState {
    id: NodeId,
    capacity: RingCapacity,
    membership: Membership,
    predecessor: NodeId,
    fingers: FingerTable,
    /// Leaving ids whose notice this node has already relayed.
    relayed_leaves: BTreeSet<NodeId>,
    /// Peers this view dropped, whether dead or departed.
    removed: BTreeSet<NodeId>,
}

impl NodeState {
    /// Create the view from the static seed list. `id` must be in `seed`.
    pub fn new<I>(id: NodeId, capacity: RingCapacity, seed: I) -> Result<Self>
    where
        I: IntoIterator<Item = NodeId>,
    {
        if !capacity.contains(id.position()) {
            return Err(Error::NodeOutOfRange {
                id,
                capacity: capacity.get(),
            });
        }
        let membership = Membership::from_seed(seed, capacity)?;
        if !membership.contains(id) {
            return Err(Error::NotAMember(id));
        }
        let predecessor = membership.predecessor_of(id).unwrap_or(id);
        let fingers = FingerTable::build(id, capacity, &membership);
        Ok(Self {
            id,
            capacity,
            membership,
            predecessor,
            fingers,
            relayed_leaves: BTreeSet::new(),
            removed: BTreeSet::new(),
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn capacity(&self) -> RingCapacity {
        self.capacity
    }

    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    pub fn predecessor(&self) -> NodeId {
        self.predecessor
    }

    pub fn successor(&self) -> NodeId {
        self.fingers.successor()
    }

    pub fn fingers(&self) -> &FingerTable {
        &self.fingers
    }

    /// Seed members no longer in the view.
    pub fn removed(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.removed.iter().copied()
    }

    /// True if `key` falls in `(predecessor, self]`.
    pub fn is_responsible(&self, key: Key) -> bool {
        in_interval(key.position(), self.predecessor.position(), self.id.position())
    }

    /// Responsibility as it will be once every id in `excluded` is gone.
    ///
    /// An excluded node is never responsible. The view is not mutated.
    pub fn is_responsible_excluding(&self, key: Key, excluded: &[NodeId]) -> bool {
        if excluded.contains(&self.id) {
            return false;
        }
        let predecessor = self.membership.predecessor_excluding(self.id, excluded);
        in_interval(key.position(), predecessor.position(), self.id.position())
    }

    /// Largest-stride finger strictly between self and `key`, or self if no
    /// finger makes progress.
    pub fn closest_preceding_finger(&self, key: Key) -> NodeId {
        self.closest_preceding_finger_excluding(key, &[])
    }

    fn closest_preceding_finger_excluding(&self, key: Key, excluded: &[NodeId]) -> NodeId {
        self.fingers
            .entries()
            .iter()
            .rev()
            .filter(|f| !excluded.contains(*f))
            .find(|f| in_open_interval(f.position(), self.id.position(), key.position()))
            .copied()
            .unwrap_or(self.id)
    }

    /// Pick the next hop for `key`, treating every id in `excluded` as
    /// already gone. Never forwards to an excluded id.
    pub fn next_hop(&self, key: Key, excluded: &[NodeId]) -> Hop {
        let successor = self.membership.successor_excluding(self.id, excluded);
        if excluded.contains(&self.id) {
            return if successor == self.id {
                Hop::Stranded
            } else {
                Hop::Forward(successor)
            };
        }
        if self.is_responsible_excluding(key, excluded) {
            return Hop::Local;
        }
        if in_interval(key.position(), self.id.position(), successor.position()) {
            return Hop::Forward(successor);
        }
        let next = self.closest_preceding_finger_excluding(key, excluded);
        if next == self.id {
            Hop::Forward(successor)
        } else {
            Hop::Forward(next)
        }
    }

    /// Drop `id` from the view, recompute the predecessor and repair fingers.
    ///
    /// Idempotent. Returns true if the membership actually shrank. Removing
    /// self is refused.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if id == self.id {
            tracing::warn!(node = %self.id, "refusing to remove self from membership");
            return false;
        }
        let removed = self.membership.remove(id);
        self.predecessor = self.membership.predecessor_of(self.id).unwrap_or(self.id);
        let repaired = self.fingers.repair(id, &self.membership);
        if removed {
            self.removed.insert(id);
            tracing::info!(
                node = %self.id,
                removed = %id,
                predecessor = %self.predecessor,
                successor = %self.successor(),
                repaired_fingers = ?repaired,
                "removed peer from membership"
            );
        }
        removed
    }

    /// Apply a leave notice `(leaving, origin)` and decide whether to relay it.
    ///
    /// The first receiver rewrites `origin` to itself. The flood stops once the
    /// post-repair successor is the origin, or when this node already relayed
    /// a notice for `leaving`. `leaving` is removed in every case.
    pub fn absorb_leave_notice(&mut self, leaving: NodeId, origin: NodeId) -> LeavePropagation {
        if leaving == self.id {
            return LeavePropagation::Stop;
        }
        let first_relay = self.relayed_leaves.insert(leaving);
        let origin = if origin == leaving { self.id } else { origin };
        self.remove_node(leaving);
        if !first_relay {
            return LeavePropagation::Stop;
        }
        let next = self.successor();
        if next == origin || next == self.id {
            LeavePropagation::Stop
        } else {
            LeavePropagation::Forward { to: next, origin }
        }
    }
}
