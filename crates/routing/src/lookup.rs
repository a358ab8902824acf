//! Read-only ownership lookup.

use crate::error::{Result, RouteError};
use crate::node::ChordNode;
use crate::protocol::{Request, Response};
use corelib::ring::in_interval;
use corelib::{Key, NodeId};

impl ChordNode {
    /// Find the node responsible for `key`.
    ///
    /// Unlike the action router this never repairs the ring view: a remote
    /// failure is returned to the caller as is.
    pub async fn lookup(&self, key: Key) -> Result<NodeId> {
        let next = {
            let state = self.state.lock();
            if state.is_responsible(key) {
                return Ok(self.id);
            }
            let successor = state.successor();
            if in_interval(key.position(), self.id.position(), successor.position()) {
                return Ok(successor);
            }
            let next = state.closest_preceding_finger(key);
            if next == self.id {
                return Ok(successor);
            }
            next
        };

        tracing::debug!(node = %self.id, key = %key, peer = %next, "delegating lookup");
        match self.transport.call(next, Request::Resolve { key }).await {
            Ok(Response::Node(owner)) => Ok(owner),
            Ok(other) => Err(RouteError::Generic(format!(
                "node {next} answered lookup with {other:?}"
            ))),
            Err(err) => {
                tracing::warn!(node = %self.id, key = %key, peer = %next, error = %err, "remote lookup failed");
                Err(err)
            }
        }
    }
}
