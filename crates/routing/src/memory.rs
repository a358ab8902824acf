//! In-process transport connecting nodes of one ring.
//!
//! Used by tests and local simulations. Peers can be taken down to simulate
//! crashes; a node that finished a controlled leave is unreachable as well.

use crate::error::{Result, RouteError};
use crate::node::ChordNode;
use crate::protocol::{RemoteError, Request, Response};
use crate::transport::Transport;
use async_trait::async_trait;
use corelib::NodeId;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
pub struct MemoryNetwork {
    nodes: DashMap<NodeId, Arc<ChordNode>>,
    down: DashSet<NodeId>,
    calls: Mutex<Vec<(NodeId, Request)>>,
}

impl MemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, node: Arc<ChordNode>) {
        self.nodes.insert(node.id(), node);
    }

    pub fn node(&self, id: NodeId) -> Option<Arc<ChordNode>> {
        self.nodes.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Make `id` unreachable, as if its process crashed.
    pub fn take_down(&self, id: NodeId) {
        self.down.insert(id);
    }

    /// Undo [`take_down`](Self::take_down), as if a partition healed.
    pub fn bring_up(&self, id: NodeId) {
        self.down.remove(&id);
    }

    /// Every call attempted so far, reachable or not, in order.
    pub fn calls(&self) -> Vec<(NodeId, Request)> {
        self.calls.lock().clone()
    }

    /// Number of attempted calls to `peer` with the given request label.
    pub fn calls_to(&self, peer: NodeId, label: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(to, request)| *to == peer && request.label() == label)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl Transport for MemoryNetwork {
    async fn call(&self, peer: NodeId, request: Request) -> Result<Response> {
        self.calls.lock().push((peer, request.clone()));
        let node = match self.node(peer) {
            Some(node) if !self.down.contains(&peer) && !node.has_left() => node,
            _ => return Err(RouteError::unreachable(peer, "connection refused")),
        };
        node.handle(request)
            .await
            .map_err(|err| RouteError::from(RemoteError::from(&err)))
    }
}
