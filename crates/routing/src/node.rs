//! A running ring node.
//!
//! [`ChordNode`] ties the ring view to its collaborators: the partitioner that
//! names keys, the local blob store and the transport used to reach peers.
//! The ring view lives behind one mutex and is only ever touched through
//! short, non-async critical sections.

use crate::error::{Result, RouteError};
use crate::protocol::{ActionOutcome, RingSummary, RoutedAction};
use crate::store::{validate_name, BlobStore, MemoryBlobStore};
use crate::transport::Transport;
use corelib::partitioner::Blake3Partitioner;
use corelib::{Key, NodeId, NodeState, Partitioner, RingCapacity};
use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::watch;

pub struct ChordNode {
    pub(crate) id: NodeId,
    pub(crate) capacity: RingCapacity,
    pub(crate) state: Mutex<NodeState>,
    pub(crate) partitioner: Arc<dyn Partitioner>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) leaving: AtomicBool,
    pub(crate) shutdown: watch::Sender<bool>,
}

/// Builder for [`ChordNode`]. A transport is mandatory; the partitioner
/// defaults to BLAKE3 and the store to an in-memory one.
pub struct NodeBuilder {
    state: NodeState,
    partitioner: Arc<dyn Partitioner>,
    blobs: Arc<dyn BlobStore>,
    transport: Option<Arc<dyn Transport>>,
}

impl NodeBuilder {
    pub fn partitioner(mut self, partitioner: Arc<dyn Partitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = blobs;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Arc<ChordNode>> {
        let transport = self
            .transport
            .ok_or_else(|| RouteError::Generic("node built without a transport".into()))?;
        let (shutdown, _) = watch::channel(false);
        Ok(Arc::new(ChordNode {
            id: self.state.id(),
            capacity: self.state.capacity(),
            state: Mutex::new(self.state),
            partitioner: self.partitioner,
            blobs: self.blobs,
            transport,
            leaving: AtomicBool::new(false),
            shutdown,
        }))
    }
}

impl ChordNode {
    pub fn builder(state: NodeState) -> NodeBuilder {
        NodeBuilder {
            state,
            partitioner: Arc::new(Blake3Partitioner),
            blobs: Arc::new(MemoryBlobStore::new()),
            transport: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn capacity(&self) -> RingCapacity {
        self.capacity
    }

    /// Copy of the current ring view.
    pub fn snapshot(&self) -> NodeState {
        self.state.lock().clone()
    }

    pub fn membership(&self) -> Vec<NodeId> {
        self.state.lock().membership().ids().to_vec()
    }

    pub fn successor(&self) -> NodeId {
        self.state.lock().successor()
    }

    pub fn predecessor(&self) -> NodeId {
        self.state.lock().predecessor()
    }

    pub fn describe_finger_table(&self) -> String {
        self.state.lock().fingers().to_string()
    }

    pub fn ring_summary(&self) -> RingSummary {
        let state = self.state.lock();
        RingSummary {
            id: self.id,
            predecessor: state.predecessor(),
            successor: state.successor(),
            membership: state.membership().ids().to_vec(),
            fingers: state.fingers().entries().to_vec(),
        }
    }

    pub fn key_for(&self, name: &str) -> Key {
        self.partitioner.key_for(name.as_bytes(), self.capacity)
    }

    pub fn is_responsible(&self, key: Key) -> bool {
        self.state.lock().is_responsible(key)
    }

    /// Drop a peer from the ring view and repair fingers.
    pub fn remove_node(&self, peer: NodeId) -> bool {
        self.state.lock().remove_node(peer)
    }

    /// True once a controlled leave has completed.
    pub fn has_left(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Fires `true` after a controlled leave.
    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Names in the local store whose key this node currently owns.
    pub async fn owned_names(&self) -> Result<Vec<String>> {
        let keyed: Vec<(String, Key)> = self
            .blobs
            .names()
            .await?
            .into_iter()
            .map(|name| {
                let key = self.key_for(&name);
                (name, key)
            })
            .collect();
        let state = self.state.lock();
        Ok(keyed
            .into_iter()
            .filter(|(_, key)| state.is_responsible(*key))
            .map(|(name, _)| name)
            .collect())
    }

    /// Run `action` against the local store. Only the router calls this, and
    /// only once it has decided this node is responsible.
    pub(crate) async fn execute_local(&self, action: &RoutedAction) -> Result<ActionOutcome> {
        match action {
            RoutedAction::Resolve => Ok(ActionOutcome::Resolved(self.id)),
            RoutedAction::Fetch { name } => self
                .blobs
                .get(name)
                .await?
                .map(ActionOutcome::Content)
                .ok_or_else(|| RouteError::NotFound(name.clone())),
            RoutedAction::Store { name, content } => {
                self.blobs.put(name, content).await?;
                tracing::info!(node = %self.id, name = %name, "file saved");
                Ok(ActionOutcome::Stored)
            }
            RoutedAction::Update { name, content } => {
                let created = self.blobs.put(name, content).await?;
                tracing::info!(node = %self.id, name = %name, created, "file updated");
                Ok(ActionOutcome::Updated { created })
            }
            RoutedAction::Delete { name } => {
                if self.blobs.delete(name).await? {
                    tracing::info!(node = %self.id, name = %name, "file deleted");
                    Ok(ActionOutcome::Deleted)
                } else {
                    Err(RouteError::NotFound(name.clone()))
                }
            }
        }
    }

    pub async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        validate_name(name)?;
        let action = RoutedAction::Fetch {
            name: name.to_string(),
        };
        match self.route_to_responsible(self.key_for(name), action).await? {
            ActionOutcome::Content(bytes) => Ok(bytes),
            other => Err(unexpected(other)),
        }
    }

    pub async fn store(&self, name: &str, content: Vec<u8>) -> Result<()> {
        validate_name(name)?;
        let action = RoutedAction::Store {
            name: name.to_string(),
            content,
        };
        match self.route_to_responsible(self.key_for(name), action).await? {
            ActionOutcome::Stored => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Overwrite or create. Returns true if the blob did not exist.
    pub async fn update(&self, name: &str, content: Vec<u8>) -> Result<bool> {
        validate_name(name)?;
        let action = RoutedAction::Update {
            name: name.to_string(),
            content,
        };
        match self.route_to_responsible(self.key_for(name), action).await? {
            ActionOutcome::Updated { created } => Ok(created),
            other => Err(unexpected(other)),
        }
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let action = RoutedAction::Delete {
            name: name.to_string(),
        };
        match self.route_to_responsible(self.key_for(name), action).await? {
            ActionOutcome::Deleted => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(outcome: ActionOutcome) -> RouteError {
    RouteError::Generic(format!("unexpected action outcome {outcome:?}"))
}

impl std::fmt::Debug for ChordNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChordNode")
            .field("id", &self.id)
            .field("capacity", &self.capacity.get())
            .field("partitioner", &self.partitioner.name())
            .finish()
    }
}
