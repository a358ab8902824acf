//! Node-to-node operations.
//!
//! Work travels as data, never as code: a [`RoutedAction`] is a closed set of
//! operations the responsible node knows how to run against its own store.

use crate::error::RouteError;
use corelib::{Key, NodeId};
use serde::{Deserialize, Serialize};

/// Operation to perform at whichever node owns a key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutedAction {
    /// Report which node executed the action.
    Resolve,
    Fetch { name: String },
    Store { name: String, content: Vec<u8> },
    Update { name: String, content: Vec<u8> },
    Delete { name: String },
}

impl RoutedAction {
    /// True for actions that change the store.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            RoutedAction::Store { .. } | RoutedAction::Update { .. } | RoutedAction::Delete { .. }
        )
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RoutedAction::Resolve => "RESOLVE",
            RoutedAction::Fetch { .. } => "GET_FILE",
            RoutedAction::Store { .. } => "UPLOAD_FILE",
            RoutedAction::Update { .. } => "UPDATE_FILE",
            RoutedAction::Delete { .. } => "DELETE_FILE",
        }
    }
}

/// Result of a [`RoutedAction`] at the responsible node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Resolved(NodeId),
    Content(Vec<u8>),
    Stored,
    Updated { created: bool },
    Deleted,
}

/// Remote operations one node can invoke on another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Read-only lookup of the node owning `key`.
    Resolve { key: Key },
    /// Run `action` at the owner of `key`, forwarding as needed.
    Dispatch {
        key: Key,
        action: RoutedAction,
        /// Peers to treat as already gone: a leaving sender and every dead
        /// hop met so far. Never forwarded to.
        excluded: Vec<NodeId>,
        /// Forwards taken so far.
        hops: u32,
    },
    Fetch { name: String },
    Store { name: String, content: Vec<u8> },
    Update { name: String, content: Vec<u8> },
    Delete { name: String },
    GetNodeId,
    RequestLeave,
    NotifyLeave { leaving: NodeId, origin: NodeId },
    DescribeFingerTable,
    DescribeRing,
}

impl Request {
    pub fn label(&self) -> &'static str {
        match self {
            Request::Resolve { .. } => "resolve",
            Request::Dispatch { .. } => "dispatch",
            Request::Fetch { .. } => "fetch",
            Request::Store { .. } => "store",
            Request::Update { .. } => "update",
            Request::Delete { .. } => "delete",
            Request::GetNodeId => "get_node_id",
            Request::RequestLeave => "request_leave",
            Request::NotifyLeave { .. } => "notify_leave",
            Request::DescribeFingerTable => "describe_finger_table",
            Request::DescribeRing => "describe_ring",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Node(NodeId),
    Outcome(ActionOutcome),
    Content(Vec<u8>),
    Created(bool),
    Text(String),
    Ring(RingSummary),
    Ack,
}

/// One node's view of the ring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingSummary {
    pub id: NodeId,
    pub predecessor: NodeId,
    pub successor: NodeId,
    pub membership: Vec<NodeId>,
    pub fingers: Vec<NodeId>,
}

/// Error as it crosses the wire.
///
/// Has no unreachable variant: only the caller's own transport may report a
/// hop unreachable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteError {
    NotFound(String),
    RetryExhausted {
        key: Key,
        attempts: u32,
        dead_hops: Vec<NodeId>,
    },
    Generic(String),
}

impl From<&RouteError> for RemoteError {
    fn from(err: &RouteError) -> Self {
        match err {
            RouteError::NotFound(name) => RemoteError::NotFound(name.clone()),
            RouteError::RetryExhausted {
                key,
                attempts,
                dead_hops,
            } => RemoteError::RetryExhausted {
                key: *key,
                attempts: *attempts,
                dead_hops: dead_hops.clone(),
            },
            other => RemoteError::Generic(other.to_string()),
        }
    }
}

impl From<RemoteError> for RouteError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(name) => RouteError::NotFound(name),
            RemoteError::RetryExhausted {
                key,
                attempts,
                dead_hops,
            } => RouteError::RetryExhausted {
                key,
                attempts,
                dead_hops,
            },
            RemoteError::Generic(msg) => RouteError::Generic(msg),
        }
    }
}

/// What a server writes back for one request.
pub type Reply = std::result::Result<Response, RemoteError>;
