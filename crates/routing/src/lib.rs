//! Routing layer of a ring node.
//!
//! Builds on [`corelib`]'s pure ring view and adds everything that talks to
//! other nodes: the fault-tolerant action router, read-only lookup, the
//! controlled-leave protocol and the [`Transport`] seam those run over.

pub mod error;
pub mod leave;
pub mod lookup;
pub mod memory;
pub mod node;
pub mod protocol;
pub mod router;
pub mod service;
pub mod store;
pub mod transport;

pub use error::{ErrorKind, Result, RouteError, MAX_FORWARD_HOPS, MAX_ROUTING_RETRIES};
pub use leave::LeaveReport;
pub use memory::MemoryNetwork;
pub use node::{ChordNode, NodeBuilder};
pub use protocol::{
    ActionOutcome, RemoteError, Reply, Request, Response, RingSummary, RoutedAction,
};
pub use store::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use transport::Transport;
