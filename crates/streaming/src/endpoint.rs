//! Where to find a peer on the network.

use crate::error::{Result, StreamingError};
use corelib::NodeId;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub enum PeerDirectory {
    /// Every peer is reachable at `{prefix}{id}:{port}`.
    Template { prefix: String, port: u16 },
    /// Explicit `host:port` per peer.
    Static(HashMap<NodeId, String>),
}

impl PeerDirectory {
    pub fn template(prefix: impl Into<String>, port: u16) -> Self {
        PeerDirectory::Template {
            prefix: prefix.into(),
            port,
        }
    }

    pub fn address(&self, peer: NodeId) -> Result<String> {
        match self {
            PeerDirectory::Template { prefix, port } => Ok(format!("{prefix}{peer}:{port}")),
            PeerDirectory::Static(addresses) => addresses
                .get(&peer)
                .cloned()
                .ok_or(StreamingError::UnknownPeer(peer)),
        }
    }
}
