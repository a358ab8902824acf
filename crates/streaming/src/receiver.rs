//! Server side: accept connections and feed calls to the local node.

use crate::codec::{read_message, write_message};
use crate::error::{Result, StreamingError};
use crate::protocol::Message;
use routing::{ChordNode, RemoteError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::task::JoinSet;

/// How long open connections may finish after shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

pub struct StreamReceiver {
    listener: TcpListener,
    node: Arc<ChordNode>,
    grace: Duration,
}

impl StreamReceiver {
    pub async fn bind(addr: impl ToSocketAddrs, node: Arc<ChordNode>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, node))
    }

    pub fn from_listener(listener: TcpListener, node: Arc<ChordNode>) -> Self {
        Self {
            listener,
            node,
            grace: SHUTDOWN_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the node has left the ring.
    pub async fn run(self) -> Result<()> {
        let StreamReceiver {
            listener,
            node,
            grace,
        } = self;
        let mut shutdown = node.subscribe_shutdown();
        let mut connections = JoinSet::new();
        tracing::info!(node = %node.id(), addr = ?listener.local_addr().ok(), "accepting connections");

        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let node = Arc::clone(&node);
                        connections.spawn(async move {
                            if let Err(err) = serve_connection(&node, stream).await {
                                tracing::debug!(node = %node.id(), remote = %remote, error = %err, "connection ended with error");
                            }
                        });
                    }
                    Err(err) => tracing::warn!(node = %node.id(), error = %err, "accept failed"),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        drop(listener);
        tracing::info!(node = %node.id(), open = connections.len(), "shutting down server");
        let drained = tokio::time::timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(node = %node.id(), "aborting connections still open after grace period");
            connections.abort_all();
        }
        Ok(())
    }
}

/// Answer calls on one connection until the peer hangs up or the node has
/// left. A call that arrives after the leave is dropped unanswered, which
/// the caller sees as a closed connection.
async fn serve_connection(node: &Arc<ChordNode>, mut stream: TcpStream) -> Result<()> {
    stream.set_nodelay(true)?;
    while let Some(message) = read_message(&mut stream).await? {
        if node.has_left() {
            tracing::debug!(node = %node.id(), "node has left, closing connection");
            break;
        }
        let request = match message {
            Message::Call(request) => request,
            other => return Err(StreamingError::Unexpected(other.label())),
        };
        let reply = node
            .handle(request)
            .await
            .map_err(|err| RemoteError::from(&err));
        write_message(&mut stream, &Message::Reply(reply)).await?;
        if node.has_left() {
            break;
        }
    }
    Ok(())
}
