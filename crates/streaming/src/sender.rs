//! Client side: one TCP connection per call.

use crate::codec::{read_message, write_message};
use crate::endpoint::PeerDirectory;
use crate::error::{Result, StreamingError};
use crate::protocol::Message;
use async_trait::async_trait;
use corelib::NodeId;
use routing::{Reply, Request, Response, RouteError, Transport};
use std::time::Duration;
use tokio::net::TcpStream;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct StreamSender {
    connect_timeout: Duration,
    reply_timeout: Duration,
}

impl Default for StreamSender {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT, DEFAULT_REPLY_TIMEOUT)
    }
}

impl StreamSender {
    pub fn new(connect_timeout: Duration, reply_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            reply_timeout,
        }
    }

    /// Send one request to `addr` and wait for its reply.
    ///
    /// Connecting and writing the request share the connect timeout and fail
    /// with [`StreamingError::Timeout`]. Waiting for the reply uses the reply
    /// timeout and fails with [`StreamingError::ReplyTimeout`].
    pub async fn call(&self, addr: &str, request: Request) -> Result<Reply> {
        let mut stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| StreamingError::Timeout(self.connect_timeout))??;
        stream.set_nodelay(true)?;

        let call = Message::Call(request);
        tokio::time::timeout(self.connect_timeout, write_message(&mut stream, &call))
            .await
            .map_err(|_| StreamingError::Timeout(self.connect_timeout))??;

        tokio::time::timeout(self.reply_timeout, await_reply(&mut stream))
            .await
            .map_err(|_| StreamingError::ReplyTimeout(self.reply_timeout))?
    }
}

async fn await_reply(stream: &mut TcpStream) -> Result<Reply> {
    match read_message(stream).await? {
        Some(Message::Reply(reply)) => Ok(reply),
        Some(other) => Err(StreamingError::Unexpected(other.label())),
        None => Err(StreamingError::Closed),
    }
}

/// [`Transport`] over TCP.
///
/// A peer that cannot be connected to, or that drops the connection, is
/// unreachable. A peer that took the request but answered too slowly is
/// alive: that is a generic failure and never costs the peer its membership.
/// Errors the peer itself returned are passed through.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    directory: PeerDirectory,
    sender: StreamSender,
}

impl TcpTransport {
    pub fn new(directory: PeerDirectory, sender: StreamSender) -> Self {
        Self { directory, sender }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn call(&self, peer: NodeId, request: Request) -> routing::Result<Response> {
        let addr = self
            .directory
            .address(peer)
            .map_err(|err| RouteError::unreachable(peer, err))?;
        let label = request.label();
        match self.sender.call(&addr, request).await {
            Ok(reply) => reply.map_err(RouteError::from),
            Err(err @ StreamingError::ReplyTimeout(_)) => {
                tracing::warn!(peer = %peer, addr = %addr, request = label, error = %err, "peer too slow to reply");
                Err(RouteError::Generic(format!("node {peer}: {err}")))
            }
            Err(err) => {
                tracing::debug!(peer = %peer, addr = %addr, request = label, error = %err, "call failed");
                Err(RouteError::unreachable(peer, err))
            }
        }
    }
}
