//! Remote-call seam between nodes.

use crate::error::Result;
use crate::protocol::Request;
use crate::protocol::Response;
use async_trait::async_trait;
use corelib::NodeId;

/// Carries a [`Request`] to a peer and returns its [`Response`].
///
/// Implementations must report connection, I/O and timeout failures as
/// [`RouteError::Unreachable`](crate::RouteError::Unreachable) for `peer`, and
/// translate errors returned by the peer through
/// [`RemoteError`](crate::protocol::RemoteError).
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn call(&self, peer: NodeId, request: Request) -> Result<Response>;
}
