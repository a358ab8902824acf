//! Inbound request dispatch.

use crate::error::Result;
use crate::node::ChordNode;
use crate::protocol::{Request, Response};
use std::sync::Arc;

impl ChordNode {
    /// Serve one request from a peer or an admin client.
    pub async fn handle(self: &Arc<Self>, request: Request) -> Result<Response> {
        tracing::trace!(node = %self.id, request = request.label(), "handling request");
        match request {
            Request::Resolve { key } => self.lookup(key).await.map(Response::Node),
            Request::Dispatch {
                key,
                action,
                excluded,
                hops,
            } => self
                .route(key, action, excluded, hops)
                .await
                .map(Response::Outcome),
            Request::Fetch { name } => self.fetch(&name).await.map(Response::Content),
            Request::Store { name, content } => {
                self.store(&name, content).await.map(|()| Response::Ack)
            }
            Request::Update { name, content } => {
                self.update(&name, content).await.map(Response::Created)
            }
            Request::Delete { name } => self.delete(&name).await.map(|()| Response::Ack),
            Request::GetNodeId => Ok(Response::Node(self.id)),
            Request::RequestLeave => self
                .request_leave()
                .await
                .map(|report| Response::Text(report.to_string())),
            Request::NotifyLeave { leaving, origin } => self
                .notify_leave(leaving, origin)
                .await
                .map(|()| Response::Ack),
            Request::DescribeFingerTable => Ok(Response::Text(self.describe_finger_table())),
            Request::DescribeRing => Ok(Response::Ring(self.ring_summary())),
        }
    }
}
