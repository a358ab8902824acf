//! Action router: run an operation at whoever owns a key.
//!
//! The router re-evaluates its decision after every dead hop instead of
//! resending to the same target. It runs as a loop, so the stack stays flat
//! and the retry ceiling is a plain counter.
//!
//! Each forwarded request carries the peers known to be gone: a leaving
//! sender, the dead hops met on the way and the ones this node already
//! dropped. Receivers decide responsibility as if those were removed, which
//! keeps a stale predecessor from bouncing the request around the ring.
//! [`MAX_FORWARD_HOPS`] bounds the path regardless.

use crate::error::{ErrorKind, Result, RouteError, MAX_FORWARD_HOPS, MAX_ROUTING_RETRIES};
use crate::node::ChordNode;
use crate::protocol::{ActionOutcome, Request, Response, RoutedAction};
use corelib::{Hop, Key, NodeId};
use std::sync::atomic::Ordering;

impl ChordNode {
    /// Execute `action` at the node currently believed responsible for `key`.
    ///
    /// A single call executes the action at most once. Callers that retry on
    /// failure get at-least-once semantics, so actions must be idempotent per
    /// name.
    pub async fn route_to_responsible(&self, key: Key, action: RoutedAction) -> Result<ActionOutcome> {
        self.route(key, action, Vec::new(), 0).await
    }

    pub(crate) async fn route(
        &self,
        key: Key,
        action: RoutedAction,
        mut excluded: Vec<NodeId>,
        hops: u32,
    ) -> Result<ActionOutcome> {
        if hops > MAX_FORWARD_HOPS {
            metrics::counter!("chord_route_hop_limit_total").increment(1);
            tracing::error!(
                node = %self.id,
                key = %key,
                hops,
                action = action.label(),
                excluded = ?excluded,
                "forward limit exceeded"
            );
            return Err(RouteError::HopLimit { key, hops });
        }
        for gone in self.state.lock().removed() {
            if !excluded.contains(&gone) {
                excluded.push(gone);
            }
        }

        let mut depth: u32 = 0;
        let mut dead_hops: Vec<NodeId> = Vec::new();

        loop {
            if depth > MAX_ROUTING_RETRIES {
                metrics::counter!("chord_route_retry_exhausted_total").increment(1);
                tracing::error!(
                    node = %self.id,
                    key = %key,
                    action = action.label(),
                    dead_hops = ?dead_hops,
                    "max routing retries exceeded"
                );
                return Err(RouteError::RetryExhausted {
                    key,
                    attempts: depth,
                    dead_hops,
                });
            }

            let hop = self.state.lock().next_hop(key, &excluded);
            let peer = match hop {
                Hop::Local if action.is_write() && self.leaving.load(Ordering::SeqCst) => {
                    tracing::warn!(node = %self.id, key = %key, action = action.label(), "rejecting write while leaving");
                    return Err(RouteError::LeaveInProgress(self.id));
                }
                Hop::Local => {
                    tracing::debug!(node = %self.id, key = %key, action = action.label(), "executing locally");
                    return self.execute_local(&action).await;
                }
                Hop::Forward(peer) => peer,
                Hop::Stranded => {
                    tracing::warn!(node = %self.id, key = %key, excluded = ?excluded, "no live peer left for key");
                    return Err(RouteError::Stranded(key));
                }
            };

            tracing::debug!(
                node = %self.id,
                key = %key,
                peer = %peer,
                depth,
                hops,
                action = action.label(),
                "forwarding to next hop"
            );
            metrics::counter!("chord_route_forwards_total").increment(1);

            let request = Request::Dispatch {
                key,
                action: action.clone(),
                excluded: excluded.clone(),
                hops: hops + 1,
            };
            let err = match self.transport.call(peer, request).await {
                Ok(Response::Outcome(outcome)) => return Ok(outcome),
                Ok(other) => {
                    return Err(RouteError::Generic(format!(
                        "node {peer} answered dispatch with {other:?}"
                    )))
                }
                Err(err) => err,
            };

            match err.kind() {
                ErrorKind::Unreachable => {
                    tracing::warn!(
                        node = %self.id,
                        peer = %peer,
                        key = %key,
                        depth,
                        error = %err,
                        "next hop unreachable, removing it and retrying"
                    );
                    metrics::counter!("chord_route_repairs_total").increment(1);
                    self.remove_node(peer);
                    dead_hops.push(peer);
                    excluded.push(peer);
                    depth += 1;
                }
                ErrorKind::NotFound | ErrorKind::RetryExhausted => return Err(err),
                ErrorKind::Generic => {
                    return Err(RouteError::Generic(format!(
                        "{} via node {peer} failed: {err}",
                        action.label()
                    )))
                }
            }
        }
    }
}
