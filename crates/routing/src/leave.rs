//! Controlled leave: hand owned blobs to the successor, then flood a leave
//! notice around the ring.

use crate::error::{Result, RouteError, MAX_ROUTING_RETRIES};
use crate::node::ChordNode;
use crate::protocol::{Request, RoutedAction};
use corelib::{LeavePropagation, NodeId};
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// What a controlled leave managed to do.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeaveReport {
    /// Blobs re-homed through the router.
    pub handed_off: Vec<String>,
    /// Blobs that could not be re-homed, with the reason.
    pub failed: Vec<(String, String)>,
    /// First peer that acknowledged the leave notice.
    pub notified: Option<NodeId>,
}

impl fmt::Display for LeaveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handed off {} file(s), {} failed",
            self.handed_off.len(),
            self.failed.len()
        )?;
        match self.notified {
            Some(peer) => write!(f, ", leave notice accepted by node {peer}"),
            None => write!(f, ", no peer notified"),
        }
    }
}

impl ChordNode {
    /// Leave the ring.
    ///
    /// Owned blobs are pushed to their post-leave owner first, then the leave
    /// notice goes to the successor. Local copies are kept. From the moment
    /// the leave starts, writes that would land on this node are rejected
    /// with [`RouteError::LeaveInProgress`]; a blob with no live peer to take
    /// it is reported in [`LeaveReport::failed`]. Once the first hop
    /// acknowledged the notice the shutdown signal fires. A second request on
    /// the same node fails with [`RouteError::LeaveInProgress`].
    pub async fn request_leave(&self) -> Result<LeaveReport> {
        if self.leaving.swap(true, Ordering::SeqCst) {
            return Err(RouteError::LeaveInProgress(self.id));
        }
        tracing::info!(node = %self.id, "controlled leave requested");

        let mut report = LeaveReport::default();
        if self.successor() == self.id {
            tracing::warn!(node = %self.id, "sole ring member, leaving without handoff");
            self.shutdown.send_replace(true);
            return Ok(report);
        }

        if let Err(err) = self.hand_off(&mut report).await {
            self.leaving.store(false, Ordering::SeqCst);
            tracing::error!(node = %self.id, error = %err, "could not enumerate owned files, leave aborted");
            return Err(err);
        }
        report.notified = self.announce_leave().await;

        tracing::info!(node = %self.id, report = %report, "left the ring");
        self.shutdown.send_replace(true);
        Ok(report)
    }

    async fn hand_off(&self, report: &mut LeaveReport) -> Result<()> {
        let names = self.owned_names().await?;
        tracing::info!(node = %self.id, count = names.len(), "handing off owned files");

        for name in names {
            let content = match self.blobs.get(&name).await {
                Ok(Some(content)) => content,
                Ok(None) => continue,
                Err(err) => {
                    report.failed.push((name, err.to_string()));
                    continue;
                }
            };
            let key = self.key_for(&name);
            let action = RoutedAction::Store {
                name: name.clone(),
                content,
            };
            match self.route(key, action, vec![self.id], 0).await {
                Ok(_) => {
                    tracing::debug!(node = %self.id, name = %name, key = %key, "handed off");
                    report.handed_off.push(name);
                }
                Err(err) => {
                    tracing::warn!(node = %self.id, name = %name, error = %err, "handoff failed");
                    report.failed.push((name, err.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Send the first leave notice, skipping successors that turn out dead.
    async fn announce_leave(&self) -> Option<NodeId> {
        let mut attempts: u32 = 0;
        loop {
            let successor = self.successor();
            if successor == self.id || attempts > MAX_ROUTING_RETRIES {
                tracing::warn!(node = %self.id, attempts, "no live successor for the leave notice");
                return None;
            }
            let request = Request::NotifyLeave {
                leaving: self.id,
                origin: self.id,
            };
            match self.transport.call(successor, request).await {
                Ok(_) => return Some(successor),
                Err(err) if err.is_unreachable() => {
                    tracing::warn!(node = %self.id, peer = %successor, "successor unreachable during leave");
                    self.remove_node(successor);
                    attempts += 1;
                }
                Err(err) => {
                    tracing::warn!(node = %self.id, peer = %successor, error = %err, "leave notice rejected");
                    return None;
                }
            }
        }
    }

    /// Handle an inbound leave notice.
    ///
    /// The local transition happens before this returns; the relay to the
    /// next node runs in the background so the sender is not held up by the
    /// rest of the ring.
    pub async fn notify_leave(self: &Arc<Self>, leaving: NodeId, origin: NodeId) -> Result<()> {
        metrics::counter!("chord_leave_notices_total").increment(1);
        let propagation = self.state.lock().absorb_leave_notice(leaving, origin);
        tracing::info!(
            node = %self.id,
            leaving = %leaving,
            origin = %origin,
            propagation = ?propagation,
            "processed leave notice"
        );

        if let LeavePropagation::Forward { to, origin } = propagation {
            let node = Arc::clone(self);
            tokio::spawn(async move {
                node.relay_leave_notice(leaving, origin, to).await;
            });
        }
        Ok(())
    }

    async fn relay_leave_notice(&self, leaving: NodeId, origin: NodeId, mut to: NodeId) {
        for _ in 0..=MAX_ROUTING_RETRIES {
            match self.transport.call(to, Request::NotifyLeave { leaving, origin }).await {
                Ok(_) => return,
                Err(err) if err.is_unreachable() => {
                    tracing::warn!(node = %self.id, peer = %to, leaving = %leaving, "leave relay hop unreachable");
                    self.remove_node(to);
                    let next = self.successor();
                    if next == origin || next == self.id {
                        return;
                    }
                    to = next;
                }
                Err(err) => {
                    tracing::warn!(node = %self.id, peer = %to, error = %err, "leave relay failed");
                    return;
                }
            }
        }
        tracing::error!(node = %self.id, leaving = %leaving, "gave up relaying leave notice");
    }
}
