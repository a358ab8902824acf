//! Multi-node tests over the in-process transport.
//!
//! # Test Strategy
//!
//! 1. **Routing**: forwarding reaches the owner and leaves views untouched
//! 2. **Repair**: dead hops are removed once and routing re-evaluates
//! 3. **Leave**: handoff re-homes owned blobs, the flood reaches every node once
//! 4. **Leave under failure**: handoff routes around dead peers, a leaving
//!    node refuses writes, a handoff with nowhere to go is reported

use corelib::partitioner::Partitioner;
use corelib::{Key, NodeId, NodeState, RingCapacity};
use async_trait::async_trait;
use routing::{
    ActionOutcome, BlobStore, ChordNode, ErrorKind, MemoryBlobStore, MemoryNetwork, Request,
    Response, RouteError, RoutedAction, Transport, MAX_FORWARD_HOPS, MAX_ROUTING_RETRIES,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Maps names like `k5` to key 5 so tests can place blobs precisely.
struct DigitPartitioner;

impl Partitioner for DigitPartitioner {
    fn digest(&self, name: &[u8]) -> Vec<u8> {
        let text = String::from_utf8_lossy(name);
        let digits = text.trim_start_matches(|c: char| !c.is_ascii_digit());
        digits.parse::<u64>().unwrap_or(0).to_be_bytes().to_vec()
    }

    fn name(&self) -> &'static str {
        "digits"
    }
}

/// Store whose listing blocks until `open` fires, holding a leave between
/// its start and the handoff.
#[derive(Default)]
struct GatedStore {
    inner: Arc<MemoryBlobStore>,
    entered: Notify,
    open: Notify,
}

#[async_trait]
impl BlobStore for GatedStore {
    async fn get(&self, name: &str) -> routing::Result<Option<Vec<u8>>> {
        self.inner.get(name).await
    }

    async fn put(&self, name: &str, content: &[u8]) -> routing::Result<bool> {
        self.inner.put(name, content).await
    }

    async fn delete(&self, name: &str) -> routing::Result<bool> {
        self.inner.delete(name).await
    }

    async fn names(&self) -> routing::Result<Vec<String>> {
        self.entered.notify_one();
        self.open.notified().await;
        self.inner.names().await
    }
}

struct Cluster {
    network: Arc<MemoryNetwork>,
    nodes: BTreeMap<u64, Arc<ChordNode>>,
    stores: BTreeMap<u64, Arc<MemoryBlobStore>>,
}

impl Cluster {
    fn new(capacity: u64, ids: &[u64]) -> Self {
        Self::build(capacity, ids, None)
    }

    /// Like [`Cluster::new`], with node `gated.0` backed by `gated.1`.
    fn build(capacity: u64, ids: &[u64], gated: Option<(u64, Arc<GatedStore>)>) -> Self {
        let capacity = RingCapacity::new(capacity).unwrap();
        let network = MemoryNetwork::new();
        let mut nodes = BTreeMap::new();
        let mut stores = BTreeMap::new();
        for id in ids {
            let state =
                NodeState::new(NodeId(*id), capacity, ids.iter().copied().map(NodeId)).unwrap();
            let (store, backing): (Arc<MemoryBlobStore>, Arc<dyn BlobStore>) = match &gated {
                Some((gated_id, gate)) if gated_id == id => {
                    (gate.inner.clone(), gate.clone() as Arc<dyn BlobStore>)
                }
                _ => {
                    let store = Arc::new(MemoryBlobStore::new());
                    (store.clone(), store as Arc<dyn BlobStore>)
                }
            };
            let node = ChordNode::builder(state)
                .partitioner(Arc::new(DigitPartitioner))
                .store(backing)
                .transport(network.clone())
                .build()
                .unwrap();
            network.register(node.clone());
            nodes.insert(*id, node);
            stores.insert(*id, store);
        }
        Self {
            network,
            nodes,
            stores,
        }
    }

    fn node(&self, id: u64) -> &Arc<ChordNode> {
        &self.nodes[&id]
    }

    fn members(&self, id: u64) -> Vec<u64> {
        self.node(id).membership().iter().map(|n| n.position()).collect()
    }

    /// Wait until no node other than `leaving` still lists it.
    async fn settle_leave(&self, leaving: u64) {
        for _ in 0..200 {
            let done = self
                .nodes
                .keys()
                .filter(|id| **id != leaving)
                .all(|id| !self.members(*id).contains(&leaving));
            if done {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("leave of node {leaving} never settled");
    }

    /// Wait until each of `ids` no longer lists `leaving`.
    async fn settle_leave_at(&self, leaving: u64, ids: &[u64]) {
        for _ in 0..200 {
            if ids.iter().all(|id| !self.members(*id).contains(&leaving)) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("leave of node {leaving} never reached {ids:?}");
    }

    /// Wait until `peer` has received `count` calls labelled `label`.
    async fn await_calls(&self, peer: u64, label: &str, count: usize) {
        for _ in 0..200 {
            if self.network.calls_to(NodeId(peer), label) >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("node {peer} never got {count} {label} call(s)");
    }
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_route_reaches_owner_through_fingers() {
    let cluster = Cluster::new(8, &[1, 2, 4]);
    let outcome = cluster
        .node(1)
        .route_to_responsible(Key(3), RoutedAction::Resolve)
        .await
        .unwrap();
    assert_eq!(outcome, ActionOutcome::Resolved(NodeId(4)));

    let calls: Vec<(u64, &str)> = cluster
        .network
        .calls()
        .iter()
        .map(|(to, req)| (to.position(), req.label()))
        .collect();
    assert_eq!(calls, vec![(2, "dispatch"), (4, "dispatch")]);
    for id in [1, 2, 4] {
        assert_eq!(cluster.members(id), vec![1, 2, 4]);
    }
}

#[tokio::test]
async fn test_store_then_fetch_from_another_node() {
    let cluster = Cluster::new(8, &[1, 2, 4]);
    cluster.node(1).store("k3", b"three".to_vec()).await.unwrap();
    assert_eq!(
        cluster.stores[&4].get("k3").await.unwrap(),
        Some(b"three".to_vec())
    );
    assert_eq!(cluster.node(2).fetch("k3").await.unwrap(), b"three".to_vec());

    assert!(!cluster.node(2).update("k3", b"new".to_vec()).await.unwrap());
    assert!(cluster.node(2).update("k6", b"six".to_vec()).await.unwrap());
    assert_eq!(cluster.node(4).fetch("k6").await.unwrap(), b"six".to_vec());

    cluster.node(4).delete("k3").await.unwrap();
    let err = cluster.node(1).fetch("k3").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_not_found_does_not_touch_membership() {
    let cluster = Cluster::new(8, &[1, 2, 4]);
    let err = cluster.node(1).fetch("k3").await.unwrap_err();
    assert!(matches!(err, RouteError::NotFound(ref name) if name == "k3"));
    let err = cluster.node(1).delete("k7").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    for id in [1, 2, 4] {
        assert_eq!(cluster.members(id), vec![1, 2, 4]);
    }
}

#[tokio::test]
async fn test_lookup_matches_router() {
    let cluster = Cluster::new(16, &[0, 3, 5, 9, 12]);
    for key in 0..16 {
        let owner = cluster.node(0).lookup(Key(key)).await.unwrap();
        let routed = cluster
            .node(0)
            .route_to_responsible(Key(key), RoutedAction::Resolve)
            .await
            .unwrap();
        assert_eq!(routed, ActionOutcome::Resolved(owner), "key {key}");
    }
}

// ============================================================================
// Repair
// ============================================================================

#[tokio::test]
async fn test_single_dead_hop_is_removed_once() {
    let cluster = Cluster::new(8, &[1, 2, 4]);
    cluster.network.take_down(NodeId(2));

    let outcome = cluster
        .node(1)
        .route_to_responsible(Key(3), RoutedAction::Resolve)
        .await
        .unwrap();
    assert_eq!(outcome, ActionOutcome::Resolved(NodeId(4)));
    assert_eq!(cluster.members(1), vec![1, 4]);
    assert_eq!(cluster.node(1).predecessor(), NodeId(4));
    assert_eq!(cluster.network.calls_to(NodeId(2), "dispatch"), 1);
    // Node 4 never saw the dead peer, so its view is unchanged.
    assert_eq!(cluster.members(4), vec![1, 2, 4]);
}

#[tokio::test]
async fn test_dead_finger_is_removed_once() {
    let cluster = Cluster::new(16, &[0, 3, 5, 9, 12]);
    cluster.network.take_down(NodeId(9));

    // Key 10 leaves node 0 through its finger 9, not its successor.
    let outcome = cluster
        .node(0)
        .route_to_responsible(Key(10), RoutedAction::Resolve)
        .await
        .unwrap();
    assert_eq!(outcome, ActionOutcome::Resolved(NodeId(12)));

    let calls: Vec<u64> = cluster
        .network
        .calls()
        .iter()
        .map(|(to, _)| to.position())
        .collect();
    assert_eq!(calls, vec![9, 5, 12]);
    assert_eq!(cluster.network.calls_to(NodeId(9), "dispatch"), 1);
    assert_eq!(cluster.members(0), vec![0, 3, 5, 12]);
    assert_eq!(
        cluster.node(0).snapshot().fingers().entries(),
        &[NodeId(3), NodeId(3), NodeId(5), NodeId(12)]
    );
    // Downstream nodes were told about 9 and routed around it without a repair.
    assert_eq!(cluster.members(5), vec![0, 3, 5, 9, 12]);
    assert_eq!(cluster.members(12), vec![0, 3, 5, 9, 12]);
}

#[tokio::test]
async fn test_forward_limit() {
    let cluster = Cluster::new(16, &[0, 3, 5, 9, 12]);
    let dispatch = |hops| Request::Dispatch {
        key: Key(0),
        action: RoutedAction::Resolve,
        excluded: Vec::new(),
        hops,
    };

    let reply = cluster
        .network
        .call(NodeId(0), dispatch(MAX_FORWARD_HOPS))
        .await
        .unwrap();
    assert_eq!(reply, Response::Outcome(ActionOutcome::Resolved(NodeId(0))));

    let err = cluster
        .network
        .call(NodeId(0), dispatch(MAX_FORWARD_HOPS + 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Generic);
    assert!(err.to_string().contains("exceeded"), "{err}");
    for id in [0, 3, 5, 9, 12] {
        assert_eq!(cluster.members(id), vec![0, 3, 5, 9, 12]);
    }
}

#[tokio::test]
async fn test_retry_ceiling() {
    let ids: Vec<u64> = (0..16).collect();
    let cluster = Cluster::new(64, &ids);
    for id in 1..16 {
        cluster.network.take_down(NodeId(id));
    }

    let err = cluster
        .node(0)
        .route_to_responsible(Key(15), RoutedAction::Resolve)
        .await
        .unwrap_err();
    match err {
        RouteError::RetryExhausted {
            key,
            attempts,
            dead_hops,
        } => {
            assert_eq!(key, Key(15));
            assert_eq!(attempts, MAX_ROUTING_RETRIES + 1);
            assert_eq!(dead_hops.len(), MAX_ROUTING_RETRIES as usize + 1);
            assert_eq!(dead_hops[0], NodeId(8));
        }
        other => panic!("expected retry exhaustion, got {other:?}"),
    }
    assert_eq!(
        cluster.network.calls().len(),
        MAX_ROUTING_RETRIES as usize + 1
    );
}

#[tokio::test]
async fn test_ring_shrinks_to_single_member() {
    let cluster = Cluster::new(8, &[1, 2]);
    cluster.network.take_down(NodeId(2));

    cluster.node(1).store("k2", b"two".to_vec()).await.unwrap();
    assert_eq!(cluster.members(1), vec![1]);
    assert_eq!(cluster.node(1).successor(), NodeId(1));
    for key in 0..8 {
        assert!(cluster.node(1).is_responsible(Key(key)));
    }
    assert_eq!(cluster.node(1).fetch("k2").await.unwrap(), b"two".to_vec());
}

#[tokio::test]
async fn test_lookup_does_not_repair() {
    let cluster = Cluster::new(8, &[1, 2, 4]);
    cluster.network.take_down(NodeId(2));

    let err = cluster.node(1).lookup(Key(3)).await.unwrap_err();
    assert!(err.is_unreachable());
    assert_eq!(cluster.members(1), vec![1, 2, 4]);
}

// ============================================================================
// Leave
// ============================================================================

#[tokio::test]
async fn test_leave_flood_visits_each_node_once() {
    let cluster = Cluster::new(16, &[0, 3, 5, 9, 12]);
    let report = cluster.node(5).request_leave().await.unwrap();
    assert_eq!(report.notified, Some(NodeId(9)));
    assert!(cluster.node(5).has_left());

    cluster.settle_leave(5).await;
    for id in [0, 3, 9, 12] {
        assert_eq!(cluster.network.calls_to(NodeId(id), "notify_leave"), 1, "node {id}");
    }
    assert_eq!(cluster.network.calls_to(NodeId(5), "notify_leave"), 0);
    assert_eq!(cluster.members(3), vec![0, 3, 9, 12]);
    assert_eq!(cluster.node(9).predecessor(), NodeId(3));
}

#[tokio::test]
async fn test_leave_hands_off_owned_blobs() {
    let cluster = Cluster::new(16, &[0, 3, 5, 9, 12]);
    for name in ["k4", "k5", "k10"] {
        cluster
            .node(0)
            .store(name, name.as_bytes().to_vec())
            .await
            .unwrap();
    }
    assert_eq!(
        cluster.node(5).owned_names().await.unwrap(),
        vec!["k4".to_string(), "k5".to_string()]
    );

    let mut shutdown = cluster.node(5).subscribe_shutdown();
    let report = cluster.node(5).request_leave().await.unwrap();
    assert_eq!(report.handed_off, vec!["k4".to_string(), "k5".to_string()]);
    assert!(report.failed.is_empty());
    shutdown.changed().await.unwrap();
    assert!(*shutdown.borrow());

    cluster.settle_leave(5).await;
    assert_eq!(cluster.stores[&9].get("k4").await.unwrap(), Some(b"k4".to_vec()));
    assert_eq!(cluster.node(0).fetch("k5").await.unwrap(), b"k5".to_vec());
    assert_eq!(cluster.node(12).fetch("k4").await.unwrap(), b"k4".to_vec());
    // The leaver keeps its copies.
    assert_eq!(cluster.stores[&5].get("k4").await.unwrap(), Some(b"k4".to_vec()));
}

#[tokio::test]
async fn test_second_leave_is_rejected() {
    let cluster = Cluster::new(8, &[1, 2, 4]);
    cluster.node(1).request_leave().await.unwrap();
    let err = cluster.node(1).request_leave().await.unwrap_err();
    assert!(matches!(err, RouteError::LeaveInProgress(NodeId(1))));
}

#[tokio::test]
async fn test_sole_member_leaves_without_handoff() {
    let cluster = Cluster::new(8, &[3]);
    cluster.node(3).store("k1", b"one".to_vec()).await.unwrap();
    let report = cluster.node(3).request_leave().await.unwrap();
    assert!(report.handed_off.is_empty());
    assert_eq!(report.notified, None);
    assert!(cluster.node(3).has_left());
    assert!(cluster.network.calls().is_empty());
}

#[tokio::test]
async fn test_leave_skips_dead_successor() {
    let cluster = Cluster::new(16, &[0, 3, 5, 9, 12]);
    cluster.network.take_down(NodeId(9));
    let report = cluster.node(5).request_leave().await.unwrap();
    assert_eq!(report.notified, Some(NodeId(12)));
    assert!(!cluster.members(5).contains(&9));

    for id in [0, 3, 12] {
        for _ in 0..200 {
            if !cluster.members(id).contains(&5) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!cluster.members(id).contains(&5), "node {id}");
    }
}

#[tokio::test]
async fn test_requests_to_departed_node_fail_as_unreachable() {
    let cluster = Cluster::new(8, &[1, 2, 4]);
    cluster.node(2).request_leave().await.unwrap();
    cluster.settle_leave(2).await;

    let err = cluster
        .network
        .call(NodeId(2), Request::GetNodeId)
        .await
        .unwrap_err();
    assert!(err.is_unreachable());
}

#[tokio::test]
async fn test_leave_flood_after_peers_dropped_the_leaver() {
    let cluster = Cluster::new(16, &[0, 3, 5, 9, 12]);

    // Nodes 3 and 0 lose node 5 to a partition and drop it while routing.
    cluster.network.take_down(NodeId(5));
    let via_successor = cluster
        .node(3)
        .route_to_responsible(Key(4), RoutedAction::Resolve)
        .await
        .unwrap();
    assert_eq!(via_successor, ActionOutcome::Resolved(NodeId(9)));
    let via_finger = cluster
        .node(0)
        .route_to_responsible(Key(6), RoutedAction::Resolve)
        .await
        .unwrap();
    assert_eq!(via_finger, ActionOutcome::Resolved(NodeId(9)));
    assert_eq!(cluster.members(3), vec![0, 3, 9, 12]);
    assert_eq!(cluster.members(0), vec![0, 3, 9, 12]);
    cluster.network.bring_up(NodeId(5));
    cluster.network.clear_calls();

    let report = cluster.node(5).request_leave().await.unwrap();
    assert_eq!(report.notified, Some(NodeId(9)));
    cluster.settle_leave(5).await;
    cluster.await_calls(3, "notify_leave", 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    for id in [0, 3, 9, 12] {
        assert_eq!(cluster.network.calls_to(NodeId(id), "notify_leave"), 1, "node {id}");
        assert_eq!(cluster.members(id), vec![0, 3, 9, 12], "node {id}");
    }
    assert_eq!(cluster.network.calls_to(NodeId(5), "notify_leave"), 0);
    assert_eq!(cluster.node(9).predecessor(), NodeId(3));
}

// ============================================================================
// Leave under failure
// ============================================================================

#[tokio::test]
async fn test_handoff_past_dead_successor() {
    let cluster = Cluster::new(16, &[0, 3, 5, 9, 12]);
    cluster.node(0).store("k4", b"four".to_vec()).await.unwrap();
    assert_eq!(cluster.stores[&5].get("k4").await.unwrap(), Some(b"four".to_vec()));
    cluster.network.take_down(NodeId(9));

    let report = tokio::time::timeout(Duration::from_secs(5), cluster.node(5).request_leave())
        .await
        .expect("leave did not terminate")
        .unwrap();
    assert_eq!(report.handed_off, vec!["k4".to_string()]);
    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert_eq!(report.notified, Some(NodeId(12)));
    assert_eq!(cluster.network.calls_to(NodeId(9), "dispatch"), 1);
    assert_eq!(cluster.stores[&12].get("k4").await.unwrap(), Some(b"four".to_vec()));

    cluster.settle_leave_at(5, &[0, 3, 12]).await;
    assert_eq!(cluster.node(0).fetch("k4").await.unwrap(), b"four".to_vec());
    assert_eq!(cluster.node(12).fetch("k4").await.unwrap(), b"four".to_vec());
}

#[tokio::test]
async fn test_handoff_without_live_peers_is_reported_failed() {
    let cluster = Cluster::new(8, &[1, 2]);
    cluster.node(1).store("k1", b"one".to_vec()).await.unwrap();
    assert_eq!(cluster.stores[&1].get("k1").await.unwrap(), Some(b"one".to_vec()));
    cluster.network.take_down(NodeId(2));

    let report = cluster.node(1).request_leave().await.unwrap();
    assert!(report.handed_off.is_empty());
    let failed: Vec<&str> = report.failed.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(failed, vec!["k1"]);
    assert!(report.failed[0].1.contains("no live peer"), "{:?}", report.failed);
    assert_eq!(report.notified, None);
    assert!(cluster.node(1).has_left());
    // The only copy stays where it was.
    assert_eq!(cluster.stores[&1].get("k1").await.unwrap(), Some(b"one".to_vec()));
}

#[tokio::test]
async fn test_writes_to_a_leaving_node_are_rejected() {
    let gate = Arc::new(GatedStore::default());
    let cluster = Cluster::build(16, &[0, 3, 5, 9, 12], Some((5, gate.clone())));
    gate.inner.put("k4", b"old").await.unwrap();

    let leaver = cluster.node(5).clone();
    let leave = tokio::spawn(async move { leaver.request_leave().await });
    gate.entered.notified().await;

    let err = cluster.node(0).store("k4", b"new".to_vec()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Generic);
    assert!(err.to_string().contains("leaving"), "{err}");
    let err = cluster.node(5).delete("k4").await.unwrap_err();
    assert!(matches!(err, RouteError::LeaveInProgress(NodeId(5))));
    // Reads are still served from the leaver's copy.
    assert_eq!(cluster.node(0).fetch("k4").await.unwrap(), b"old".to_vec());
    // Writes the leaver does not own are forwarded as usual.
    cluster.node(5).store("k10", b"ten".to_vec()).await.unwrap();
    assert_eq!(cluster.stores[&12].get("k10").await.unwrap(), Some(b"ten".to_vec()));

    gate.open.notify_one();
    let report = leave.await.unwrap().unwrap();
    assert_eq!(report.handed_off, vec!["k4".to_string()]);
    cluster.settle_leave(5).await;

    cluster.node(0).store("k4", b"new".to_vec()).await.unwrap();
    assert_eq!(cluster.stores[&9].get("k4").await.unwrap(), Some(b"new".to_vec()));
    assert_eq!(cluster.stores[&5].get("k4").await.unwrap(), Some(b"old".to_vec()));
}
