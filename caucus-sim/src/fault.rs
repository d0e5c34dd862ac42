//! Crash and recovery fault injection.
//!
//! Crashing a node flips its availability flag and clears its mailbox;
//! role and vote fields are left untouched, so a crashed former leader
//! still believes it is leader until recovery resets it. Recovery clears
//! the mailbox again, resets the state machine to a clean Follower, and
//! re-arms the heartbeat clock so the node stays quiet for a full election
//! timeout - long enough for an incumbent leader to be heard.

use std::sync::Arc;

use caucus_core::NodeId;
use tracing::{debug, info};

use crate::bus::MessageBus;
use crate::runtime::{sim_now, NodeHandle};

/// Applies crash and recovery operations to nodes.
#[derive(Debug)]
pub struct FaultInjector {
    bus: Arc<MessageBus>,
    nodes: Vec<NodeHandle>,
}

impl FaultInjector {
    /// Creates an injector over the given node set.
    #[must_use]
    pub(crate) fn new(bus: Arc<MessageBus>, nodes: Vec<NodeHandle>) -> Self {
        Self { bus, nodes }
    }

    /// Crashes a node: stops it processing and broadcasting, and drops its
    /// queued messages. Crashing an already-crashed node is a no-op.
    ///
    /// # Errors
    /// Returns [`caucus_core::Error::NotFound`] for an unknown id.
    pub fn crash(&self, id: NodeId) -> caucus_core::Result<()> {
        self.lookup(id)?;

        if !self.bus.is_working(id) {
            debug!(node = %id, "crash ignored, already crashed");
            return Ok(());
        }

        // Flag first, then clear: a send racing with the crash either sees
        // the flag and drops, or lands before the clear and is discarded.
        self.bus.set_working(id, false);
        self.bus.clear(id);
        info!(node = %id, "crashed");
        Ok(())
    }

    /// Recovers a node: clears its mailbox, resets it to a clean Follower
    /// with a fresh grace period, and marks it working again. Recovering a
    /// working node is a no-op.
    ///
    /// # Errors
    /// Returns [`caucus_core::Error::NotFound`] for an unknown id.
    pub fn recover(&self, id: NodeId) -> caucus_core::Result<()> {
        let handle = self.lookup(id)?;

        if self.bus.is_working(id) {
            debug!(node = %id, "recover ignored, already working");
            return Ok(());
        }

        self.bus.clear(id);
        if let Ok(mut node) = handle.state.lock() {
            node.reset_for_recovery(sim_now());
        }
        // Mark working last so no message lands before the grace is armed.
        self.bus.set_working(id, true);
        info!(node = %id, "recovered");
        Ok(())
    }

    /// Resolves an id to its node handle.
    fn lookup(&self, id: NodeId) -> caucus_core::Result<&NodeHandle> {
        usize::try_from(id.get())
            .ok()
            .and_then(|i| self.nodes.get(i))
            .ok_or(caucus_core::Error::NotFound {
                resource: "node",
                id: id.get(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use caucus_election::{ElectionConfig, ElectionNode, Message, Role};

    use super::*;

    fn make_injector(node_count: u64) -> (Arc<MessageBus>, Vec<NodeHandle>, FaultInjector) {
        let cluster: Vec<NodeId> = (0..node_count).map(NodeId::new).collect();
        let bus = Arc::new(MessageBus::new(cluster.len()));
        let nodes: Vec<NodeHandle> = cluster
            .iter()
            .map(|&id| {
                let config = ElectionConfig::new(id, cluster.clone());
                NodeHandle::new(id, ElectionNode::new(config, Instant::now()))
            })
            .collect();
        let injector = FaultInjector::new(Arc::clone(&bus), nodes.clone());
        (bus, nodes, injector)
    }

    #[tokio::test]
    async fn test_crash_clears_mailbox_and_flag() {
        let (bus, _nodes, injector) = make_injector(3);
        let target = NodeId::new(1);
        bus.send(target, Message::Heartbeat { leader: NodeId::new(0) });

        injector.crash(target).expect("crash");

        assert!(!bus.is_working(target));
        // Recover and confirm the queued message is gone.
        injector.recover(target).expect("recover");
        assert!(bus.drain_all(target).is_empty());
    }

    #[tokio::test]
    async fn test_crash_is_idempotent_and_preserves_role() {
        let (bus, nodes, injector) = make_injector(3);
        let target = NodeId::new(1);

        injector.crash(target).expect("crash");
        injector.crash(target).expect("second crash is a no-op");

        assert!(!bus.is_working(target));
        // Crash does not reset election state.
        assert_eq!(nodes[1].role(), Role::Follower);
    }

    #[tokio::test]
    async fn test_recover_resets_to_follower() {
        let (bus, nodes, injector) = make_injector(3);
        let target = NodeId::new(2);

        // Commit a vote before the outage; recovery must clear it.
        if let Ok(mut node) = nodes[2].state.lock() {
            node.handle_message(
                Message::Candidacy { candidate: NodeId::new(0) },
                Instant::now(),
            );
        }
        assert!(nodes[2].voted_for().is_some());

        injector.crash(target).expect("crash");
        // Crash alone leaves the vote in place.
        assert!(nodes[2].voted_for().is_some());

        injector.recover(target).expect("recover");
        assert!(bus.is_working(target));
        assert_eq!(nodes[2].role(), Role::Follower);
        assert!(nodes[2].voted_for().is_none());
    }

    #[tokio::test]
    async fn test_recover_working_node_is_noop() {
        let (bus, _nodes, injector) = make_injector(3);
        let target = NodeId::new(0);
        bus.send(target, Message::Heartbeat { leader: NodeId::new(1) });

        injector.recover(target).expect("recover is a no-op");

        // The queued message survives: nothing was cleared.
        assert_eq!(bus.drain_all(target).len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_an_error() {
        let (_bus, _nodes, injector) = make_injector(3);

        assert!(injector.crash(NodeId::new(9)).is_err());
        assert!(injector.recover(NodeId::new(9)).is_err());
    }
}
