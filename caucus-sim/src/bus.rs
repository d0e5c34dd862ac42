//! In-process message bus.
//!
//! One FIFO mailbox per node, one availability flag per node. The bus is the
//! only coupling between nodes: a node drains its own mailbox and appends to
//! others' through `send`/`broadcast`; it never reaches into another node.
//!
//! Locking discipline: one mutex per mailbox. A broadcast takes each
//! recipient's lock in turn, checking the recipient's availability at that
//! instant - a snapshot, not a transaction. A crash racing with a broadcast
//! may therefore land on some recipients and miss others, which is exactly
//! the unreliable-network behavior being simulated.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use caucus_core::NodeId;
use caucus_election::Message;
use tracing::trace;

/// Per-node FIFO mailboxes plus availability flags.
///
/// Messages addressed to a node whose availability flag is down are dropped,
/// never stored: an unreachable process loses its traffic.
#[derive(Debug)]
pub struct MessageBus {
    /// One mailbox per node id; ids index this table.
    mailboxes: Vec<Mutex<VecDeque<Message>>>,
    /// Availability flags; flipped only by the fault injector.
    working: Vec<AtomicBool>,
}

impl MessageBus {
    /// Creates a bus for `node_count` nodes, all initially working.
    #[must_use]
    pub fn new(node_count: usize) -> Self {
        Self {
            mailboxes: (0..node_count).map(|_| Mutex::new(VecDeque::new())).collect(),
            working: (0..node_count).map(|_| AtomicBool::new(true)).collect(),
        }
    }

    /// Returns the number of nodes this bus routes for.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.mailboxes.len()
    }

    /// Returns true if `id` addresses a mailbox on this bus.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.index(id).is_some()
    }

    /// Returns true if the node is currently working. Unknown ids are
    /// reported as not working.
    #[must_use]
    pub fn is_working(&self, id: NodeId) -> bool {
        self.index(id)
            .is_some_and(|i| self.working[i].load(Ordering::SeqCst))
    }

    /// Flips a node's availability flag. Unknown ids are ignored.
    pub fn set_working(&self, id: NodeId, working: bool) {
        if let Some(i) = self.index(id) {
            self.working[i].store(working, Ordering::SeqCst);
        }
    }

    /// Returns the number of currently-working nodes.
    #[must_use]
    pub fn working_count(&self) -> usize {
        self.working
            .iter()
            .filter(|w| w.load(Ordering::SeqCst))
            .count()
    }

    /// Appends a message to one node's mailbox. Dropped without a trace in
    /// the mailbox if the target is down or unknown.
    pub fn send(&self, to: NodeId, message: Message) {
        let Some(i) = self.index(to) else {
            return;
        };
        if !self.working[i].load(Ordering::SeqCst) {
            trace!(%to, ?message, "dropping message to crashed node");
            return;
        }
        if let Ok(mut mailbox) = self.mailboxes[i].lock() {
            mailbox.push_back(message);
        }
    }

    /// Delivers a message to every node working at the instant its mailbox
    /// is reached, the sender's own mailbox included.
    pub fn broadcast(&self, message: Message) {
        for (i, mailbox) in self.mailboxes.iter().enumerate() {
            if !self.working[i].load(Ordering::SeqCst) {
                continue;
            }
            if let Ok(mut mailbox) = mailbox.lock() {
                mailbox.push_back(message);
            }
        }
    }

    /// Removes and returns every queued message for `id`, in arrival order.
    #[must_use]
    pub fn drain_all(&self, id: NodeId) -> Vec<Message> {
        let Some(i) = self.index(id) else {
            return Vec::new();
        };
        self.mailboxes[i]
            .lock()
            .map(|mut mailbox| mailbox.drain(..).collect())
            .unwrap_or_default()
    }

    /// Discards every queued message for `id`.
    pub fn clear(&self, id: NodeId) {
        if let Some(i) = self.index(id) {
            if let Ok(mut mailbox) = self.mailboxes[i].lock() {
                mailbox.clear();
            }
        }
    }

    /// Maps a node id to its table index, if it addresses this bus.
    fn index(&self, id: NodeId) -> Option<usize> {
        let i = usize::try_from(id.get()).ok()?;
        (i < self.mailboxes.len()).then_some(i)
    }
}
