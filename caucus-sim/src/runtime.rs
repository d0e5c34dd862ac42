//! Per-node execution.
//!
//! Each node runs as one tokio task with a fixed-rate tick loop: drain the
//! mailbox fully (arrival order), feed each message to the state machine,
//! evaluate the time-driven transitions, then interpret the outputs. The
//! randomized candidacy delay runs as a separate sleep task tagged with its
//! attempt id; the state machine re-validates on firing, so cancellation is
//! cooperative - external events simply make the firing a no-op.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use caucus_core::{AttemptId, NodeId};
use caucus_election::{ElectionNode, ElectionOutput, Role};
use tracing::{debug, info, trace};

use crate::bus::MessageBus;

/// Tick period of the node execution loop.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Shared handle to one node's state machine.
///
/// The runtime task, candidacy timers, the fault injector, and the driver's
/// status reporting all go through this handle; the mutex is held only for
/// the duration of a state-machine call, never across an await.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    /// The node's id (its mailbox address).
    pub id: NodeId,
    /// The election state machine.
    pub(crate) state: Arc<Mutex<ElectionNode>>,
}

impl NodeHandle {
    /// Creates a handle owning a fresh state machine.
    #[must_use]
    pub(crate) fn new(id: NodeId, node: ElectionNode) -> Self {
        Self {
            id,
            state: Arc::new(Mutex::new(node)),
        }
    }

    /// Returns the node's current role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.state.lock().map_or(Role::Follower, |n| n.role())
    }

    /// Returns true if the node currently considers itself leader.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.state.lock().map_or(false, |n| n.is_leader())
    }

    /// Returns the candidate the node has committed its vote to.
    #[must_use]
    pub fn voted_for(&self) -> Option<NodeId> {
        self.state.lock().map_or(None, |n| n.voted_for())
    }
}

/// Returns the current instant on the simulation clock.
///
/// Goes through `tokio::time` so tests running under the paused clock see
/// virtual time, not wall time.
pub(crate) fn sim_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Spawns the tick loop for one node. Runs detached until the process (or
/// the owning runtime) shuts down; a crashed node keeps ticking but skips
/// every cycle until recovery.
pub(crate) fn spawn_node(handle: NodeHandle, bus: Arc<MessageBus>) {
    info!(node = %handle.id, "node started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        loop {
            ticker.tick().await;

            if !bus.is_working(handle.id) {
                continue;
            }

            let inbound = bus.drain_all(handle.id);
            let now = sim_now();
            let working = bus.working_count();

            let outputs = match handle.state.lock() {
                Ok(mut node) => {
                    let mut outputs = Vec::new();
                    for message in inbound {
                        outputs.extend(node.handle_message(message, now));
                    }
                    outputs.extend(node.poll(now, working));
                    outputs
                }
                Err(_) => Vec::new(),
            };

            apply_outputs(&handle, &bus, outputs);
        }
    });
}

/// Interprets state-machine outputs: broadcasts go to the bus, candidacy
/// delays become sleep tasks, role changes are logged.
fn apply_outputs(handle: &NodeHandle, bus: &Arc<MessageBus>, outputs: Vec<ElectionOutput>) {
    for output in outputs {
        match output {
            ElectionOutput::Broadcast(message) => {
                trace!(node = %handle.id, ?message, "broadcasting");
                bus.broadcast(message);
            }
            ElectionOutput::ScheduleCandidacy { attempt, delay } => {
                spawn_candidacy_timer(handle.clone(), Arc::clone(bus), attempt, delay);
            }
            ElectionOutput::BecameLeader => {
                info!(node = %handle.id, "leader elected");
            }
            ElectionOutput::SteppedDown => {
                debug!(node = %handle.id, "stepped down");
            }
        }
    }
}

/// Spawns the candidacy delay timer for one election attempt.
///
/// On firing, the state machine re-checks that the attempt is still live
/// (still Follower, still waiting, not preempted); a node that crashed in
/// the meantime is skipped entirely.
fn spawn_candidacy_timer(
    handle: NodeHandle,
    bus: Arc<MessageBus>,
    attempt: AttemptId,
    delay: Duration,
) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        if !bus.is_working(handle.id) {
            return;
        }

        let now = sim_now();
        let outputs = match handle.state.lock() {
            Ok(mut node) => node.candidacy_delay_elapsed(attempt, now),
            Err(_) => Vec::new(),
        };

        apply_outputs(&handle, &bus, outputs);
    });
}
