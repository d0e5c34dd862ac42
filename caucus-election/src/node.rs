//! Election state machine.
//!
//! `ElectionNode` is a pure state machine: it takes inputs (messages, timer
//! firings, the current time) and produces [`ElectionOutput`] actions but
//! performs no I/O itself. The runtime in `caucus-sim` owns the mailboxes and
//! timers and interprets the outputs. This design keeps every transition
//! directly testable without a clock or a scheduler.

use std::fmt;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use caucus_core::{AttemptId, NodeId};

use crate::config::ElectionConfig;
use crate::message::Message;

/// Node role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Passive state - waits for heartbeats, votes on candidacies.
    Follower,
    /// Actively collecting votes for its own candidacy.
    Candidate,
    /// Broadcasts heartbeats to keep followers from starting elections.
    Leader,
}

impl Default for Role {
    fn default() -> Self {
        Self::Follower
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Follower => write!(f, "follower"),
            Self::Candidate => write!(f, "candidate"),
            Self::Leader => write!(f, "leader"),
        }
    }
}

/// Output actions from the election state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionOutput {
    /// Broadcast a message to every working node.
    Broadcast(Message),
    /// Schedule the randomized pre-candidacy delay timer. When it fires, the
    /// runtime must call [`ElectionNode::candidacy_delay_elapsed`] with the
    /// same attempt id; the node re-validates its state then.
    ScheduleCandidacy {
        /// The election attempt this timer belongs to. Stale timers (from an
        /// attempt that was cancelled meanwhile) are ignored on firing.
        attempt: AttemptId,
        /// How long to wait before the candidacy announcement.
        delay: Duration,
    },
    /// This node won its tally and became leader.
    BecameLeader,
    /// This node left the candidate role (failed tally or accepted a
    /// heartbeat) or was demoted from leader.
    SteppedDown,
}

/// The election state machine for one node.
///
/// Crash and recovery are not modeled here: a crashed node simply stops
/// being driven by the runtime, which preserves role and vote fields across
/// the outage exactly as the protocol requires. Recovery goes through
/// [`ElectionNode::reset_for_recovery`].
#[derive(Debug)]
pub struct ElectionNode {
    /// Configuration.
    config: ElectionConfig,

    /// Current role.
    role: Role,
    /// The candidate this node committed its vote to in the current round.
    /// Cleared only by heartbeat acceptance or recovery.
    voted_for: Option<NodeId>,
    /// Votes collected; meaningful only while Candidate.
    votes_received: usize,

    /// When the last heartbeat was accepted (or leadership assumed).
    last_heartbeat: Instant,
    /// When this node announced its candidacy; `None` unless Candidate.
    election_started_at: Option<Instant>,

    // Pre-candidacy waiting state.
    /// A candidacy delay timer is pending.
    waiting: bool,
    /// When the waiting period began.
    wait_started_at: Option<Instant>,
    /// A competing candidacy arrived during the wait; blocks announcement.
    preempted: bool,
    /// Tags candidacy timers so firings from cancelled attempts are no-ops.
    attempt: AttemptId,

    /// Jitter source. Seeded, so runs are reproducible.
    rng: StdRng,
}

impl ElectionNode {
    /// Creates a new node in the Follower role.
    ///
    /// `now` seeds the heartbeat clock, so a fresh node waits a full
    /// election timeout before its first attempt.
    #[must_use]
    pub fn new(config: ElectionConfig, now: Instant) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            role: Role::Follower,
            voted_for: None,
            votes_received: 0,
            last_heartbeat: now,
            election_started_at: None,
            waiting: false,
            wait_started_at: None,
            preempted: false,
            attempt: AttemptId::new(0),
            rng,
        }
    }

    /// Returns this node's ID.
    #[must_use]
    pub const fn node_id(&self) -> NodeId {
        self.config.node_id
    }

    /// Returns the current role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns true if this node is the leader.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }

    /// Returns the candidate this node has voted for in the current round.
    #[must_use]
    pub const fn voted_for(&self) -> Option<NodeId> {
        self.voted_for
    }

    /// Returns the number of votes collected.
    #[must_use]
    pub const fn votes_received(&self) -> usize {
        self.votes_received
    }

    /// Returns true if a candidacy delay timer is pending.
    #[must_use]
    pub const fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Evaluates the time-driven transitions: follower timeout, candidate
    /// tally, leader heartbeat cadence.
    ///
    /// `working_count` is the number of currently-working nodes (this one
    /// included); the tally uses it as the majority base.
    pub fn poll(&mut self, now: Instant, working_count: usize) -> Vec<ElectionOutput> {
        match self.role {
            Role::Follower => {
                let timed_out = now.saturating_duration_since(self.last_heartbeat)
                    > self.config.election_timeout;
                if timed_out && !self.waiting && self.voted_for.is_none() {
                    return vec![self.start_waiting(now)];
                }
                Vec::new()
            }
            Role::Candidate => {
                let window_closed = self.election_started_at.is_some_and(|started| {
                    now.saturating_duration_since(started) > self.config.voting_window
                });
                if window_closed {
                    return self.tally(now, working_count);
                }
                Vec::new()
            }
            Role::Leader => {
                let due = now.saturating_duration_since(self.last_heartbeat)
                    >= self.config.heartbeat_interval;
                if due {
                    self.last_heartbeat = now;
                    return vec![ElectionOutput::Broadcast(Message::Heartbeat {
                        leader: self.config.node_id,
                    })];
                }
                Vec::new()
            }
        }
    }

    /// Called by the runtime when a candidacy delay timer fires.
    ///
    /// Soft cancellation by state-check: the announcement only happens if
    /// the attempt tag still matches and the node is still a Follower, still
    /// waiting, and not preempted by a competing candidacy. Anything else is
    /// a no-op.
    pub fn candidacy_delay_elapsed(
        &mut self,
        attempt: AttemptId,
        now: Instant,
    ) -> Vec<ElectionOutput> {
        let still_valid = attempt == self.attempt
            && self.waiting
            && !self.preempted
            && self.role == Role::Follower;
        if !still_valid {
            debug!(node = %self.config.node_id, %attempt, "stale candidacy timer ignored");
            return Vec::new();
        }

        self.become_candidate(now)
    }

    /// Handles an incoming message.
    pub fn handle_message(&mut self, message: Message, now: Instant) -> Vec<ElectionOutput> {
        match message {
            Message::Heartbeat { leader } => self.handle_heartbeat(leader, now),
            Message::Candidacy { candidate } => self.handle_candidacy(candidate),
            Message::Vote { voter, candidate } => self.handle_vote(voter, candidate),
        }
    }

    /// Resets the node after a recovery: back to Follower with all election
    /// state cleared and a fresh heartbeat clock, so the node will not start
    /// an election until a full timeout has elapsed (the grace period that
    /// lets an incumbent leader be heard first).
    pub fn reset_for_recovery(&mut self, now: Instant) {
        self.clear_election_state();
        self.role = Role::Follower;
        self.last_heartbeat = now;

        // Postcondition: no transition can fire before the grace elapses.
        debug_assert!(self.voted_for.is_none());
        debug_assert!(!self.waiting);
    }

    /// Enters the randomized pre-candidacy waiting period.
    fn start_waiting(&mut self, now: Instant) -> ElectionOutput {
        self.waiting = true;
        self.wait_started_at = Some(now);
        self.preempted = false;
        self.attempt = self.attempt.next();

        let delay = self.draw_candidacy_delay();
        info!(node = %self.config.node_id, delay = ?delay, "starting an election");
        ElectionOutput::ScheduleCandidacy {
            attempt: self.attempt,
            delay,
        }
    }

    /// Draws a uniform delay from the configured candidacy range.
    fn draw_candidacy_delay(&mut self) -> Duration {
        let min_ms = u64::try_from(self.config.candidacy_delay_min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.config.candidacy_delay_max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(self.rng.gen_range(min_ms..=max_ms))
    }

    /// Announces candidacy: vote for self, open the voting window.
    fn become_candidate(&mut self, now: Instant) -> Vec<ElectionOutput> {
        self.role = Role::Candidate;
        self.voted_for = Some(self.config.node_id);
        self.votes_received = 1;
        self.election_started_at = Some(now);
        self.waiting = false;
        self.wait_started_at = None;

        // Postcondition: the candidate's own vote is committed.
        debug_assert!(self.voted_for == Some(self.config.node_id));
        debug_assert!(self.votes_received == 1);

        info!(node = %self.config.node_id, "announcing candidacy");
        vec![ElectionOutput::Broadcast(Message::Candidacy {
            candidate: self.config.node_id,
        })]
    }

    /// Evaluates the vote count at the end of the voting window.
    ///
    /// The threshold is a majority of the currently-working nodes, and an
    /// election can only succeed while a majority of the full cluster is
    /// working; a lone survivor of a mostly-crashed cluster keeps cycling
    /// Candidate -> Follower instead of electing itself.
    fn tally(&mut self, now: Instant, working_count: usize) -> Vec<ElectionOutput> {
        let majority = working_count / 2 + 1;
        let quorum_working = working_count > self.config.cluster_size() / 2;

        info!(
            node = %self.config.node_id,
            votes = self.votes_received,
            working = working_count,
            needed = majority,
            "election results"
        );

        if quorum_working && self.votes_received >= majority {
            self.become_leader(now)
        } else {
            self.clear_election_state();
            self.role = Role::Follower;
            vec![ElectionOutput::SteppedDown]
        }
    }

    /// Becomes leader and resets the heartbeat clock; the first heartbeat
    /// goes out one interval from now.
    fn become_leader(&mut self, now: Instant) -> Vec<ElectionOutput> {
        debug_assert!(self.role == Role::Candidate);

        self.role = Role::Leader;
        self.last_heartbeat = now;
        self.election_started_at = None;

        info!(node = %self.config.node_id, "became leader");
        vec![ElectionOutput::BecameLeader]
    }

    /// Handles a heartbeat. Acceptance is unconditional: with no terms there
    /// is nothing to compare, so any heartbeat wins.
    fn handle_heartbeat(&mut self, leader: NodeId, now: Instant) -> Vec<ElectionOutput> {
        self.last_heartbeat = now;

        match self.role {
            Role::Follower => {
                // Re-arm for a clean timeout cycle.
                self.clear_election_state();
                Vec::new()
            }
            Role::Candidate => {
                self.clear_election_state();
                self.role = Role::Follower;
                info!(node = %self.config.node_id, %leader, "got a heartbeat, following leader");
                vec![ElectionOutput::SteppedDown]
            }
            Role::Leader => {
                // Own broadcasts come back through the bus; only a foreign
                // heartbeat demotes.
                if leader == self.config.node_id {
                    return Vec::new();
                }
                self.clear_election_state();
                self.role = Role::Follower;
                info!(node = %self.config.node_id, %leader, "yielding leadership to heartbeat");
                vec![ElectionOutput::SteppedDown]
            }
        }
    }

    /// Handles a candidacy announcement. Followers only: a waiting follower
    /// is preempted, and the first candidacy seen wins this node's vote.
    fn handle_candidacy(&mut self, candidate: NodeId) -> Vec<ElectionOutput> {
        if self.role != Role::Follower {
            return Vec::new();
        }

        if self.waiting {
            self.waiting = false;
            self.wait_started_at = None;
            self.preempted = true;
            debug!(node = %self.config.node_id, %candidate, "pending candidacy preempted");
        }

        if self.voted_for.is_none() {
            self.voted_for = Some(candidate);
            info!(node = %self.config.node_id, %candidate, "voting");
            return vec![ElectionOutput::Broadcast(Message::Vote {
                voter: self.config.node_id,
                candidate,
            })];
        }

        Vec::new()
    }

    /// Handles a vote. Counts only while Candidate and only for this node.
    fn handle_vote(&mut self, voter: NodeId, candidate: NodeId) -> Vec<ElectionOutput> {
        if self.role == Role::Candidate && candidate == self.config.node_id {
            self.votes_received += 1;
            debug!(
                node = %self.config.node_id,
                %voter,
                votes = self.votes_received,
                "vote received"
            );
        }
        Vec::new()
    }

    /// Clears vote, tally, and waiting state. Bumps the attempt id so any
    /// in-flight candidacy timer becomes a no-op.
    fn clear_election_state(&mut self) {
        self.voted_for = None;
        self.votes_received = 0;
        self.election_started_at = None;
        self.waiting = false;
        self.wait_started_at = None;
        self.preempted = false;
        self.attempt = self.attempt.next();
    }
}
