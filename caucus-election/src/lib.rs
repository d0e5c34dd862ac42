//! Caucus Election - randomized leader-election state machine.
//!
//! This crate provides the election protocol as a pure state machine:
//! handlers take the current time and return explicit outputs, and the
//! runtime in `caucus-sim` interprets them. Nothing here performs I/O or
//! reads a clock, and all randomness comes from a seeded RNG, so every
//! transition is directly testable.
//!
//! # Protocol
//!
//! Nodes are Followers until they miss heartbeats for a full election
//! timeout, then wait a randomized delay before announcing candidacy (the
//! delay is the split-vote mitigation: the first announcement preempts the
//! other waiters). A candidate collects votes for a fixed voting window and
//! tallies; a majority makes it Leader, anything less reverts it to Follower
//! for another round.
//!
//! # Known limitation
//!
//! There are no term or epoch numbers: any heartbeat is accepted
//! unconditionally, so adversarial timing can produce transient
//! multi-leadership. Convergence relies on candidacy jitter and
//! first-candidacy-wins voting; a failed tally is the designed retry path,
//! not an error.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod message;
mod node;

pub mod limits;

pub use config::ElectionConfig;
pub use message::Message;
pub use node::{ElectionNode, ElectionOutput, Role};
