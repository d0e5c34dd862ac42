//! Caucus Sim - simulation runtime for the election protocol.
//!
//! This crate owns everything the pure state machine in `caucus-election`
//! does not: the per-node mailboxes ([`MessageBus`]), the per-node tick
//! loops, the candidacy delay timers, crash/recovery injection
//! ([`FaultInjector`]), and the interactive [`Driver`].
//!
//! All timing goes through `tokio::time`, so the whole simulation runs on
//! virtual time under tokio's paused test clock.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod bus;
mod driver;
mod fault;
mod runtime;

pub use bus::MessageBus;
pub use driver::{Command, CommandError, Driver, NodeStatus, SimConfig, USAGE};
pub use fault::FaultInjector;
pub use runtime::{NodeHandle, TICK_INTERVAL};
