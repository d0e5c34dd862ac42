//! Caucus Tests - end-to-end scenario tests for the election simulator.
//!
//! Unit tests live inline in each crate under `#[cfg(test)]`; this crate
//! holds the cross-component scenarios: whole clusters running on tokio's
//! paused test clock, with crashes and recoveries injected mid-run.
//!
//! ## Test Organization
//!
//! - `cluster`: reusable harness (spawn a seeded cluster, poll its state on
//!   virtual time)
//! - `election_tests`: convergence scenarios (initial election, failover,
//!   recovery grace, split votes, lost majority)
//! - `fault_tests`: crash/recovery behavior in a running cluster
//!
//! All scenarios use `start_paused` runtimes: the protocol's real timing
//! (seconds of heartbeats and voting windows) elapses instantly on virtual
//! time, and fixed seeds keep runs reproducible.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cluster;

#[cfg(test)]
mod election_tests;
#[cfg(test)]
mod fault_tests;
