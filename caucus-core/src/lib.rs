//! Caucus Core - Strongly-typed identifiers and error types for Caucus.
//!
//! This crate provides the types shared by every other Caucus crate. It does
//! NOT provide clocks, mailboxes, or task scheduling - those live in
//! `caucus-sim`.
//!
//! # Design Principles
//!
//! - **Strongly-typed IDs**: Prevent mixing up a `NodeId` with a raw counter
//! - **Explicit errors**: Every failure is a value, handled at the caller
//! - **No unsafe code**: Safety > Performance

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod types;

pub use error::{Error, Result};
pub use types::{AttemptId, NodeId};
