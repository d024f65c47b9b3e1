//! Core domain types and utilities for the parley relay.
//!
//! This crate provides the identifiers shared by the conversation store,
//! the protocol dispatcher and the HTTP server, plus the `Result` alias
//! used by layers that talk to external systems.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{MessageId, ParseIdError, UserId};
