//! Error handling foundation for the parley relay.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own domain-specific error enums in its own
//! error module; layers that call out to a database or a remote API wrap
//! those enums in a `Report` as errors propagate up the stack.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
