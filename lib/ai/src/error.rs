//! Error types for the AI crate.
//!
//! `LlmError` describes why a completion could not be produced. Provider
//! implementations wrap it in a `rootcause::Report` so callers can log the
//! full chain; the dispatcher never shows it to protocol clients.

use std::fmt;

/// Errors from completion provider operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The HTTP request could not be sent or completed.
    RequestFailed { reason: String },
    /// Timeout waiting for response.
    Timeout,
    /// The provider answered with a non-success status.
    Api { status: u16, message: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
    /// The provider returned no choices.
    EmptyResponse,
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => {
                write!(f, "completion request failed: {reason}")
            }
            Self::Timeout => write!(f, "completion request timed out"),
            Self::Api { status, message } => {
                write!(f, "completion API error (status {status}): {message}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse completion response: {reason}")
            }
            Self::EmptyResponse => write!(f, "no response choices returned"),
            Self::InvalidConfig { reason } => {
                write!(f, "invalid completion configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}
