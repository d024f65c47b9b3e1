//! Error types for the conversation crate.
//!
//! - `StoreError`: Errors from conversation store operations
//! - `ConversationError`: Errors building conversation helpers

use std::fmt;

/// Errors from conversation store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Input rejected before reaching storage.
    InvalidInput { reason: String },
    /// A stored row could not be decoded.
    InvalidData { reason: String },
    /// A constraint in the underlying store was violated.
    ConstraintViolation { reason: String },
    /// The storage operation itself failed.
    OperationFailed {
        operation: &'static str,
        reason: String,
    },
}

impl StoreError {
    /// Creates an `OperationFailed` error for the named operation.
    #[must_use]
    pub fn operation(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { reason } => write!(f, "invalid input: {reason}"),
            Self::InvalidData { reason } => write!(f, "invalid stored data: {reason}"),
            Self::ConstraintViolation { reason } => {
                write!(f, "constraint violation: {reason}")
            }
            Self::OperationFailed { operation, reason } => {
                write!(f, "failed to {operation}: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors building conversation helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// A fallback responder needs at least one canned response.
    EmptyFallbackList,
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFallbackList => write!(f, "fallback response list must not be empty"),
        }
    }
}

impl std::error::Error for ConversationError {}
