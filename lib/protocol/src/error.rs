//! Error types for the protocol crate.
//!
//! - `EnvelopeError`: Request bodies rejected before dispatch
//! - `ToolCallError`: Failures inside a tool handler

use parley_conversation::StoreError;
use std::fmt;

/// A request body that cannot be dispatched at all.
///
/// These never become protocol error objects; the transport answers them
/// directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The body is not a JSON object.
    InvalidJson,
    /// The body has no string `method` field.
    MethodRequired,
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson => f.write_str("Invalid JSON"),
            Self::MethodRequired => f.write_str("Method required"),
        }
    }
}

impl std::error::Error for EnvelopeError {}

/// A tool handler failure.
///
/// The `Display` text is what the caller sees as the protocol error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCallError {
    /// An argument is missing or has the wrong type.
    InvalidArguments { reason: String },
    /// A store call the handler cannot continue without failed.
    Storage {
        operation: &'static str,
        source: StoreError,
    },
    /// The handler result could not be serialized.
    Encoding { reason: String },
}

impl ToolCallError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ToolCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArguments { reason } => f.write_str(reason),
            Self::Storage { operation, source } => write!(f, "failed to {operation}: {source}"),
            Self::Encoding { reason } => write!(f, "failed to encode result: {reason}"),
        }
    }
}

impl std::error::Error for ToolCallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_messages() {
        assert_eq!(EnvelopeError::InvalidJson.to_string(), "Invalid JSON");
        assert_eq!(EnvelopeError::MethodRequired.to_string(), "Method required");
    }

    #[test]
    fn invalid_arguments_display_is_bare_reason() {
        let err = ToolCallError::invalid("user_id is required and must be a string");
        assert_eq!(err.to_string(), "user_id is required and must be a string");
    }

    #[test]
    fn storage_display_names_operation() {
        let err = ToolCallError::Storage {
            operation: "save message",
            source: StoreError::ConstraintViolation {
                reason: "disk full".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "failed to save message: constraint violation: disk full"
        );
    }
}
