//! Error types for the integration crate.

use std::fmt;

/// Errors from the messaging channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationError {
    /// A required setting is missing.
    NotConfigured { setting: &'static str },
    /// The HTTP request could not be sent or completed.
    RequestFailed { reason: String },
    /// The API answered with a non-success status.
    Api { status: u16, body: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
}

impl fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured { setting } => write!(f, "WhatsApp {setting} not configured"),
            Self::RequestFailed { reason } => write!(f, "failed to send request: {reason}"),
            Self::Api { status, body } => {
                write!(f, "WhatsApp API returned status {status}: {body}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to decode response: {reason}")
            }
        }
    }
}

impl std::error::Error for IntegrationError {}
