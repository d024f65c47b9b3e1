//! Error types for the server.
//!
//! - `AppError`: Handler failures, rendered as user-safe HTTP responses
//! - `StartupError`: Failures that abort process startup

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;

/// Handler errors returned to HTTP clients.
#[derive(Debug)]
pub enum AppError {
    /// The request body could not be accepted.
    BadRequest(String),
    /// Webhook verification failed.
    Forbidden,
    /// Aggregate statistics could not be read.
    Stats(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            Self::Stats(msg) => {
                tracing::error!("Failed to get stats: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to get stats".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

/// Errors that abort startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    /// Configuration could not be loaded.
    Config { reason: String },
    /// The database could not be opened or migrated.
    Database { reason: String },
    /// An HTTP client could not be built.
    Client { reason: String },
    /// The listener could not be bound or the server failed.
    Serve { reason: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
            Self::Database { reason } => write!(f, "database error: {reason}"),
            Self::Client { reason } => write!(f, "failed to build client: {reason}"),
            Self::Serve { reason } => write!(f, "server error: {reason}"),
        }
    }
}

impl std::error::Error for StartupError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_error_hides_detail() {
        let response = AppError::Stats("disk I/O error".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn bad_request_status() {
        let response = AppError::BadRequest("Invalid JSON".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn startup_error_display() {
        let err = StartupError::Database {
            reason: "unable to open database file".to_string(),
        };
        assert_eq!(err.to_string(), "database error: unable to open database file");
    }
}
