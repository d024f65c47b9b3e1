//! JSON-RPC envelope types.

use crate::error::EnvelopeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `jsonrpc` field of every response.
pub const JSONRPC_VERSION: &str = "2.0";

/// The protocol version announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method or tool does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Any failure inside a tool handler.
pub const INTERNAL_ERROR: i64 = -32603;

/// A decoded inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    /// Correlation token, echoed verbatim. `Null` when absent.
    pub id: Value,
    /// The requested method.
    pub method: String,
    /// Method parameters, if any were sent.
    pub params: Option<Value>,
}

impl ToolRequest {
    /// Creates a request with no id or params.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            id: Value::Null,
            method: method.into(),
            params: None,
        }
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the params.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Decodes a request body.
    ///
    /// # Errors
    ///
    /// Returns `EnvelopeError::InvalidJson` if the body is not a JSON object
    /// and `EnvelopeError::MethodRequired` if it has no string `method`.
    pub fn from_slice(body: &[u8]) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| EnvelopeError::InvalidJson)?;
        let Value::Object(mut fields) = value else {
            return Err(EnvelopeError::InvalidJson);
        };

        let method = match fields.remove("method") {
            Some(Value::String(method)) => method,
            _ => return Err(EnvelopeError::MethodRequired),
        };

        Ok(Self {
            id: fields.remove("id").unwrap_or(Value::Null),
            method,
            params: fields.remove("params"),
        })
    }
}

/// The `error` member of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolError {
    /// One of the fixed error codes.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

impl ProtocolError {
    /// Creates an error object.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOutcome {
    /// Successful result payload.
    Result(Value),
    /// Protocol error object.
    Error(ProtocolError),
}

/// An outbound response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Always [`JSONRPC_VERSION`].
    pub jsonrpc: String,
    /// Echoed from the request.
    pub id: Value,
    /// Result or error.
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
}

impl ToolResponse {
    /// Creates a success response.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            outcome: ResponseOutcome::Result(result),
        }
    }

    /// Creates an error response.
    #[must_use]
    pub fn failure(id: Value, error: ProtocolError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            outcome: ResponseOutcome::Error(error),
        }
    }

    /// The result payload, if this is a success.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Result(value) => Some(value),
            ResponseOutcome::Error(_) => None,
        }
    }

    /// The error object, if this is a failure.
    #[must_use]
    pub fn error(&self) -> Option<&ProtocolError> {
        match &self.outcome {
            ResponseOutcome::Result(_) => None,
            ResponseOutcome::Error(error) => Some(error),
        }
    }
}
