//! Tool protocol for the parley relay.
//!
//! This crate provides:
//!
//! - **Envelope**: JSON-RPC request/response wrappers and the fixed error codes
//! - **Tools**: the `chat` and `history` descriptors plus typed argument decoders
//! - **ToolDispatcher**: routes one request envelope to one response envelope

pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod tools;

pub use dispatcher::{ServerInfo, ToolDispatcher};
pub use envelope::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION, ProtocolError, ResponseOutcome, ToolRequest, ToolResponse,
};
pub use error::{EnvelopeError, ToolCallError};
pub use tools::{
    CHAT_TOOL, ChatArgs, ChatResult, ContentBlock, HISTORY_TOOL, HistoryArgs, HistoryEntry,
    HistoryResult, ToolCallOutput, ToolDefinition, definitions,
};
