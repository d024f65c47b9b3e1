//! Tool descriptors and typed arguments.
//!
//! Arguments arrive as a loose JSON object. Each tool decodes them into a
//! typed struct up front so handlers never see a missing or mistyped field.

use crate::error::ToolCallError;
use chrono::SecondsFormat;
use parley_conversation::{Message, MessageRole};
use parley_core::{MessageId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Name of the chat tool.
pub const CHAT_TOOL: &str = "chat";

/// Name of the history tool.
pub const HISTORY_TOOL: &str = "history";

/// A tool as advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for the arguments object.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Creates a new tool definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// The two tools this server exposes, `chat` first.
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            CHAT_TOOL,
            "Send a chat message and get an AI response",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "Unique identifier for the user"
                    },
                    "message": {
                        "type": "string",
                        "description": "The message content"
                    }
                },
                "required": ["user_id", "message"]
            }),
        ),
        ToolDefinition::new(
            HISTORY_TOOL,
            "Get chat history for a user",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {
                        "type": "string",
                        "description": "Unique identifier for the user"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of messages to return",
                        "default": 20
                    }
                },
                "required": ["user_id"]
            }),
        ),
    ]
}

fn required_string<'a>(
    arguments: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, ToolCallError> {
    match arguments.get(key) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value),
        _ => Err(ToolCallError::invalid(format!(
            "{key} is required and must be a string"
        ))),
    }
}

fn required_user_id(arguments: &Map<String, Value>) -> Result<UserId, ToolCallError> {
    let raw = required_string(arguments, "user_id")?;
    UserId::new(raw).map_err(|e| ToolCallError::invalid(e.to_string()))
}

/// Arguments of the `chat` tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatArgs {
    /// The conversation participant.
    pub user_id: UserId,
    /// The inbound message text.
    pub message: String,
}

impl ChatArgs {
    /// Decodes `chat` arguments.
    ///
    /// # Errors
    ///
    /// Returns `ToolCallError::InvalidArguments` if `user_id` or `message`
    /// is missing, empty, or not a string.
    pub fn from_arguments(arguments: &Map<String, Value>) -> Result<Self, ToolCallError> {
        let user_id = required_user_id(arguments)?;
        let message = required_string(arguments, "message")?.to_string();
        Ok(Self { user_id, message })
    }
}

/// Arguments of the `history` tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryArgs {
    /// The conversation participant.
    pub user_id: UserId,
    /// Requested limit, truncated to an integer. Non-positive values are
    /// replaced by the store default.
    pub limit: Option<i64>,
}

impl HistoryArgs {
    /// Decodes `history` arguments.
    ///
    /// # Errors
    ///
    /// Returns `ToolCallError::InvalidArguments` if `user_id` is missing or
    /// not a string, or if `limit` is present but not a number.
    pub fn from_arguments(arguments: &Map<String, Value>) -> Result<Self, ToolCallError> {
        let user_id = required_user_id(arguments)?;
        let limit = match arguments.get("limit") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Some(_) => return Err(ToolCallError::invalid("limit must be a number")),
        };
        Ok(Self { user_id, limit })
    }
}

/// Result of the `chat` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResult {
    /// The assistant reply.
    pub response: String,
    /// The conversation participant.
    pub user_id: UserId,
}

/// One message in a `history` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: MessageId,
    pub user_id: UserId,
    pub content: String,
    pub role: MessageRole,
    /// RFC 3339, second precision.
    pub created_at: String,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            user_id: message.user_id.clone(),
            content: message.content.clone(),
            role: message.role,
            created_at: message.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Result of the `history` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResult {
    /// Oldest first.
    pub messages: Vec<HistoryEntry>,
    /// The conversation participant.
    pub user_id: UserId,
}

/// A `{type, text}` content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// The `result` payload of a successful `tools/call`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallOutput {
    pub content: Vec<ContentBlock>,
}

impl ToolCallOutput {
    /// Wraps `result`, serialized as JSON text, in a single text block.
    ///
    /// # Errors
    ///
    /// Returns `ToolCallError::Encoding` if `result` cannot be serialized.
    pub fn text<T: Serialize>(result: &T) -> Result<Self, ToolCallError> {
        let text = serde_json::to_string(result).map_err(|e| ToolCallError::Encoding {
            reason: e.to_string(),
        })?;
        Ok(Self {
            content: vec![ContentBlock {
                kind: "text".to_string(),
                text,
            }],
        })
    }
}
