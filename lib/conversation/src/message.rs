//! Message types for conversations.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use parley_ai::{ChatMessage, ChatRole};
use parley_core::{MessageId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The role of a stored message's author.
///
/// Only users and the assistant are ever persisted; the system directive
/// lives in the context window alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
}

impl MessageRole {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(StoreError::InvalidData {
                reason: format!("role must be 'user' or 'assistant', got '{other}'"),
            }),
        }
    }
}

impl From<MessageRole> for ChatRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => ChatRole::User,
            MessageRole::Assistant => ChatRole::Assistant,
        }
    }
}

/// A persisted message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned identifier.
    pub id: MessageId,
    /// The conversation participant.
    pub user_id: UserId,
    /// Message content.
    pub content: String,
    /// Message role.
    pub role: MessageRole,
    /// When the message was stored.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Converts this message into a provider window entry.
    #[must_use]
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role.into(),
            content: self.content.clone(),
        }
    }
}

/// A message that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    user_id: UserId,
    content: String,
    role: MessageRole,
}

impl NewMessage {
    /// Creates a new message.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if the content is empty.
    pub fn new(
        user_id: UserId,
        content: impl Into<String>,
        role: MessageRole,
    ) -> Result<Self, StoreError> {
        let content = content.into();
        if content.is_empty() {
            return Err(StoreError::InvalidInput {
                reason: "message content is required".to_string(),
            });
        }
        Ok(Self {
            user_id,
            content,
            role,
        })
    }

    /// Creates a user message.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if the content is empty.
    pub fn user(user_id: UserId, content: impl Into<String>) -> Result<Self, StoreError> {
        Self::new(user_id, content, MessageRole::User)
    }

    /// Creates an assistant message.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if the content is empty.
    pub fn assistant(user_id: UserId, content: impl Into<String>) -> Result<Self, StoreError> {
        Self::new(user_id, content, MessageRole::Assistant)
    }

    /// The conversation participant.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The message content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The message role.
    #[must_use]
    pub fn role(&self) -> MessageRole {
        self.role
    }

    /// Attaches the store-assigned fields.
    #[must_use]
    pub fn into_stored(self, id: MessageId, created_at: DateTime<Utc>) -> Message {
        Message {
            id,
            user_id: self.user_id,
            content: self.content,
            role: self.role,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_id() -> UserId {
        UserId::new("u1").expect("valid id")
    }

    #[test]
    fn role_parses_only_user_and_assistant() {
        assert_eq!("user".parse::<MessageRole>(), Ok(MessageRole::User));
        assert_eq!("assistant".parse::<MessageRole>(), Ok(MessageRole::Assistant));
        assert!("system".parse::<MessageRole>().is_err());
        assert!("User".parse::<MessageRole>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&MessageRole::Assistant).expect("serialize");
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn new_message_rejects_empty_content() {
        assert!(NewMessage::user(user_id(), "").is_err());
    }

    #[test]
    fn stored_message_keeps_fields() {
        let now = Utc::now();
        let msg = NewMessage::assistant(user_id(), "hello")
            .expect("valid")
            .into_stored(MessageId::new(3), now);

        assert_eq!(msg.id, MessageId::new(3));
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.created_at, now);
    }

    #[test]
    fn chat_message_conversion() {
        let msg = NewMessage::user(user_id(), "hi")
            .expect("valid")
            .into_stored(MessageId::new(1), Utc::now());
        let chat = msg.to_chat_message();
        assert_eq!(chat.role, ChatRole::User);
        assert_eq!(chat.content, "hi");
    }
}
