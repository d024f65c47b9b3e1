//! Completion provider abstraction.
//!
//! Provides the window type handed to a provider and the trait every hosted
//! chat-completion backend implements.

use crate::error::LlmError;
use async_trait::async_trait;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The role of a message inside a conversation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System directive.
    System,
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
}

/// A single `{role, content}` entry sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: ChatRole,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, oldest-first message list prefixed by a system directive.
///
/// Windows are built per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationWindow {
    messages: Vec<ChatMessage>,
}

impl ConversationWindow {
    /// Starts a window with the given system directive.
    #[must_use]
    pub fn with_system(directive: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(directive)],
        }
    }

    /// Appends a message at the end of the window.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Returns the messages in send order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the number of entries, system directive included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns whether the window has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

/// Fixed request parameters applied by a provider to every completion.
///
/// These are deployment settings, never caller-controlled.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl CompletionSettings {
    /// Creates settings for a model with the default sampling parameters.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Trait for hosted chat-completion backends.
///
/// Implementations apply their own timeout and return an error on any
/// non-success status or malformed response. Callers treat every error the
/// same way.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generates the assistant reply for the given window.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails or yields no reply.
    async fn complete(&self, window: &ConversationWindow) -> Result<String, Report<LlmError>>;

    /// Returns the model name.
    fn model(&self) -> &str;
}
