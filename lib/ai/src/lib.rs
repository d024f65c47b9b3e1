//! Completion provider primitives for the parley relay.
//!
//! This crate provides:
//!
//! - **Conversation window**: the bounded, ordered message list sent to a provider
//! - **CompletionProvider**: the request/response contract the dispatcher depends on
//! - **OpenAI-compatible client**: a `reqwest` implementation for hosted chat-completion APIs

pub mod backend;
pub mod error;
pub mod openai;

pub use backend::{
    ChatMessage, ChatRole, CompletionProvider, CompletionSettings, ConversationWindow,
};
pub use error::LlmError;
pub use openai::OpenAiCompatibleProvider;
