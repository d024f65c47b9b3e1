//! Conversation service for the parley relay.
//!
//! This crate provides:
//!
//! - **Messages**: Persisted user/assistant turns and their roles
//! - **Context Builder**: Bounded provider windows assembled from stored history
//! - **Fallback Responder**: Deterministic replies used when no provider answers
//! - **Conversation Store**: The storage contract plus an in-memory implementation

pub mod context;
pub mod error;
pub mod fallback;
pub mod memory;
pub mod message;
pub mod store;

pub use context::{CONTEXT_WINDOW_LIMIT, ContextBuilder, SYSTEM_PROMPT};
pub use error::{ConversationError, StoreError};
pub use fallback::{DEFAULT_FALLBACK_RESPONSES, FallbackResponder, select_fallback};
pub use memory::MemoryStore;
pub use message::{Message, MessageRole, NewMessage};
pub use store::{
    ConversationStore, DEFAULT_HISTORY_LIMIT, StoreStats, User, UserContact, effective_limit,
    start_of_day,
};
