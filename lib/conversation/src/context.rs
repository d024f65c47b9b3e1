//! Context window assembly.
//!
//! Turns whatever history the store returned into the bounded window sent
//! to a completion provider. Never touches storage itself.

use crate::message::Message;
use parley_ai::{ChatMessage, ConversationWindow};

/// Directive prepended to every window.
pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant integrated with WhatsApp. \
Provide concise, helpful responses to user messages. \
Keep responses conversational and appropriate for a messaging context.";

/// Maximum number of stored messages carried into a window.
pub const CONTEXT_WINDOW_LIMIT: usize = 10;

/// Builds provider windows from stored history.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
    limit: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
            limit: CONTEXT_WINDOW_LIMIT,
        }
    }
}

impl ContextBuilder {
    /// Creates a builder with the default directive and history limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the system directive.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Returns the history limit.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Builds `system + last N of history + new message`.
    ///
    /// `history` must be oldest-first; only its most recent `limit`
    /// entries are kept, in their original order.
    #[must_use]
    pub fn build(&self, history: &[Message], new_message: &str) -> ConversationWindow {
        let start = history.len().saturating_sub(self.limit);

        let mut window = ConversationWindow::with_system(self.system_prompt.clone());
        for message in &history[start..] {
            window.push(message.to_chat_message());
        }
        window.push(ChatMessage::user(new_message));
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageRole, NewMessage};
    use chrono::Utc;
    use parley_ai::ChatRole;
    use parley_core::{MessageId, UserId};

    fn history(count: usize) -> Vec<Message> {
        let user_id = UserId::new("u1").expect("valid id");
        (0..count)
            .map(|i| {
                let role = if i % 2 == 0 {
                    MessageRole::User
                } else {
                    MessageRole::Assistant
                };
                NewMessage::new(user_id.clone(), format!("m{i}"), role)
                    .expect("valid")
                    .into_stored(MessageId::new(i as i64 + 1), Utc::now())
            })
            .collect()
    }

    #[test]
    fn fifteen_stored_messages_keep_last_ten_plus_new() {
        let window = ContextBuilder::new().build(&history(15), "new");

        let messages = window.messages();
        let turns = messages.iter().filter(|m| m.role != ChatRole::System).count();
        assert_eq!(turns, 11);
        assert_eq!(window.len(), 12);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1].content, "m5");
        assert_eq!(messages[10].content, "m14");
        assert_eq!(messages[11], ChatMessage::user("new"));
    }

    #[test]
    fn short_history_is_kept_whole() {
        let window = ContextBuilder::new().build(&history(3), "next");

        let contents: Vec<_> = window.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec![SYSTEM_PROMPT, "m0", "m1", "m2", "next"]);
        assert_eq!(window.messages()[2].role, ChatRole::Assistant);
    }

    #[test]
    fn empty_history_yields_system_and_message() {
        let window = ContextBuilder::new().build(&[], "hi");
        assert_eq!(window.len(), 2);
        assert_eq!(window.last(), Some(&ChatMessage::user("hi")));
    }

    #[test]
    fn custom_system_prompt() {
        let window = ContextBuilder::new()
            .with_system_prompt("Answer in French.")
            .build(&[], "hi");
        assert_eq!(window.messages()[0], ChatMessage::system("Answer in French."));
    }
}
