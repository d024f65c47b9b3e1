//! Canned replies for when no completion provider answers.
//!
//! Selection is a pure function of the message text: the sum of its
//! Unicode code points modulo the list length. Identical input always
//! yields identical output.

use crate::error::ConversationError;

/// The canned replies used by [`FallbackResponder::default`], in selection order.
pub const DEFAULT_FALLBACK_RESPONSES: [&str; 5] = [
    "I understand what you're saying. Let me help you with that.",
    "That's an interesting point. Here's what I think about it.",
    "I see what you mean. Let me provide some assistance.",
    "Thanks for sharing that with me. I'm here to help.",
    "I appreciate your message. How can I assist you further?",
];

fn code_point_sum(message: &str) -> u64 {
    message
        .chars()
        .map(|c| u64::from(u32::from(c)))
        .fold(0, u64::wrapping_add)
}

/// Picks the reply for `message` from `responses`.
///
/// Returns `None` only when `responses` is empty.
#[must_use]
pub fn select_fallback<'a, S: AsRef<str>>(responses: &'a [S], message: &str) -> Option<&'a str> {
    if responses.is_empty() {
        return None;
    }
    let index = (code_point_sum(message) % responses.len() as u64) as usize;
    responses.get(index).map(AsRef::as_ref)
}

/// Deterministic, provider-independent reply generator.
#[derive(Debug, Clone)]
pub struct FallbackResponder {
    responses: Vec<String>,
}

impl Default for FallbackResponder {
    fn default() -> Self {
        Self {
            responses: DEFAULT_FALLBACK_RESPONSES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl FallbackResponder {
    /// Creates a responder over a custom ordered list.
    ///
    /// # Errors
    ///
    /// Returns an error if `responses` is empty.
    pub fn new(responses: Vec<String>) -> Result<Self, ConversationError> {
        if responses.is_empty() {
            return Err(ConversationError::EmptyFallbackList);
        }
        Ok(Self { responses })
    }

    /// Returns the canned reply for `message`.
    #[must_use]
    pub fn respond(&self, message: &str) -> &str {
        select_fallback(self.responses.as_slice(), message).unwrap_or_default()
    }

    /// Returns the ordered reply list.
    #[must_use]
    pub fn responses(&self) -> &[String] {
        &self.responses
    }
}
