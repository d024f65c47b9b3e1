//! Conversation store contract.
//!
//! The store owns three logical tables: append-only messages, one row per
//! user (upserted on contact), and expiring sessions that a background task
//! purges. Implementations must be safe for concurrent use and serialize
//! their own writes; callers hold no locks around store calls.

use crate::error::StoreError;
use crate::message::{Message, NewMessage};
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use parley_core::UserId;
use serde::{Deserialize, Serialize};

/// History length used when a caller asks for a non-positive limit.
pub const DEFAULT_HISTORY_LIMIT: i64 = 20;

/// Replaces a non-positive limit with [`DEFAULT_HISTORY_LIMIT`].
#[must_use]
pub fn effective_limit(limit: i64) -> i64 {
    if limit <= 0 {
        DEFAULT_HISTORY_LIMIT
    } else {
        limit
    }
}

/// Returns midnight UTC of the calendar day containing `now`.
#[must_use]
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

/// Contact details recorded when a user reaches out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContact {
    /// The user being upserted.
    pub user_id: UserId,
    /// Phone number, if known. `None` keeps the stored value.
    pub phone_number: Option<String>,
    /// Display name, if known. `None` keeps the stored value.
    pub name: Option<String>,
}

impl UserContact {
    /// Creates a contact with no metadata.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            phone_number: None,
            name: None,
        }
    }

    /// Sets the phone number.
    #[must_use]
    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A stored user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The user's identifier.
    pub user_id: UserId,
    /// Phone number, if ever recorded.
    pub phone_number: Option<String>,
    /// Display name, if ever recorded.
    pub name: Option<String>,
    /// When the user was first seen.
    pub created_at: DateTime<Utc>,
    /// When the user was last upserted.
    pub last_seen: DateTime<Utc>,
}

/// Aggregate counts reported by the stats endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// All stored messages.
    pub total_messages: u64,
    /// All known users.
    pub total_users: u64,
    /// Sessions whose expiry is in the future.
    pub active_sessions: u64,
    /// Messages created since midnight UTC.
    pub messages_today: u64,
}

/// Trait for durable conversation storage.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Appends a message and returns it with its assigned id and timestamp.
    async fn append_message(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// Returns up to `limit` most recent messages for a user, oldest first.
    ///
    /// A non-positive `limit` means [`DEFAULT_HISTORY_LIMIT`].
    async fn history(&self, user_id: &UserId, limit: i64) -> Result<Vec<Message>, StoreError>;

    /// Creates the user or refreshes its contact details and last-seen time.
    async fn upsert_user(&self, contact: UserContact) -> Result<(), StoreError>;

    /// Looks up a user.
    async fn user(&self, user_id: &UserId) -> Result<Option<User>, StoreError>;

    /// Records session data for a known user until `expires_at`.
    async fn save_session(
        &self,
        user_id: &UserId,
        data: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Returns the newest unexpired session data for a user.
    async fn active_session(&self, user_id: &UserId) -> Result<Option<String>, StoreError>;

    /// Deletes expired sessions and returns how many were removed.
    async fn purge_expired_sessions(&self) -> Result<u64, StoreError>;

    /// Returns aggregate counts.
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}
