//! In-process conversation store.
//!
//! Keeps everything behind one mutex. Used by tests and by deployments that
//! do not need durability.

use crate::error::StoreError;
use crate::message::{Message, NewMessage};
use crate::store::{
    ConversationStore, StoreStats, User, UserContact, effective_limit, start_of_day,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::{MessageId, UserId};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct SessionEntry {
    user_id: UserId,
    data: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    messages: Vec<Message>,
    users: Vec<User>,
    sessions: Vec<SessionEntry>,
}

/// A `ConversationStore` held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::operation("lock memory store", "mutex poisoned"))
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn append_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = MessageId::new(inner.next_id);

        // Timestamps never go backwards within the store.
        let mut created_at = Utc::now();
        if let Some(last) = inner.messages.last()
            && last.created_at > created_at
        {
            created_at = last.created_at;
        }

        let stored = message.into_stored(id, created_at);
        inner.messages.push(stored.clone());
        Ok(stored)
    }

    async fn history(&self, user_id: &UserId, limit: i64) -> Result<Vec<Message>, StoreError> {
        let limit = usize::try_from(effective_limit(limit)).unwrap_or(usize::MAX);
        let inner = self.lock()?;
        let mut recent: Vec<Message> = inner
            .messages
            .iter()
            .rev()
            .filter(|m| &m.user_id == user_id)
            .take(limit)
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }

    async fn upsert_user(&self, contact: UserContact) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut inner = self.lock()?;
        match inner.users.iter_mut().find(|u| u.user_id == contact.user_id) {
            Some(user) => {
                if contact.phone_number.is_some() {
                    user.phone_number = contact.phone_number;
                }
                if contact.name.is_some() {
                    user.name = contact.name;
                }
                user.last_seen = now;
            }
            None => inner.users.push(User {
                user_id: contact.user_id,
                phone_number: contact.phone_number,
                name: contact.name,
                created_at: now,
                last_seen: now,
            }),
        }
        Ok(())
    }

    async fn user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.users.iter().find(|u| &u.user_id == user_id).cloned())
    }

    async fn save_session(
        &self,
        user_id: &UserId,
        data: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if !inner.users.iter().any(|u| &u.user_id == user_id) {
            return Err(StoreError::ConstraintViolation {
                reason: format!("unknown user '{user_id}'"),
            });
        }
        inner.sessions.push(SessionEntry {
            user_id: user_id.clone(),
            data: data.to_string(),
            expires_at,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn active_session(&self, user_id: &UserId) -> Result<Option<String>, StoreError> {
        let now = Utc::now();
        let inner = self.lock()?;
        Ok(inner
            .sessions
            .iter()
            .filter(|s| &s.user_id == user_id && s.expires_at > now)
            .max_by_key(|s| s.created_at)
            .map(|s| s.data.clone()))
    }

    async fn purge_expired_sessions(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut inner = self.lock()?;
        let before = inner.sessions.len();
        inner.sessions.retain(|s| s.expires_at >= now);
        Ok((before - inner.sessions.len()) as u64)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let now = Utc::now();
        let midnight = start_of_day(now);
        let inner = self.lock()?;
        Ok(StoreStats {
            total_messages: inner.messages.len() as u64,
            total_users: inner.users.len() as u64,
            active_sessions: inner.sessions.iter().filter(|s| s.expires_at > now).count() as u64,
            messages_today: inner
                .messages
                .iter()
                .filter(|m| m.created_at >= midnight)
                .count() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageRole;
    use chrono::Duration;

    fn uid(raw: &str) -> UserId {
        UserId::new(raw).expect("valid id")
    }

    #[tokio::test]
    async fn append_then_history_round_trip() {
        let store = MemoryStore::new();
        let saved = store
            .append_message(NewMessage::user(uid("u1"), "hello").expect("valid"))
            .await
            .expect("append");

        let history = store.history(&uid("u1"), 20).await.expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, saved.id);
        assert_eq!(history[0].content, "hello");
        assert_eq!(history[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn ids_increase_and_history_is_oldest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .append_message(NewMessage::user(uid("u1"), format!("m{i}")).expect("valid"))
                .await
                .expect("append");
            store
                .append_message(NewMessage::user(uid("u2"), "other").expect("valid"))
                .await
                .expect("append");
        }

        let history = store.history(&uid("u1"), 3).await.expect("history");
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
        assert!(history.windows(2).all(|w| w[0].id < w[1].id));
        assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn non_positive_limit_uses_default() {
        let store = MemoryStore::new();
        for i in 0..25 {
            store
                .append_message(NewMessage::user(uid("u1"), format!("m{i}")).expect("valid"))
                .await
                .expect("append");
        }
        assert_eq!(store.history(&uid("u1"), 0).await.expect("history").len(), 20);
        assert_eq!(store.history(&uid("u1"), -1).await.expect("history").len(), 20);
    }

    #[tokio::test]
    async fn upsert_keeps_existing_metadata() {
        let store = MemoryStore::new();
        store
            .upsert_user(UserContact::new(uid("u1")).with_name("Ada").with_phone_number("1555"))
            .await
            .expect("insert");
        store
            .upsert_user(UserContact::new(uid("u1")).with_name("Ada L."))
            .await
            .expect("update");

        let user = store.user(&uid("u1")).await.expect("lookup").expect("exists");
        assert_eq!(user.name.as_deref(), Some("Ada L."));
        assert_eq!(user.phone_number.as_deref(), Some("1555"));
        assert!(user.last_seen >= user.created_at);
        assert_eq!(store.stats().await.expect("stats").total_users, 1);
    }

    #[tokio::test]
    async fn sessions_expire_and_purge() {
        let store = MemoryStore::new();
        store.upsert_user(UserContact::new(uid("u1"))).await.expect("user");

        let now = Utc::now();
        store
            .save_session(&uid("u1"), "old", now - Duration::hours(1))
            .await
            .expect("save");
        store
            .save_session(&uid("u1"), "live", now + Duration::hours(1))
            .await
            .expect("save");

        assert_eq!(
            store.active_session(&uid("u1")).await.expect("lookup").as_deref(),
            Some("live")
        );
        assert_eq!(store.stats().await.expect("stats").active_sessions, 1);
        assert_eq!(store.purge_expired_sessions().await.expect("purge"), 1);
        assert_eq!(store.purge_expired_sessions().await.expect("purge"), 0);
    }

    #[tokio::test]
    async fn session_requires_known_user() {
        let store = MemoryStore::new();
        let result = store
            .save_session(&uid("ghost"), "data", Utc::now() + Duration::hours(1))
            .await;
        assert!(matches!(result, Err(StoreError::ConstraintViolation { .. })));
    }

    #[tokio::test]
    async fn stats_count_messages() {
        let store = MemoryStore::new();
        store
            .append_message(NewMessage::user(uid("u1"), "a").expect("valid"))
            .await
            .expect("append");
        store
            .append_message(NewMessage::assistant(uid("u1"), "b").expect("valid"))
            .await
            .expect("append");

        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.total_messages, 2);
        assert_eq!(stats.messages_today, 2);
        assert_eq!(stats.total_users, 0);
    }
}
