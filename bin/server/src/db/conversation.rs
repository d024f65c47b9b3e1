//! SQLite conversation store.
//!
//! Timestamps are written from Rust as RFC 3339 text and compared through
//! `julianday()` so differing fractional precision never skews a comparison.
//! History ordering uses the autoincrement id, which matches insertion order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_conversation::{
    ConversationStore, Message, MessageRole, NewMessage, StoreError, StoreStats, User, UserContact,
    effective_limit, start_of_day,
};
use parley_core::{MessageId, UserId};
use rootcause::Report;
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::path::Path;
use tracing::info;

/// Row type for message queries.
#[derive(FromRow)]
struct MessageRow {
    id: i64,
    user_id: String,
    content: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn try_into_message(self) -> Result<Message, StoreError> {
        let user_id = UserId::new(self.user_id).map_err(|e| StoreError::InvalidData {
            reason: e.to_string(),
        })?;
        let role: MessageRole = self.role.parse()?;
        Ok(Message {
            id: MessageId::new(self.id),
            user_id,
            content: self.content,
            role,
            created_at: self.created_at,
        })
    }
}

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    user_id: String,
    phone_number: Option<String>,
    name: Option<String>,
    created_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, StoreError> {
        let user_id = UserId::new(self.user_id).map_err(|e| StoreError::InvalidData {
            reason: e.to_string(),
        })?;
        Ok(User {
            user_id,
            phone_number: self.phone_number,
            name: self.name,
            created_at: self.created_at,
            last_seen: self.last_seen,
        })
    }
}

/// Maps a driver error, keeping constraint violations distinct.
fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| match &e {
        sqlx::Error::Database(db)
            if matches!(
                db.kind(),
                ErrorKind::ForeignKeyViolation
                    | ErrorKind::CheckViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::UniqueViolation
            ) =>
        {
            StoreError::ConstraintViolation {
                reason: db.message().to_string(),
            }
        }
        _ => StoreError::operation(operation, e.to_string()),
    }
}

/// Conversation store backed by a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and applies
    /// pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or a migration fails.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, Report<StoreError>> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::operation("open database", e.to_string()))?;

        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::operation("run migrations", e.to_string()))?;

        Ok(Self { pool })
    }

    /// Wraps an already-migrated pool.
    #[must_use]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn count(&self, operation: &'static str, sql: &str) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error(operation))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn append_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO messages (user_id, content, role, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(message.user_id().as_str())
        .bind(message.content())
        .bind(message.role().as_str())
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("insert message"))?;

        Ok(message.into_stored(MessageId::new(result.last_insert_rowid()), created_at))
    }

    async fn history(&self, user_id: &UserId, limit: i64) -> Result<Vec<Message>, StoreError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, content, role, created_at
            FROM messages
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id.as_str())
        .bind(effective_limit(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("query history"))?;

        // Newest-first from the query; callers want oldest-first.
        rows.into_iter()
            .rev()
            .map(MessageRow::try_into_message)
            .collect()
    }

    async fn upsert_user(&self, contact: UserContact) -> Result<(), StoreError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO users (user_id, phone_number, name, created_at, last_seen)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                phone_number = COALESCE(excluded.phone_number, users.phone_number),
                name = COALESCE(excluded.name, users.name),
                last_seen = excluded.last_seen
            "#,
        )
        .bind(contact.user_id.as_str())
        .bind(contact.phone_number.as_deref())
        .bind(contact.name.as_deref())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error("upsert user"))?;

        Ok(())
    }

    async fn user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT user_id, phone_number, name, created_at, last_seen
            FROM users
            WHERE user_id = ?
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("query user"))?;

        row.map(UserRow::try_into_user).transpose()
    }

    async fn save_session(
        &self,
        user_id: &UserId,
        data: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (user_id, session_data, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id.as_str())
        .bind(data)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error("insert session"))?;

        Ok(())
    }

    async fn active_session(&self, user_id: &UserId) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar(
            r#"
            SELECT session_data
            FROM sessions
            WHERE user_id = ? AND julianday(expires_at) > julianday(?)
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("query session"))
    }

    async fn purge_expired_sessions(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE julianday(expires_at) < julianday(?)")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(db_error("delete expired sessions"))?;

        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let now = Utc::now();

        let total_messages = self
            .count("count messages", "SELECT COUNT(*) FROM messages")
            .await?;
        let total_users = self.count("count users", "SELECT COUNT(*) FROM users").await?;

        let active_sessions: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE julianday(expires_at) > julianday(?)",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count active sessions"))?;

        let messages_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE julianday(created_at) >= julianday(?)",
        )
        .bind(start_of_day(now))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count today's messages"))?;

        Ok(StoreStats {
            total_messages,
            total_users,
            active_sessions: u64::try_from(active_sessions).unwrap_or_default(),
            messages_today: u64::try_from(messages_today).unwrap_or_default(),
        })
    }
}
