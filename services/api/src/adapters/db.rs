//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ChatStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use insight_chat_core::domain::{Message, MessageRole, Session, User};
use insight_chat_core::ports::{ChatStore, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ChatStore` port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn persistence(e: sqlx::Error) -> PortError {
    PortError::Persistence(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    name: String,
    avatar_url: String,
    profile_summary: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            name: self.name,
            avatar_url: self.avatar_url,
            profile_summary: self.profile_summary,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> Session {
        Session {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    session_id: Uuid,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}
impl MessageRecord {
    // The role column carries a CHECK constraint, but rows still round-trip
    // through the same parse gate as every other role string.
    fn to_domain(self) -> PortResult<Message> {
        Ok(Message {
            id: self.id,
            session_id: self.session_id,
            role: MessageRole::parse(&self.role)?,
            content: self.content,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// `ChatStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatStore for PgStore {
    async fn get_or_create_user(
        &self,
        email: &str,
        name: &str,
        avatar_url: &str,
    ) -> PortResult<User> {
        let existing = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, name, avatar_url, profile_summary FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        if let Some(record) = existing {
            return Ok(record.to_domain());
        }

        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, name, avatar_url) VALUES ($1, $2, $3, $4) \
             RETURNING id, email, name, avatar_url, profile_summary",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name)
        .bind(avatar_url)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(record.to_domain())
    }

    async fn get_profile_summary(&self, user_id: Uuid) -> PortResult<Option<String>> {
        let row = sqlx::query_scalar::<_, Option<String>>(
            "SELECT profile_summary FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        match row {
            Some(summary) => Ok(summary),
            None => Err(PortError::NotFound(format!("User {} not found", user_id))),
        }
    }

    async fn update_profile_summary(&self, user_id: Uuid, summary: &str) -> PortResult<()> {
        sqlx::query("UPDATE users SET profile_summary = $1 WHERE id = $2")
            .bind(summary)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }

    async fn create_session(&self, user_id: Uuid, title: &str) -> PortResult<Session> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "INSERT INTO sessions (id, user_id, title) VALUES ($1, $2, $3) \
             RETURNING id, user_id, title, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(record.to_domain())
    }

    async fn list_sessions(&self, user_id: Uuid) -> PortResult<Vec<Session>> {
        let records = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, user_id, title, created_at FROM sessions \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn rename_session(&self, session_id: Uuid, new_title: &str) -> PortResult<()> {
        if new_title.trim().is_empty() {
            return Err(PortError::Validation(
                "session title must not be empty".to_string(),
            ));
        }

        sqlx::query("UPDATE sessions SET title = $1 WHERE id = $2")
            .bind(new_title)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid) -> PortResult<()> {
        // The schema also cascades, but the two-step delete inside one
        // transaction keeps the no-orphans invariant independent of it.
        let mut tx = self.pool.begin().await.map_err(persistence)?;

        sqlx::query("DELETE FROM messages WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;

        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;

        tx.commit().await.map_err(persistence)?;
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> PortResult<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(
            "INSERT INTO messages (id, session_id, role, content) VALUES ($1, $2, $3, $4) \
             RETURNING id, session_id, role, content, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(role.as_str())
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;

        record.to_domain()
    }

    async fn list_messages(&self, session_id: Uuid) -> PortResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, session_id, role, content, created_at FROM messages \
             WHERE session_id = $1 ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn count_user_messages(&self, session_id: Uuid) -> PortResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE session_id = $1 AND role = 'user'",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(count)
    }
}
