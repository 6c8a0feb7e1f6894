//! crates/insight_chat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{AssistantReply, Message, MessageRole, Session, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Malformed input to a core operation (bad role, empty title, zero threshold).
    #[error("Invalid input: {0}")]
    Validation(String),
    /// A store read or write failed. Callers decide how to surface this:
    /// reads may degrade to an empty result, writes must report.
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The persistence port: users, sessions, and messages with ownership and
/// ordering guarantees. Every call reflects the store's state at call time;
/// there is no caching layer in the core.
#[async_trait]
pub trait ChatStore: Send + Sync {
    // --- User Management ---

    /// Looks up a user by email, creating the row on first resolution.
    async fn get_or_create_user(
        &self,
        email: &str,
        name: &str,
        avatar_url: &str,
    ) -> PortResult<User>;

    async fn get_profile_summary(&self, user_id: Uuid) -> PortResult<Option<String>>;

    async fn update_profile_summary(&self, user_id: Uuid, summary: &str) -> PortResult<()>;

    // --- Session Management ---

    async fn create_session(&self, user_id: Uuid, title: &str) -> PortResult<Session>;

    /// All sessions owned by `user_id`, ordered by `created_at` descending.
    /// A user with no sessions gets an empty Vec, never an error.
    async fn list_sessions(&self, user_id: Uuid) -> PortResult<Vec<Session>>;

    /// Idempotent title update. An empty title is a `Validation` error.
    async fn rename_session(&self, session_id: Uuid, new_title: &str) -> PortResult<()>;

    /// Removes the session and all of its messages. No message row referencing
    /// `session_id` may survive this call.
    async fn delete_session(&self, session_id: Uuid) -> PortResult<()>;

    // --- Message Management ---

    async fn append_message(
        &self,
        session_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> PortResult<Message>;

    /// All messages in the session, ordered by `created_at` ascending.
    async fn list_messages(&self, session_id: Uuid) -> PortResult<Vec<Message>>;

    /// Count of messages in the session with role == user. Input to the
    /// summary trigger policy.
    async fn count_user_messages(&self, session_id: Uuid) -> PortResult<i64>;
}

/// The boundary adapter to the external reasoning service.
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Sends one chat turn to the reasoning webhook and normalizes its reply.
    ///
    /// Infallible by contract: connection errors, timeouts, bad statuses and
    /// malformed bodies all come back as an `AssistantReply` carrying a fixed
    /// fallback string and the failure kind.
    async fn ask(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        message: &str,
        profile_summary: Option<&str>,
    ) -> AssistantReply;
}
