//! crates/insight_chat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use crate::ports::PortError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// Represents an identity record - created on first resolution, never deleted here.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
    /// Derived digest of the user's recent interests. Written only by the
    /// summary policy, and only when it produced a non-empty digest.
    pub profile_summary: Option<String>,
}

/// A conversation thread owned by exactly one user.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    /// Immutable. Sort key for listing a user's sessions, most recent first.
    pub created_at: DateTime<Utc>,
}

/// Default title for a freshly created session.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// The two recognized speakers in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    /// Parses a role string. Anything other than "user" or "assistant" is a
    /// contract violation and must be rejected before persistence.
    pub fn parse(s: &str) -> Result<Self, PortError> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(PortError::Validation(format!(
                "invalid message role '{}': must be 'user' or 'assistant'",
                other
            ))),
        }
    }
}

/// One turn in a session. Immutable once created: messages are only appended
/// and deleted with their parent session, never edited or reordered.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    /// Immutable. Sort key for chronological replay, oldest first.
    pub created_at: DateTime<Utc>,
}

/// The way an assistant call failed, when it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayFailure {
    Timeout,
    Connection,
    Http(u16),
    InvalidFormat,
    Unexpected,
}

/// The normalized outcome of one assistant call.
///
/// The gateway never propagates a failure as an error: every failure mode maps
/// to a distinct fixed fallback string in `reply`, so the caller always has
/// something to show the user and the turn always completes.
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub reply: String,
    pub success: bool,
    pub failure: Option<GatewayFailure>,
}

impl AssistantReply {
    pub fn ok(reply: String) -> Self {
        Self {
            reply,
            success: true,
            failure: None,
        }
    }

    pub fn fallback(reply: &str, failure: GatewayFailure) -> Self {
        Self {
            reply: reply.to_string(),
            success: false,
            failure: Some(failure),
        }
    }
}
