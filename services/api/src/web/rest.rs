//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::chat_turn::{run_chat_turn, SummarySettings};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use insight_chat_core::domain::{Message, Session, User, DEFAULT_SESSION_TITLE};
use insight_chat_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        resolve_user_handler,
        create_session_handler,
        list_sessions_handler,
        rename_session_handler,
        delete_session_handler,
        list_messages_handler,
        post_message_handler,
    ),
    components(
        schemas(
            ResolveUserRequest,
            UserResponse,
            CreateSessionRequest,
            SessionResponse,
            RenameSessionRequest,
            MessageResponse,
            PostMessageRequest,
            ChatTurnResponse,
        )
    ),
    tags(
        (name = "Insight Chat API", description = "API endpoints for the chat front-end backend.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

/// Identity data already resolved by the external auth service.
#[derive(Deserialize, ToSchema)]
pub struct ResolveUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
    pub profile_summary: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            avatar_url: user.avatar_url,
            profile_summary: user.profile_summary,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Display title; defaults to "New Chat" when omitted.
    pub title: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id,
            title: session.title,
            created_at: session.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct RenameSessionRequest {
    pub title: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            session_id: message.session_id,
            role: message.role.as_str().to_string(),
            content: message.content,
            created_at: message.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct PostMessageRequest {
    pub content: String,
}

/// The full outcome of one chat turn: both persisted messages plus what the
/// summary policy did.
#[derive(Serialize, ToSchema)]
pub struct ChatTurnResponse {
    pub user_message: MessageResponse,
    pub assistant_message: MessageResponse,
    pub assistant_success: bool,
    pub profile_summary_updated: bool,
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Extracts and parses the `x-user-id` header carrying the resolved identity.
fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, (StatusCode, String)> {
    let user_id_str = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "x-user-id header is required".to_string(),
            )
        })?;

    Uuid::parse_str(user_id_str).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "Invalid x-user-id format".to_string(),
        )
    })
}

/// Maps a port error from a write operation to an HTTP response. Reads do not
/// use this: a failed read degrades to an empty collection instead.
fn write_error_response(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Persistence(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "A storage error occurred".to_string(),
        ),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Resolve an authenticated identity to a user row, creating it on first login.
#[utoipa::path(
    post,
    path = "/users/resolve",
    request_body = ResolveUserRequest,
    responses(
        (status = 200, description = "User resolved", body = UserResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn resolve_user_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<ResolveUserRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match app_state
        .store
        .get_or_create_user(&req.email, &req.name, &req.avatar_url)
        .await
    {
        Ok(user) => Ok(Json(UserResponse::from(user))),
        Err(e) => {
            error!("Failed to resolve user: {:?}", e);
            Err(write_error_response(e))
        }
    }
}

/// Create a new chat session for the calling user.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created successfully", body = SessionResponse),
        (status = 400, description = "Bad request (e.g., missing header)"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn create_session_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let title = req
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string());

    match app_state.store.create_session(user_id, &title).await {
        Ok(session) => Ok((StatusCode::CREATED, Json(SessionResponse::from(session)))),
        Err(e) => {
            error!("Failed to create session: {:?}", e);
            Err(write_error_response(e))
        }
    }
}

/// List the calling user's sessions, most recent first.
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "Sessions for the user", body = [SessionResponse]),
        (status = 400, description = "Bad request (e.g., missing header)")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;

    // Reads degrade: the UI shows an empty list rather than an error page.
    let sessions = match app_state.store.list_sessions(user_id).await {
        Ok(sessions) => sessions,
        Err(e) => {
            error!("Failed to list sessions for user {}: {:?}", user_id, e);
            Vec::new()
        }
    };

    let response: Vec<SessionResponse> = sessions.into_iter().map(SessionResponse::from).collect();
    Ok(Json(response))
}

/// Rename a session.
#[utoipa::path(
    patch,
    path = "/sessions/{session_id}",
    request_body = RenameSessionRequest,
    responses(
        (status = 204, description = "Session renamed"),
        (status = 400, description = "Empty title"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("session_id" = Uuid, Path, description = "The session to rename.")
    )
)]
pub async fn rename_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<RenameSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match app_state.store.rename_session(session_id, &req.title).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to rename session {}: {:?}", session_id, e);
            Err(write_error_response(e))
        }
    }
}

/// Delete a session and all of its messages.
#[utoipa::path(
    delete,
    path = "/sessions/{session_id}",
    responses(
        (status = 204, description = "Session and its messages deleted"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("session_id" = Uuid, Path, description = "The session to delete.")
    )
)]
pub async fn delete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match app_state.store.delete_session(session_id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to delete session {}: {:?}", session_id, e);
            Err(write_error_response(e))
        }
    }
}

/// List a session's messages in chronological order.
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/messages",
    responses(
        (status = 200, description = "Messages for the session, oldest first", body = [MessageResponse])
    ),
    params(
        ("session_id" = Uuid, Path, description = "The session whose messages to list.")
    )
)]
pub async fn list_messages_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let messages = match app_state.store.list_messages(session_id).await {
        Ok(messages) => messages,
        Err(e) => {
            error!("Failed to list messages for session {}: {:?}", session_id, e);
            Vec::new()
        }
    };

    let response: Vec<MessageResponse> = messages.into_iter().map(MessageResponse::from).collect();
    Ok(Json(response))
}

/// Run one chat turn: persist the user message, get and persist the assistant
/// reply, and maybe refresh the profile digest.
#[utoipa::path(
    post,
    path = "/sessions/{session_id}/messages",
    request_body = PostMessageRequest,
    responses(
        (status = 200, description = "Chat turn completed", body = ChatTurnResponse),
        (status = 400, description = "Bad request (e.g., empty content or missing header)"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("session_id" = Uuid, Path, description = "The session receiving the message."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn post_message_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;

    let settings = SummarySettings {
        threshold: app_state.config.summary_threshold,
        recency_window: app_state.config.summary_recency_window,
        top_words: app_state.config.summary_top_words,
    };

    let outcome = run_chat_turn(
        app_state.store.as_ref(),
        app_state.assistant.as_ref(),
        user_id,
        session_id,
        &req.content,
        settings,
    )
    .await
    .map_err(|e| {
        error!("Chat turn failed for session {}: {:?}", session_id, e);
        write_error_response(e)
    })?;

    Ok(Json(ChatTurnResponse {
        user_message: MessageResponse::from(outcome.user_message),
        assistant_message: MessageResponse::from(outcome.assistant_message),
        assistant_success: outcome.assistant_success,
        profile_summary_updated: outcome.profile_summary_updated,
    }))
}
