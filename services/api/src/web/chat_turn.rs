//! services/api/src/web/chat_turn.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! handling a single chat turn: persist the user's message, get a reply from
//! the assistant gateway, persist that reply, and give the summary policy a
//! chance to refresh the user's profile digest.

use insight_chat_core::domain::{Message, MessageRole};
use insight_chat_core::ports::{AssistantService, ChatStore, PortError, PortResult};
use insight_chat_core::summary;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Summary policy knobs, copied out of `Config` so this module stays
/// independent of the configuration layer.
#[derive(Debug, Clone, Copy)]
pub struct SummarySettings {
    /// A digest recompute fires on every `threshold`-th user message.
    pub threshold: u64,
    /// How many recent user messages feed the digest.
    pub recency_window: usize,
    /// How many tokens the digest contains.
    pub top_words: usize,
}

/// What one completed chat turn produced.
#[derive(Debug, Clone)]
pub struct ChatTurnOutcome {
    pub user_message: Message,
    pub assistant_message: Message,
    /// False when the assistant reply is a gateway fallback string.
    pub assistant_success: bool,
    pub profile_summary_updated: bool,
}

/// Runs one synchronous chat turn.
///
/// Message persistence failures surface to the caller; a failed assistant call
/// does not (the fallback reply is persisted like any other assistant turn),
/// and a failure anywhere in the summary stage is logged and swallowed so it
/// can never break the conversation.
pub async fn run_chat_turn(
    store: &dyn ChatStore,
    assistant: &dyn AssistantService,
    user_id: Uuid,
    session_id: Uuid,
    content: &str,
    settings: SummarySettings,
) -> PortResult<ChatTurnOutcome> {
    if content.trim().is_empty() {
        return Err(PortError::Validation(
            "message content must not be empty".to_string(),
        ));
    }

    let user_message = store
        .append_message(session_id, MessageRole::User, content)
        .await?;

    // The profile digest is personalization context only, so a failed read
    // degrades to "no summary" rather than failing the turn.
    let profile_summary = match store.get_profile_summary(user_id).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!("Failed to read profile summary for user {}: {}", user_id, e);
            None
        }
    };

    let reply = assistant
        .ask(user_id, session_id, content, profile_summary.as_deref())
        .await;
    if let Some(failure) = reply.failure {
        warn!(
            "Assistant call failed ({:?}) for session {}; persisting fallback reply",
            failure, session_id
        );
    }

    let assistant_message = store
        .append_message(session_id, MessageRole::Assistant, &reply.reply)
        .await?;

    let profile_summary_updated =
        match maybe_update_profile(store, user_id, session_id, settings).await {
            Ok(updated) => updated,
            Err(e) => {
                error!(
                    "Profile summary update failed for user {}: {}",
                    user_id, e
                );
                false
            }
        };

    Ok(ChatTurnOutcome {
        user_message,
        assistant_message,
        assistant_success: reply.success,
        profile_summary_updated,
    })
}

/// Checks the trigger policy and, when due, recomputes and stores the digest.
/// Returns whether a new digest was written.
async fn maybe_update_profile(
    store: &dyn ChatStore,
    user_id: Uuid,
    session_id: Uuid,
    settings: SummarySettings,
) -> PortResult<bool> {
    let user_message_count = store.count_user_messages(session_id).await?;
    if !summary::should_update(user_message_count.max(0) as u64, settings.threshold)? {
        return Ok(false);
    }

    let messages = store.list_messages(session_id).await?;
    let window = summary::recent_user_messages(&messages, settings.recency_window);
    let digest = summary::generate_summary(&window, settings.top_words);

    // An empty digest means "nothing to summarize"; the stored value is left alone.
    if digest.is_empty() {
        return Ok(false);
    }

    store.update_profile_summary(user_id, &digest).await?;
    info!(
        "Updated profile summary for user {} after {} user messages",
        user_id, user_message_count
    );
    Ok(true)
}
