//! services/api/tests/chat_flow.rs
//!
//! Integration tests for the session/message manager contract and the chat
//! turn pipeline, driven through in-memory implementations of the core ports.

use api_lib::web::chat_turn::{run_chat_turn, SummarySettings};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use insight_chat_core::domain::{
    AssistantReply, GatewayFailure, Message, MessageRole, Session, User,
};
use insight_chat_core::ports::{AssistantService, ChatStore, PortError, PortResult};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

//=========================================================================================
// In-Memory Fakes
//=========================================================================================

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    sessions: Vec<Session>,
    messages: Vec<Message>,
    profiles: HashMap<Uuid, Option<String>>,
    seq: i64,
}

impl Inner {
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        self.seq += 1;
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::milliseconds(self.seq)
    }
}

/// An in-memory `ChatStore` honoring the same contracts as the Postgres
/// adapter: descending session listing, ascending message replay, no orphaned
/// messages after a session delete.
#[derive(Default)]
struct MemoryStore {
    inner: Mutex<Inner>,
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn get_or_create_user(
        &self,
        email: &str,
        name: &str,
        avatar_url: &str,
    ) -> PortResult<User> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.iter().find(|u| u.email == email) {
            return Ok(user.clone());
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            avatar_url: avatar_url.to_string(),
            profile_summary: None,
        };
        inner.profiles.insert(user.id, None);
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn get_profile_summary(&self, user_id: Uuid) -> PortResult<Option<String>> {
        let inner = self.inner.lock().unwrap();
        inner
            .profiles
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn update_profile_summary(&self, user_id: Uuid, summary: &str) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.profiles.insert(user_id, Some(summary.to_string()));
        Ok(())
    }

    async fn create_session(&self, user_id: Uuid, title: &str) -> PortResult<Session> {
        let mut inner = self.inner.lock().unwrap();
        let created_at = inner.next_timestamp();
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            created_at,
        };
        inner.sessions.push(session.clone());
        Ok(session)
    }

    async fn list_sessions(&self, user_id: Uuid) -> PortResult<Vec<Session>> {
        let inner = self.inner.lock().unwrap();
        let mut sessions: Vec<Session> = inner
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn rename_session(&self, session_id: Uuid, new_title: &str) -> PortResult<()> {
        if new_title.trim().is_empty() {
            return Err(PortError::Validation(
                "session title must not be empty".to_string(),
            ));
        }
        let mut inner = self.inner.lock().unwrap();
        if let Some(session) = inner.sessions.iter_mut().find(|s| s.id == session_id) {
            session.title = new_title.to_string();
        }
        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.messages.retain(|m| m.session_id != session_id);
        inner.sessions.retain(|s| s.id != session_id);
        Ok(())
    }

    async fn append_message(
        &self,
        session_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> PortResult<Message> {
        let mut inner = self.inner.lock().unwrap();
        let created_at = inner.next_timestamp();
        let message = Message {
            id: Uuid::new_v4(),
            session_id,
            role,
            content: content.to_string(),
            created_at,
        };
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, session_id: Uuid) -> PortResult<Vec<Message>> {
        let inner = self.inner.lock().unwrap();
        let mut messages: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn count_user_messages(&self, session_id: Uuid) -> PortResult<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .messages
            .iter()
            .filter(|m| m.session_id == session_id && m.role == MessageRole::User)
            .count() as i64)
    }
}

/// A scripted `AssistantService` that records what it was asked.
struct StubAssistant {
    reply: AssistantReply,
    seen_summaries: Mutex<Vec<Option<String>>>,
}

impl StubAssistant {
    fn replying(text: &str) -> Self {
        Self {
            reply: AssistantReply::ok(text.to_string()),
            seen_summaries: Mutex::new(Vec::new()),
        }
    }

    fn failing(reply: AssistantReply) -> Self {
        Self {
            reply,
            seen_summaries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AssistantService for StubAssistant {
    async fn ask(
        &self,
        _user_id: Uuid,
        _session_id: Uuid,
        _message: &str,
        profile_summary: Option<&str>,
    ) -> AssistantReply {
        self.seen_summaries
            .lock()
            .unwrap()
            .push(profile_summary.map(|s| s.to_string()));
        self.reply.clone()
    }
}

fn settings(threshold: u64) -> SummarySettings {
    SummarySettings {
        threshold,
        recency_window: 12,
        top_words: 5,
    }
}

//=========================================================================================
// Session/Message Manager Contract
//=========================================================================================

#[tokio::test]
async fn one_turn_persists_user_then_assistant_in_order() {
    let store = MemoryStore::default();
    let assistant = StubAssistant::replying("hello there");
    let user = store.get_or_create_user("a@example.com", "A", "").await.unwrap();
    let session = store.create_session(user.id, "New Chat").await.unwrap();

    run_chat_turn(&store, &assistant, user.id, session.id, "hi", settings(10))
        .await
        .unwrap();

    let messages = store.list_messages(session.id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].content, "hi");
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].content, "hello there");
    assert!(messages[0].created_at <= messages[1].created_at);
}

#[tokio::test]
async fn deleting_a_session_leaves_no_messages_behind() {
    let store = MemoryStore::default();
    let assistant = StubAssistant::replying("ok");
    let user = store.get_or_create_user("b@example.com", "B", "").await.unwrap();
    let keep = store.create_session(user.id, "keep").await.unwrap();
    let drop = store.create_session(user.id, "drop").await.unwrap();

    run_chat_turn(&store, &assistant, user.id, keep.id, "stays", settings(10))
        .await
        .unwrap();
    run_chat_turn(&store, &assistant, user.id, drop.id, "goes", settings(10))
        .await
        .unwrap();

    store.delete_session(drop.id).await.unwrap();

    let remaining: Vec<Uuid> = store
        .list_sessions(user.id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(remaining, vec![keep.id]);
    assert!(store.list_messages(drop.id).await.unwrap().is_empty());
    assert_eq!(store.list_messages(keep.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn sessions_list_most_recent_first() {
    let store = MemoryStore::default();
    let user = store.get_or_create_user("c@example.com", "C", "").await.unwrap();
    let first = store.create_session(user.id, "first").await.unwrap();
    let second = store.create_session(user.id, "second").await.unwrap();
    let third = store.create_session(user.id, "third").await.unwrap();

    let listed: Vec<Uuid> = store
        .list_sessions(user.id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(listed, vec![third.id, second.id, first.id]);
}

#[tokio::test]
async fn a_role_outside_the_enum_is_rejected_before_persistence() {
    let err = MessageRole::parse("system").unwrap_err();
    assert!(matches!(err, PortError::Validation(_)));
    assert!(MessageRole::parse("user").is_ok());
    assert!(MessageRole::parse("assistant").is_ok());
}

#[tokio::test]
async fn empty_message_content_is_rejected_without_persisting() {
    let store = MemoryStore::default();
    let assistant = StubAssistant::replying("unused");
    let user = store.get_or_create_user("d@example.com", "D", "").await.unwrap();
    let session = store.create_session(user.id, "New Chat").await.unwrap();

    let err = run_chat_turn(&store, &assistant, user.id, session.id, "   ", settings(10))
        .await
        .unwrap_err();
    assert!(matches!(err, PortError::Validation(_)));
    assert!(store.list_messages(session.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn renaming_to_an_empty_title_is_rejected() {
    let store = MemoryStore::default();
    let user = store.get_or_create_user("e@example.com", "E", "").await.unwrap();
    let session = store.create_session(user.id, "New Chat").await.unwrap();

    let err = store.rename_session(session.id, "  ").await.unwrap_err();
    assert!(matches!(err, PortError::Validation(_)));

    store.rename_session(session.id, "Quarterly numbers").await.unwrap();
    let listed = store.list_sessions(user.id).await.unwrap();
    assert_eq!(listed[0].title, "Quarterly numbers");
}

//=========================================================================================
// Gateway Behavior Within a Turn
//=========================================================================================

#[tokio::test]
async fn a_failed_assistant_call_still_completes_the_turn() {
    let store = MemoryStore::default();
    let fallback = "I'm having trouble connecting to the assistant service. Please check your configuration.";
    let assistant =
        StubAssistant::failing(AssistantReply::fallback(fallback, GatewayFailure::Connection));
    let user = store.get_or_create_user("f@example.com", "F", "").await.unwrap();
    let session = store.create_session(user.id, "New Chat").await.unwrap();

    let outcome = run_chat_turn(&store, &assistant, user.id, session.id, "hi", settings(10))
        .await
        .unwrap();

    assert!(!outcome.assistant_success);
    assert_eq!(outcome.assistant_message.content, fallback);
    // Both turns persisted despite the failure.
    assert_eq!(store.list_messages(session.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn an_existing_profile_summary_is_forwarded_to_the_gateway() {
    let store = MemoryStore::default();
    let assistant = StubAssistant::replying("ok");
    let user = store.get_or_create_user("g@example.com", "G", "").await.unwrap();
    let session = store.create_session(user.id, "New Chat").await.unwrap();

    run_chat_turn(&store, &assistant, user.id, session.id, "first", settings(10))
        .await
        .unwrap();
    store
        .update_profile_summary(user.id, "User often discusses: rust")
        .await
        .unwrap();
    run_chat_turn(&store, &assistant, user.id, session.id, "second", settings(10))
        .await
        .unwrap();

    let seen = assistant.seen_summaries.lock().unwrap().clone();
    assert_eq!(seen[0], None);
    assert_eq!(seen[1].as_deref(), Some("User often discusses: rust"));
}

//=========================================================================================
// Summary Trigger Policy Within a Turn
//=========================================================================================

#[tokio::test]
async fn the_digest_is_written_on_every_threshold_crossing() {
    let store = MemoryStore::default();
    let assistant = StubAssistant::replying("noted");
    let user = store.get_or_create_user("h@example.com", "H", "").await.unwrap();
    let session = store.create_session(user.id, "New Chat").await.unwrap();

    let mut updates = Vec::new();
    for i in 0..6 {
        let content = format!("backend systems question number {}", i);
        let outcome = run_chat_turn(&store, &assistant, user.id, session.id, &content, settings(3))
            .await
            .unwrap();
        updates.push(outcome.profile_summary_updated);
    }

    // Threshold 3: fires on user messages 3 and 6, nowhere else.
    assert_eq!(updates, vec![false, false, true, false, false, true]);

    let digest = store.get_profile_summary(user.id).await.unwrap().unwrap();
    assert!(digest.starts_with("User often discusses: "));
    assert!(digest.contains("backend"));
}

#[tokio::test]
async fn a_digest_of_only_stop_words_is_not_written() {
    let store = MemoryStore::default();
    let assistant = StubAssistant::replying("ok");
    let user = store.get_or_create_user("i@example.com", "I", "").await.unwrap();
    let session = store.create_session(user.id, "New Chat").await.unwrap();

    // Every token is a stop word or shorter than four letters.
    let outcome = run_chat_turn(&store, &assistant, user.id, session.id, "what about this", settings(1))
        .await
        .unwrap();

    assert!(!outcome.profile_summary_updated);
    assert_eq!(store.get_profile_summary(user.id).await.unwrap(), None);
}

#[tokio::test]
async fn the_recency_window_bounds_what_the_digest_sees() {
    let store = MemoryStore::default();
    let assistant = StubAssistant::replying("ok");
    let user = store.get_or_create_user("j@example.com", "J", "").await.unwrap();
    let session = store.create_session(user.id, "New Chat").await.unwrap();

    let narrow = SummarySettings {
        threshold: 4,
        recency_window: 2,
        top_words: 5,
    };

    // The early "kubernetes" messages fall outside the 2-message window by the
    // time the trigger fires on the fourth turn.
    for content in [
        "kubernetes clusters everywhere",
        "kubernetes again",
        "databases databases databases",
        "compilers compilers",
    ] {
        run_chat_turn(&store, &assistant, user.id, session.id, content, narrow)
            .await
            .unwrap();
    }

    let digest = store.get_profile_summary(user.id).await.unwrap().unwrap();
    assert!(digest.contains("databases"));
    assert!(digest.contains("compilers"));
    assert!(!digest.contains("kubernetes"));
}
