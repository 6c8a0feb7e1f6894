//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.
//!
//! There is deliberately no per-connection or per-session mutable state here:
//! every handler receives the user and session ids it operates on explicitly,
//! and every read goes straight to the store.

use crate::config::Config;
use insight_chat_core::ports::{AssistantService, ChatStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub assistant: Arc<dyn AssistantService>,
    pub config: Arc<Config>,
}
