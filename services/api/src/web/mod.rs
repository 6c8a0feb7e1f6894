pub mod chat_turn;
pub mod rest;
pub mod state;

// Re-export the handlers to make them easily accessible to the binary that
// will build the web server router.
pub use rest::{
    create_session_handler, delete_session_handler, list_messages_handler, list_sessions_handler,
    post_message_handler, rename_session_handler, resolve_user_handler,
};
