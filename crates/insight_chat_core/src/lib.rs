pub mod domain;
pub mod ports;
pub mod summary;

pub use domain::{
    AssistantReply, GatewayFailure, Message, MessageRole, Session, User, DEFAULT_SESSION_TITLE,
};
pub use ports::{AssistantService, ChatStore, PortError, PortResult};
