pub mod assistant;
pub mod db;

pub use assistant::WebhookAssistant;
pub use db::PgStore;
