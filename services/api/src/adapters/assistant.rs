//! services/api/src/adapters/assistant.rs
//!
//! This module contains the adapter for the external reasoning webhook.
//! It implements the `AssistantService` port from the `core` crate: one
//! best-effort JSON POST per turn, with every failure mode normalized into a
//! fixed user-visible fallback reply.

use async_trait::async_trait;
use insight_chat_core::domain::{AssistantReply, GatewayFailure};
use insight_chat_core::ports::AssistantService;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, warn};
use uuid::Uuid;

/// Shown when the webhook replied but no reply text could be extracted.
pub const FALLBACK_INVALID_FORMAT: &str = "I cannot find this in the available resources.";
/// Shown when the webhook did not answer within the configured timeout.
pub const FALLBACK_TIMEOUT: &str =
    "I'm taking longer than expected to respond. Please try again.";
/// Shown when the webhook could not be reached at all.
pub const FALLBACK_CONNECTION: &str =
    "I'm having trouble connecting to the assistant service. Please check your configuration.";
/// Shown when the webhook returned a non-success HTTP status.
pub const FALLBACK_HTTP_ERROR: &str =
    "The assistant service returned an error. Please try again later.";
/// Shown for any failure the other cases do not cover.
pub const FALLBACK_UNEXPECTED: &str = "An unexpected error occurred. Please try again.";

//=========================================================================================
// Wire Types
//=========================================================================================

/// The request body sent to the reasoning webhook.
///
/// `profile_summary` is included only when the user actually has a non-empty
/// digest, so the webhook can distinguish "no profile yet" from an empty field.
#[derive(Serialize)]
struct WebhookRequest<'a> {
    user_id: Uuid,
    session_id: Uuid,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_summary: Option<&'a str>,
}

/// Pulls the reply text out of a webhook response body.
///
/// The primary field is `reply`; `output` and `text` are accepted as fallback
/// names because the workflow engine formats its output differently depending
/// on which node produced it.
fn extract_reply(body: &serde_json::Value) -> Option<String> {
    for field in ["reply", "output", "text"] {
        if let Some(value) = body.get(field).and_then(|v| v.as_str()) {
            return Some(value.to_string());
        }
    }
    None
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AssistantService` against a JSON webhook.
#[derive(Clone)]
pub struct WebhookAssistant {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookAssistant {
    /// Creates a new `WebhookAssistant`. The timeout bounds every call made
    /// through this adapter.
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

//=========================================================================================
// `AssistantService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AssistantService for WebhookAssistant {
    async fn ask(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        message: &str,
        profile_summary: Option<&str>,
    ) -> AssistantReply {
        let payload = WebhookRequest {
            user_id,
            session_id,
            message,
            profile_summary: profile_summary.filter(|s| !s.is_empty()),
        };

        let response = match self.client.post(&self.endpoint).json(&payload).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("Assistant webhook timed out for session {}", session_id);
                return AssistantReply::fallback(FALLBACK_TIMEOUT, GatewayFailure::Timeout);
            }
            Err(e) if e.is_connect() => {
                error!("Assistant webhook connection error: {}", e);
                return AssistantReply::fallback(FALLBACK_CONNECTION, GatewayFailure::Connection);
            }
            Err(e) => {
                error!("Unexpected error calling assistant webhook: {}", e);
                return AssistantReply::fallback(FALLBACK_UNEXPECTED, GatewayFailure::Unexpected);
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!("Assistant webhook returned HTTP {}", status);
            return AssistantReply::fallback(
                FALLBACK_HTTP_ERROR,
                GatewayFailure::Http(status.as_u16()),
            );
        }

        let body = match response.json::<serde_json::Value>().await {
            Ok(body) => body,
            Err(e) => {
                error!("Assistant webhook returned a non-JSON body: {}", e);
                return AssistantReply::fallback(
                    FALLBACK_INVALID_FORMAT,
                    GatewayFailure::InvalidFormat,
                );
            }
        };

        match extract_reply(&body) {
            Some(reply) => AssistantReply::ok(reply),
            None => {
                warn!("Assistant webhook response missing 'reply', 'output', and 'text' fields");
                AssistantReply::fallback(FALLBACK_INVALID_FORMAT, GatewayFailure::InvalidFormat)
            }
        }
    }
}
