//! WhatsApp Cloud API transport
//!
//! Outbound text delivery through the Graph `/messages` endpoint. Send
//! failures are classified for the operator log; the runtime never retries
//! a send in a way that re-runs a state transition.

use crate::runtime::MessageSender;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_API_VERSION: &str = "v22.0";

/// Send error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SendError {
    pub kind: SendErrorKind,
    pub message: String,
}

impl SendError {
    pub fn new(kind: SendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(SendErrorKind::Unknown, message)
    }
}

/// Error classification for operator dashboards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendErrorKind {
    /// Network issues, timeouts
    Network,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Bad request (400)
    InvalidRequest,
    /// Unknown error
    Unknown,
}

impl SendErrorKind {
    /// Whether a later delivery attempt could succeed. Used for log
    /// severity only; the runtime never re-runs a transition to resend.
    #[allow(dead_code)] // Classification for operator tooling
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}

/// WhatsApp Cloud API credentials and endpoint configuration
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub token: String,
    pub phone_number_id: String,
    pub api_version: String,
}

impl WhatsAppConfig {
    /// Read credentials from the environment. `None` when either secret
    /// is absent; callers degrade to log-only delivery.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("WHATSAPP_TOKEN").ok()?;
        let phone_number_id = std::env::var("PHONE_NUMBER_ID").ok()?;
        let api_version = std::env::var("WHATSAPP_API_VERSION")
            .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());
        Some(Self {
            token,
            phone_number_id,
            api_version,
        })
    }
}

/// Cloud API client
pub struct WhatsAppClient {
    client: Client,
    token: String,
    endpoint: String,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig) -> Self {
        let endpoint = format!(
            "https://graph.facebook.com/{}/{}/messages",
            config.api_version, config.phone_number_id
        );
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            token: config.token.clone(),
            endpoint,
        }
    }

    fn classify_error(&self, status: reqwest::StatusCode, body: &str) -> SendError {
        let message = body.to_string();
        match status.as_u16() {
            401 | 403 => SendError::auth(format!("Authentication failed: {message}")),
            429 => SendError::rate_limit(format!("Rate limited: {message}")),
            400 => SendError::invalid_request(format!("Invalid request: {message}")),
            500..=599 => SendError::server_error(format!("Server error: {message}")),
            _ => SendError::unknown(format!("HTTP {status}: {message}")),
        }
    }
}

#[async_trait]
impl MessageSender for WhatsAppClient {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), SendError> {
        let outbound = OutboundMessage::text(to, text);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&outbound)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SendError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    SendError::network(format!("Connection failed: {e}"))
                } else {
                    SendError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SendError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(self.classify_error(status, &body));
        }

        let ack: GraphSendResponse = serde_json::from_str(&body)
            .map_err(|e| SendError::unknown(format!("Failed to parse response: {e}")))?;
        if let Some(id) = ack.first_message_id() {
            tracing::debug!(to = %to, message_id = %id, "Outbound message accepted");
        }
        Ok(())
    }
}

/// Fallback sender used when credentials are absent: logs outbound texts
/// instead of delivering them, so local runs work end to end.
pub struct LogOnlySender;

#[async_trait]
impl MessageSender for LogOnlySender {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), SendError> {
        tracing::info!(to = %to, text = %text, "Outbound message (log-only mode)");
        Ok(())
    }
}

// Graph API wire types

#[derive(Debug, Serialize)]
struct OutboundMessage {
    messaging_product: &'static str,
    to: String,
    r#type: &'static str,
    text: TextContent,
}

#[derive(Debug, Serialize)]
struct TextContent {
    body: String,
}

impl OutboundMessage {
    fn text(to: &str, body: &str) -> Self {
        Self {
            messaging_product: "whatsapp",
            to: to.to_string(),
            r#type: "text",
            text: TextContent {
                body: body.to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphSendResponse {
    #[serde(default)]
    messages: Vec<GraphMessageId>,
}

#[derive(Debug, Deserialize)]
struct GraphMessageId {
    id: String,
}

impl GraphSendResponse {
    fn first_message_id(&self) -> Option<&str> {
        self.messages.first().map(|m| m.id.as_str())
    }
}
