//! HTTP request handlers

use super::types::{
    ErrorResponse, HealthResponse, InboundMessage, VerifyQuery, WebhookPayload,
};
use super::AppState;
use crate::state_machine::Event;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;

const SUBSCRIBE_MODE: &str = "subscribe";
const WEBHOOK_OBJECT: &str = "whatsapp_business_account";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/health", get(health))
        .with_state(state)
}

// ============================================================
// Verification handshake
// ============================================================

/// Provider challenge: echo `hub.challenge` when the mode is `subscribe`
/// and the token matches the configured secret, else 403.
async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<String, AppError> {
    let mode_ok = query.mode.as_deref() == Some(SUBSCRIBE_MODE);
    let token_ok = query.verify_token.as_deref() == Some(state.verify_token.as_str());

    match (mode_ok && token_ok, query.challenge) {
        (true, Some(challenge)) => {
            tracing::info!("Webhook verified");
            Ok(challenge)
        }
        _ => {
            tracing::warn!("Webhook verification failed");
            Err(AppError::Forbidden(
                "Token de verificación inválido".to_string(),
            ))
        }
    }
}

// ============================================================
// Inbound messages
// ============================================================

/// Decode the envelope and dispatch each message to its customer's
/// runtime. Recognized envelopes are always acked; dispatch failures are
/// an operator concern, never surfaced to the provider.
async fn receive_webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> &'static str {
    if payload.object != WEBHOOK_OBJECT {
        tracing::warn!(object = %payload.object, "Ignoring unknown webhook object");
        return "EVENT_RECEIVED";
    }

    let received_at = Utc::now();
    for entry in payload.entry {
        for change in entry.changes {
            for message in change.value.messages {
                let InboundMessage { from, kind, text } = message;
                let event = match (kind.as_str(), text) {
                    ("text", Some(text)) => Event::text(text.body, received_at),
                    (other, _) => {
                        tracing::debug!(customer = %from, media = %other, "Non-text message");
                        Event::unsupported(other)
                    }
                };
                if let Err(e) = state.runtime.dispatch(&from, event).await {
                    tracing::error!(customer = %from, error = %e, "Failed to dispatch message");
                }
            }
        }
    }

    "EVENT_RECEIVED"
}

// ============================================================
// Health
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_customers: state.runtime.active_customers().await,
    })
}

// ============================================================
// Errors
// ============================================================

#[derive(Debug)]
enum AppError {
    Forbidden(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
