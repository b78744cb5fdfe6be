//! Inbound events dispatched to the state machine

use chrono::{DateTime, Utc};

/// One decoded inbound message for a customer.
///
/// The receive timestamp rides on the event so the transition function
/// stays deterministic: capture times are stamped by the boundary, never
/// read from the wall clock inside a handler.
#[derive(Debug, Clone)]
pub enum Event {
    Text {
        body: String,
        received_at: DateTime<Utc>,
    },
    /// Non-text media (image, audio, sticker, ...). Accepted as a no-op:
    /// no state change, no reply.
    Unsupported { media_type: String },
}

impl Event {
    pub fn text(body: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Event::Text {
            body: body.into(),
            received_at,
        }
    }

    pub fn unsupported(media_type: impl Into<String>) -> Self {
        Event::Unsupported {
            media_type: media_type.into(),
        }
    }
}
