//! HTTP webhook boundary
//!
//! Decodes the messaging provider's envelopes and hands text messages to
//! the dialog runtimes. Malformed payloads are rejected here; the core is
//! never invoked for them.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::RuntimeManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
    pub verify_token: String,
}

impl AppState {
    pub fn new(runtime: Arc<RuntimeManager>, verify_token: impl Into<String>) -> Self {
        Self {
            runtime,
            verify_token: verify_token.into(),
        }
    }
}
