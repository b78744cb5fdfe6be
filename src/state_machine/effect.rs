//! Effects produced by state transitions
//!
//! Transitions are pure; all I/O is described as data and executed by the
//! dialog runtime afterward. Replies are emitted in order and addressed
//! only to the triggering customer.

use crate::order::Order;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send an outbound text to the triggering customer
    Reply { text: String },

    /// Persist the transitioned session in the session store
    SaveSession,

    /// Remove the session entirely (cancellation)
    DeleteSession,

    /// Hand the finalized order snapshot to persistent storage.
    /// Fire-and-forget: a storage failure is logged, never user-visible,
    /// and never rolls back the transition.
    StoreOrder { order: Order },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply { text: text.into() }
    }
}
