//! Session and cart data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Conversation state for one customer.
///
/// Closed enum: a missing session is equivalent to `Init`, and `Finalized`
/// is terminal per order (the next message re-dispatches as a fresh
/// session). Every handler is forced by exhaustive matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChatState {
    #[default]
    Init,
    BrowsingCatalog,
    CollectingItems,
    ConfirmingOrder,
    CapturingCustomerData,
    Finalized,
}

impl ChatState {
    /// Terminal for the current order; re-dispatched as `Init`
    pub fn is_terminal(self) -> bool {
        matches!(self, ChatState::Finalized)
    }
}

/// One product line in the cart.
///
/// Price and name are snapshotted from the catalog at insertion; quantity
/// is always > 0 (zero and negative quantities are rejected by parsing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub code: String,
    pub name: String,
    pub unit_price_cents: u64,
    pub quantity: u32,
}

impl CartLine {
    pub fn subtotal_cents(&self) -> u64 {
        self.unit_price_cents * u64::from(self.quantity)
    }
}

/// Customer data captured before finalization. All-or-nothing: either the
/// four fields were parsed together or the record does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub payment_method: String,
    pub captured_at: DateTime<Utc>,
}

/// Per-customer conversational state plus in-progress order data.
///
/// Owned by the session store, mutated only through `transition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub customer_id: String,
    pub state: ChatState,
    /// Keyed by upper-cased product code; meaningful while collecting or
    /// confirming.
    pub cart: HashMap<String, CartLine>,
    /// Snapshotted when entering `ConfirmingOrder`; stale afterward unless
    /// recomputed.
    pub total_cents: u64,
    pub customer: Option<CustomerRecord>,
    /// Assigned exactly once, at finalization
    pub order_id: Option<String>,
}

impl Session {
    /// Fresh default session, what a brand-new customer gets
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            state: ChatState::Init,
            cart: HashMap::new(),
            total_cents: 0,
            customer: None,
            order_id: None,
        }
    }

    /// Sum of line subtotals over the current cart
    pub fn cart_total_cents(&self) -> u64 {
        self.cart.values().map(CartLine::subtotal_cents).sum()
    }

    /// Cart lines in stable code order, for rendering and hashing
    pub fn sorted_lines(&self) -> Vec<&CartLine> {
        let mut lines: Vec<&CartLine> = self.cart.values().collect();
        lines.sort_by(|a, b| a.code.cmp(&b.code));
        lines
    }
}
