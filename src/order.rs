//! Order finalization
//!
//! Builds the immutable order snapshot once customer data is captured:
//! deterministic content-hash identifier, itemized receipt, value handed
//! to persistent storage. Pure functions of session content; the same
//! unmodified session always finalizes to the same order id.

use crate::catalog::format_cents;
use crate::state_machine::{CartLine, CustomerRecord, Session};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Immutable order snapshot. Once created it is never mutated by the
/// core; it is a value, not an owned mutable object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub lines: Vec<CartLine>,
    pub total_cents: u64,
    pub customer: CustomerRecord,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Build the snapshot for a session whose cart and total are already
    /// settled. `created_at` is the customer record's capture time, so no
    /// wall clock is read here.
    pub fn finalize(session: &Session, customer: &CustomerRecord) -> Order {
        let lines: Vec<CartLine> = session.sorted_lines().into_iter().cloned().collect();
        let order_id = order_id(&session.customer_id, &lines, customer);
        Order {
            order_id,
            customer_id: session.customer_id.clone(),
            lines,
            total_cents: session.total_cents,
            customer: customer.clone(),
            created_at: customer.captured_at,
        }
    }

    /// Human-readable receipt sent back to the customer
    pub fn receipt(&self) -> String {
        let mut out = String::new();
        out.push_str("✅ ¡Pedido confirmado!\n");
        out.push_str(&format!("Pedido {}\n\n", self.order_id));
        for line in &self.lines {
            out.push_str(&format!(
                "{} x {} - {}\n",
                line.quantity,
                line.name,
                format_cents(line.subtotal_cents())
            ));
        }
        out.push_str(&format!("\nTotal: {}\n", format_cents(self.total_cents)));
        out.push_str(&format!("Entrega: {}\n", self.customer.address));
        out.push_str(&format!("Pago: {}\n", self.customer.payment_method));
        out.push_str(&format!("\n¡Gracias por tu compra, {}!", self.customer.name));
        out
    }
}

/// Deterministic, collision-resistant order identifier.
///
/// Content hash over the canonicalized order fields: customer id, cart
/// lines in code order (code, quantity, snapshotted unit price), and the
/// captured customer fields. The capture timestamp is excluded, so a
/// retried finalization of an unmodified session yields the same id;
/// the customer id is included, so identical carts from different
/// customers do not collide. `lines` must already be in code order
/// (`Session::sorted_lines` guarantees it).
pub fn order_id(customer_id: &str, lines: &[CartLine], customer: &CustomerRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(customer_id.as_bytes());
    hasher.update([0x1e]);
    for line in lines {
        hasher.update(line.code.as_bytes());
        hasher.update([0x1f]);
        hasher.update(line.quantity.to_be_bytes());
        hasher.update(line.unit_price_cents.to_be_bytes());
        hasher.update([0x1e]);
    }
    for field in [
        &customer.name,
        &customer.address,
        &customer.phone,
        &customer.payment_method,
    ] {
        hasher.update(field.as_bytes());
        hasher.update([0x1f]);
    }

    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    let short: String = hex.chars().take(12).collect();
    format!("PED-{}", short.to_uppercase())
}
