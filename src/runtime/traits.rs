//! Trait abstractions for runtime I/O
//!
//! These are the seams between the core and its collaborators: session
//! storage, outbound delivery, and order persistence. Mock implementations
//! live in `runtime::testing`.

use crate::db::Database;
use crate::order::Order;
use crate::state_machine::Session;
use crate::transport::SendError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Per-customer session storage. A disjoint mapping keyed by customer id;
/// no cross-customer visibility.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Existing session, or a freshly default-constructed `Init` one.
    /// Never fails: absence of a session is equivalent to `Init`.
    async fn get(&self, customer_id: &str) -> Session;

    /// Replace the stored session atomically for its customer id
    async fn save(&self, session: &Session) -> Result<(), String>;

    /// Remove the session entirely (cancellation)
    async fn delete(&self, customer_id: &str) -> Result<(), String>;
}

/// Outbound message delivery to one customer
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), SendError>;
}

/// Persistent order storage. Fire-and-forget from the runtime's point of
/// view: errors are logged, never user-visible.
#[async_trait]
pub trait OrderSink: Send + Sync {
    async fn store(&self, order: &Order) -> Result<(), String>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get(&self, customer_id: &str) -> Session {
        (**self).get(customer_id).await
    }

    async fn save(&self, session: &Session) -> Result<(), String> {
        (**self).save(session).await
    }

    async fn delete(&self, customer_id: &str) -> Result<(), String> {
        (**self).delete(customer_id).await
    }
}

#[async_trait]
impl<T: MessageSender + ?Sized> MessageSender for Arc<T> {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), SendError> {
        (**self).send_text(to, text).await
    }
}

#[async_trait]
impl<T: OrderSink + ?Sized> OrderSink for Arc<T> {
    async fn store(&self, order: &Order) -> Result<(), String> {
        (**self).store(order).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// In-memory session store. Production default (a single logical store is
/// assumed); the trait is the swap seam for an externally backed one.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, customer_id: &str) -> Session {
        self.sessions
            .read()
            .await
            .get(customer_id)
            .cloned()
            .unwrap_or_else(|| Session::new(customer_id))
    }

    async fn save(&self, session: &Session) -> Result<(), String> {
        self.sessions
            .write()
            .await
            .insert(session.customer_id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, customer_id: &str) -> Result<(), String> {
        self.sessions.write().await.remove(customer_id);
        Ok(())
    }
}

/// Adapter to use the order database as an `OrderSink`
pub struct DatabaseOrderSink {
    db: Database,
}

impl DatabaseOrderSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderSink for DatabaseOrderSink {
    async fn store(&self, order: &Order) -> Result<(), String> {
        let newly_written = self.db.insert_order(order).map_err(|e| e.to_string())?;
        if !newly_written {
            tracing::debug!(order_id = %order.order_id, "Order already stored, skipping");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::ChatState;

    #[tokio::test]
    async fn get_defaults_to_a_fresh_init_session() {
        let store = InMemorySessionStore::new();
        let session = store.get("new-customer").await;
        assert_eq!(session.state, ChatState::Init);
        assert_eq!(session.customer_id, "new-customer");
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = InMemorySessionStore::new();
        let mut session = Session::new("c1");
        session.state = ChatState::CollectingItems;

        store.save(&session).await.unwrap();
        assert_eq!(store.get("c1").await, session);
    }

    #[tokio::test]
    async fn delete_resets_to_default() {
        let store = InMemorySessionStore::new();
        let mut session = Session::new("c1");
        session.state = ChatState::ConfirmingOrder;
        store.save(&session).await.unwrap();

        store.delete("c1").await.unwrap();
        assert_eq!(store.get("c1").await.state, ChatState::Init);
    }

    #[tokio::test]
    async fn stores_are_disjoint_per_customer() {
        let store = InMemorySessionStore::new();
        let mut a = Session::new("a");
        a.state = ChatState::CollectingItems;
        store.save(&a).await.unwrap();

        assert_eq!(store.get("b").await.state, ChatState::Init);
    }
}
