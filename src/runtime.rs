//! Per-customer dialog runtimes
//!
//! Messages for one customer are serialized through a dedicated runtime
//! task and its mpsc channel; distinct customers are processed
//! concurrently with no ordering guarantee across them. This is per-key
//! mutual exclusion, not a global lock over the store.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::DialogRuntime;
pub use traits::*;

use crate::catalog::Catalog;
use crate::state_machine::Event;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Type alias for the production runtime wiring
pub type ProductionRuntime =
    DialogRuntime<Arc<InMemorySessionStore>, Arc<dyn MessageSender>, Arc<dyn OrderSink>>;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Handle to a running customer dialog
#[derive(Clone)]
struct CustomerHandle {
    event_tx: mpsc::Sender<Event>,
}

/// Manager for all customer dialog runtimes
pub struct RuntimeManager {
    catalog: Arc<Catalog>,
    sessions: Arc<InMemorySessionStore>,
    sender: Arc<dyn MessageSender>,
    orders: Arc<dyn OrderSink>,
    runtimes: RwLock<HashMap<String, CustomerHandle>>,
}

impl RuntimeManager {
    pub fn new(
        catalog: Arc<Catalog>,
        sessions: Arc<InMemorySessionStore>,
        sender: Arc<dyn MessageSender>,
        orders: Arc<dyn OrderSink>,
    ) -> Self {
        Self {
            catalog,
            sessions,
            sender,
            orders,
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    /// Enqueue one inbound event for a customer. Spawns the customer's
    /// runtime on first contact (lazy get-or-create).
    pub async fn dispatch(&self, customer_id: &str, event: Event) -> Result<(), String> {
        let handle = self.get_or_create(customer_id).await;
        handle
            .event_tx
            .send(event)
            .await
            .map_err(|_| format!("Dialog runtime for {customer_id} is gone"))
    }

    /// Number of customers with a live runtime
    pub async fn active_customers(&self) -> usize {
        self.runtimes.read().await.len()
    }

    async fn get_or_create(&self, customer_id: &str) -> CustomerHandle {
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(customer_id) {
                return handle.clone();
            }
        }

        let mut runtimes = self.runtimes.write().await;
        // Re-check under the write lock: another dispatch may have won.
        if let Some(handle) = runtimes.get(customer_id) {
            return handle.clone();
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let session = self.sessions.get(customer_id).await;
        let runtime: ProductionRuntime = DialogRuntime::new(
            self.catalog.clone(),
            session,
            self.sessions.clone(),
            self.sender.clone(),
            self.orders.clone(),
            event_rx,
        );
        tokio::spawn(runtime.run());

        let handle = CustomerHandle { event_tx };
        runtimes.insert(customer_id.to_string(), handle.clone());
        tracing::debug!(customer = %customer_id, "Spawned dialog runtime");
        handle
    }
}
