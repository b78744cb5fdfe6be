//! Dialog runtime executor
//!
//! One runtime per customer id. The event loop applies the pure transition
//! and then executes effects; a message is fully processed (transition,
//! persist, replies) before the next one for the same customer is taken
//! off the channel.

use super::traits::{MessageSender, OrderSink, SessionStore};
use crate::catalog::Catalog;
use crate::state_machine::{transition, Effect, Event, Session};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Generic dialog runtime over any storage, sender, and order sink
pub struct DialogRuntime<S, M, O>
where
    S: SessionStore + 'static,
    M: MessageSender + 'static,
    O: OrderSink + 'static,
{
    catalog: Arc<Catalog>,
    session: Session,
    store: S,
    sender: M,
    orders: O,
    event_rx: mpsc::Receiver<Event>,
}

impl<S, M, O> DialogRuntime<S, M, O>
where
    S: SessionStore + 'static,
    M: MessageSender + 'static,
    O: OrderSink + 'static,
{
    pub fn new(
        catalog: Arc<Catalog>,
        session: Session,
        store: S,
        sender: M,
        orders: O,
        event_rx: mpsc::Receiver<Event>,
    ) -> Self {
        Self {
            catalog,
            session,
            store,
            sender,
            orders,
            event_rx,
        }
    }

    pub async fn run(mut self) {
        tracing::debug!(customer = %self.session.customer_id, "Starting dialog runtime");

        while let Some(event) = self.event_rx.recv().await {
            self.process_event(event).await;
        }

        tracing::debug!(customer = %self.session.customer_id, "Dialog runtime stopped");
    }

    async fn process_event(&mut self, event: Event) {
        // Compute the full next session and effect list first, then
        // commit. Effect failures are logged and never recompute the
        // transition, so a send timeout cannot double-apply a mutation.
        let result = transition(&self.session, &self.catalog, event);
        self.session = result.session;

        for effect in result.effects {
            self.execute_effect(effect).await;
        }
    }

    async fn execute_effect(&mut self, effect: Effect) {
        let customer = &self.session.customer_id;
        match effect {
            Effect::Reply { text } => {
                if let Err(e) = self.sender.send_text(customer, &text).await {
                    tracing::error!(customer = %customer, error = %e, "Failed to send reply");
                }
            }
            Effect::SaveSession => {
                if let Err(e) = self.store.save(&self.session).await {
                    tracing::error!(customer = %customer, error = %e, "Failed to save session");
                }
            }
            Effect::DeleteSession => {
                if let Err(e) = self.store.delete(customer).await {
                    tracing::error!(customer = %customer, error = %e, "Failed to delete session");
                }
            }
            Effect::StoreOrder { order } => {
                if let Err(e) = self.orders.store(&order).await {
                    tracing::error!(
                        customer = %customer,
                        order_id = %order.order_id,
                        error = %e,
                        "Failed to persist order"
                    );
                }
            }
        }
    }
}
