//! Mock implementations for testing
//!
//! These mocks enable exercising the runtime without real I/O.

use super::traits::{MessageSender, OrderSink};
use crate::order::Order;
use crate::transport::SendError;
use async_trait::async_trait;
use std::sync::Mutex;

/// Mock sender recording every outbound text
pub struct MockSender {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl MockSender {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Sender whose every delivery fails (for failure-path tests)
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Texts sent so far, in emission order
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// (recipient, text) pairs sent so far
    #[allow(dead_code)]
    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSender for MockSender {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), SendError> {
        if self.fail {
            return Err(SendError::network("mock delivery failure"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), text.to_string()));
        Ok(())
    }
}

/// Mock order sink recording stored orders
pub struct MockOrderSink {
    orders: Mutex<Vec<Order>>,
}

impl MockOrderSink {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
        }
    }

    pub fn stored(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }
}

impl Default for MockOrderSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderSink for MockOrderSink {
    async fn store(&self, order: &Order) -> Result<(), String> {
        self.orders.lock().unwrap().push(order.clone());
        Ok(())
    }
}
