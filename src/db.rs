//! Order persistence
//!
//! Stores finalized order snapshots. The core treats this boundary as
//! fire-and-forget: a storage failure is logged by the runtime and never
//! surfaces to the customer.

mod schema;

use schema::SCHEMA;

use crate::order::Order;
use crate::state_machine::{CartLine, CustomerRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert an order snapshot. Idempotent on order id: a retried
    /// finalization of an unchanged session stays a single row. Returns
    /// whether a new row was written.
    pub fn insert_order(&self, order: &Order) -> DbResult<bool> {
        let lines = serde_json::to_string(&order.lines)?;
        let customer = serde_json::to_string(&order.customer)?;

        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO orders (order_id, customer_id, lines, total_cents, customer, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                order.order_id,
                order.customer_id,
                lines,
                i64::try_from(order.total_cents).unwrap_or(i64::MAX),
                customer,
                order.created_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Fetch a stored order by id
    #[allow(dead_code)] // Operator tooling and tests
    pub fn get_order(&self, order_id: &str) -> DbResult<Order> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT order_id, customer_id, lines, total_cents, customer, created_at
             FROM orders WHERE order_id = ?1",
        )?;

        let row = stmt
            .query_row(params![order_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::OrderNotFound(order_id.to_string()),
                other => DbError::Sqlite(other),
            })?;

        let (order_id, customer_id, lines, total_cents, customer, created_at) = row;
        let lines: Vec<CartLine> = serde_json::from_str(&lines)?;
        let customer: CustomerRecord = serde_json::from_str(&customer)?;
        Ok(Order {
            order_id,
            customer_id,
            lines,
            total_cents: u64::try_from(total_cents).unwrap_or(0),
            customer,
            created_at: parse_datetime(&created_at),
        })
    }

    /// Number of stored orders
    #[allow(dead_code)] // Operator tooling and tests
    pub fn order_count(&self) -> DbResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

fn parse_datetime(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
