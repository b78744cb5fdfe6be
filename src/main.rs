//! WhatsApp order-taking bot
//!
//! A Rust backend implementing a conversation state machine that walks a
//! customer from greeting to a confirmed, persisted order.

mod api;
mod catalog;
mod db;
mod order;
mod runtime;
mod state_machine;
mod transport;

use api::{create_router, AppState};
use catalog::Catalog;
use db::Database;
use runtime::{DatabaseOrderSink, InMemorySessionStore, MessageSender, OrderSink, RuntimeManager};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{LogOnlySender, WhatsAppClient, WhatsAppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pedidos_bot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("PEDIDOS_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.pedidos-bot/pedidos.db")
    });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);

    let verify_token = std::env::var("VERIFY_TOKEN").unwrap_or_else(|_| {
        tracing::warn!("VERIFY_TOKEN not set, using the development default");
        "miverificacion123".to_string()
    });

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path, "Opening order database");
    let db = Database::open(&db_path)?;

    // Outbound transport; degrades to log-only when credentials are absent
    let sender: Arc<dyn MessageSender> = match WhatsAppConfig::from_env() {
        Some(config) => {
            tracing::info!(
                phone_number_id = %config.phone_number_id,
                api_version = %config.api_version,
                "WhatsApp transport configured"
            );
            Arc::new(WhatsAppClient::new(&config))
        }
        None => {
            tracing::warn!(
                "WHATSAPP_TOKEN or PHONE_NUMBER_ID not set; outbound messages will only be logged"
            );
            Arc::new(LogOnlySender)
        }
    };

    let orders: Arc<dyn OrderSink> = Arc::new(DatabaseOrderSink::new(db));
    let catalog = Arc::new(Catalog::with_defaults());
    let sessions = Arc::new(InMemorySessionStore::new());
    let manager = Arc::new(RuntimeManager::new(catalog, sessions, sender, orders));

    let state = AppState::new(manager, verify_token);
    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Pedidos bot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
