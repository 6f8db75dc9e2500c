//! Livestock Engine - Farm intelligence service
//!
//! This binary serves growth forecasts, health risk classification and
//! disease diagnostics for a herd, retraining its models in the
//! background as new measurements arrive.

use anyhow::Result;
use engine_lib::context::EngineContext;
use engine_lib::store::MemoryStore;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting livestock-engine");

    // Load configuration
    let config = config::EngineConfig::load()?;
    info!(farm_id = %config.farm_id, "Engine configured");

    // Wire the engine over the in-memory store. A malformed diagnostic
    // knowledge base aborts start here.
    let store = Arc::new(MemoryStore::new());
    let ctx = Arc::new(EngineContext::new(store, config.engine_settings())?);
    ctx.logger().log_startup(ENGINE_VERSION);

    // Launch the retraining loop and mark the engine ready
    let (shutdown_tx, _) = broadcast::channel(1);
    ctx.start(shutdown_tx.subscribe()).await;

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        Arc::clone(&ctx),
        config.default_horizon_days,
    ));

    // Start the API server
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(());
    ctx.logger().log_shutdown("SIGINT received");
    info!("Shutting down");
    api_handle.abort();

    Ok(())
}
