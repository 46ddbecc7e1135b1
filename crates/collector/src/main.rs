//! `collector`: event collection service entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Decode both PII keys; the process refuses to start without them.
//! 4. Build the event store and shared [`AppState`].
//! 5. Build the Axum router and start the HTTP server.

mod config;
mod server;
mod store;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use config::Config;
use server::state::{AppState, Settings};
use store::MemoryEventStore;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        "collector starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key material
    // -----------------------------------------------------------------------
    let keys = cfg.key_material().map_err(|e| {
        error!(error = %e, "PII keys invalid");
        e
    })?;

    // -----------------------------------------------------------------------
    // 4. State
    // -----------------------------------------------------------------------
    if cfg.password.as_deref().map_or(true, str::is_empty) {
        info!("PASSWORD unset; fetch and delete routes will reject every request");
    }
    let store = Arc::new(MemoryEventStore::new());
    let state = AppState::new(keys, store, Settings::from_config(&cfg));

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let cors = server::middleware::cors_layer(cfg.disable_cors, &cfg.cors_allowed_domain)
        .context("invalid CORS_ALLOWED_DOMAIN")?;
    let router = server::router::build(state, cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
