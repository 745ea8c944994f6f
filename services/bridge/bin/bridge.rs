//! Main Entrypoint for the Lumi Bridge Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging and the periodic heartbeat.
//! 3. Wiring the upstream connector (when a credential is present).
//! 4. Serving the device WebSocket endpoint and the liveness probe,
//!    with graceful shutdown.

use anyhow::Context;
use lumi_bridge::{
    config::Config,
    router::create_router,
    state::AppState,
    ws::upstream::{GeminiConnector, UpstreamConnector},
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing bridge...");

    // --- 3. Wire the Upstream Connector ---
    let connector: Option<Arc<dyn UpstreamConnector>> = match &config.gemini_api_key {
        Some(key) => {
            info!(key_len = key.len(), "upstream credential loaded");
            Some(Arc::new(GeminiConnector::new(
                key.clone(),
                config.session_config(),
            )))
        }
        None => {
            warn!(
                "GEMINI_API_KEY is not set; devices can connect but no upstream \
                 session will open until the process restarts with a credential"
            );
            None
        }
    };

    let app_state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        connector,
    });

    // --- 4. Heartbeat ---
    // Periodic liveness line, independent of any connection activity.
    let started = Instant::now();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
        ticker.tick().await; // the first tick completes immediately
        loop {
            ticker.tick().await;
            info!(uptime_secs = started.elapsed().as_secs(), "heartbeat");
        }
    });

    // --- 5. Start Server ---
    let app = create_router(app_state);
    info!(
        model = %config.model,
        voice = %config.voice,
        bind_address = %config.bind_address,
        "Bridge configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server has shut down.");
    Ok(())
}
