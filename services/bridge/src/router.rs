//! Axum Router Configuration
//!
//! The bridge exposes exactly two endpoints: the device WebSocket and a
//! plaintext liveness probe for external health checks.

use crate::{state::AppState, ws::ws_handler};
use axum::{Router, routing::get};
use std::sync::Arc;

async fn health() -> &'static str {
    "lumi bridge is running\n"
}

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}
