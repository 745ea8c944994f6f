//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the process-wide
//! resources handed to every device connection.

use crate::{config::Config, ws::upstream::UpstreamConnector};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` when no upstream credential was configured at startup; the
    /// bridge still accepts device connections, it just never forwards.
    pub connector: Option<Arc<dyn UpstreamConnector>>,
}
