//! Device WebSocket handling.
//!
//! This module contains the core of the bridge. It is structured into
//! submodules for clarity:
//!
//! - `session`: per-device bridge loop tying the socket to the upstream link.
//! - `link`: reconnect state machine that keeps the upstream session alive.
//! - `upstream`: the connector seam through which upstream sessions open.

pub mod link;
pub mod session;
pub mod upstream;

pub use session::ws_handler;
