//! Lumi Bridge Library Crate
//!
//! Bridges a small embedded audio device speaking raw PCM16 over a
//! WebSocket to a Gemini Live conversational session, transparently
//! re-establishing the upstream side whenever it drops. The `bridge`
//! binary is a thin wrapper around this library.

pub mod audio;
pub mod config;
pub mod router;
pub mod state;
pub mod ws;
