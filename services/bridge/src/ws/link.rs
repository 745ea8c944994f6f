//! Upstream link lifecycle for one device connection.
//!
//! The controller is a plain state machine: callers feed it lifecycle
//! events and it answers with the single action to take next. Keeping it
//! synchronous makes the reconnect policy testable without sockets.

use std::time::Duration;
use tracing::warn;

/// Fixed delay between the loss of an upstream session and the next
/// attempt. There is no backoff ceiling: for a single-device deployment an
/// unreachable provider produces a steady 3 s cadence, which the operator
/// sees in the logs.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// No upstream session and no attempt in flight.
    Disconnected,
    /// An open is in flight.
    Connecting,
    Connected,
    /// The retry timer is armed; no second attempt may start until it fires.
    ReconnectPending,
    /// No credential is available. Permanent for the process lifetime.
    Failed,
    /// The owning device connection has gone away.
    TornDown,
}

/// What the session loop should do after feeding the controller an event.
#[derive(Debug, PartialEq, Eq)]
pub enum LinkCommand {
    /// Start an upstream open now.
    OpenUpstream,
    /// Arm the retry timer.
    ScheduleRetry(Duration),
    /// Nothing to do.
    Idle,
}

pub struct ReconnectController {
    state: LinkState,
    has_credential: bool,
}

impl ReconnectController {
    pub fn new(has_credential: bool) -> Self {
        Self {
            state: LinkState::Disconnected,
            has_credential,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Requests an upstream session. A no-op while an attempt or a retry
    /// timer is already under way, and permanently a no-op without a
    /// credential.
    pub fn connect(&mut self) -> LinkCommand {
        match self.state {
            LinkState::Disconnected => {
                if self.has_credential {
                    self.state = LinkState::Connecting;
                    LinkCommand::OpenUpstream
                } else {
                    warn!("no upstream credential configured; link permanently down");
                    self.state = LinkState::Failed;
                    LinkCommand::Idle
                }
            }
            // A pending retry owns the next attempt; everything else is
            // already under way or final.
            _ => LinkCommand::Idle,
        }
    }

    /// The retry timer fired. Fires as a no-op in every state except
    /// `ReconnectPending`, so a stale timer can never start a second
    /// attempt or outlive a teardown.
    pub fn retry_due(&mut self) -> LinkCommand {
        if self.state == LinkState::ReconnectPending {
            self.state = LinkState::Connecting;
            LinkCommand::OpenUpstream
        } else {
            LinkCommand::Idle
        }
    }

    pub fn on_connect_success(&mut self) {
        if self.state == LinkState::Connecting {
            self.state = LinkState::Connected;
        }
    }

    pub fn on_connect_failure(&mut self) -> LinkCommand {
        self.lost()
    }

    /// The provider closed an established session.
    pub fn on_closed(&mut self) -> LinkCommand {
        self.lost()
    }

    fn lost(&mut self) -> LinkCommand {
        match self.state {
            // Single-flight guard: at most one armed timer.
            LinkState::ReconnectPending | LinkState::Failed | LinkState::TornDown => {
                LinkCommand::Idle
            }
            _ => {
                self.state = LinkState::ReconnectPending;
                LinkCommand::ScheduleRetry(RECONNECT_DELAY)
            }
        }
    }

    /// The device connection ended. Idempotent and terminal.
    pub fn teardown(&mut self) {
        self.state = LinkState::TornDown;
    }
}
