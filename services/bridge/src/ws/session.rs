//! Per-device bridge session.
//!
//! One loop owns the device socket and the upstream link for the lifetime
//! of the connection. Everything is interleaved through a single
//! `tokio::select!`, so at most one upstream session, one in-flight connect
//! and one armed retry timer can exist at any instant.

use super::{
    link::{LinkCommand, ReconnectController},
    upstream::{Upstream, UpstreamConnector},
};
use crate::audio::{LEVEL_LOG_THRESHOLD, frame_level};
use crate::state::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use gemini_live::{ConnectError, LiveEvent, LiveSession};
use std::{pin::Pin, sync::Arc};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Sleep, sleep},
};
use tracing::{debug, error, info, instrument, warn};

/// Axum handler to upgrade an HTTP connection to a device WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

#[instrument(name = "bridge_session", skip_all, fields(conn_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let conn_id: u32 = rand::random();
    tracing::Span::current().record("conn_id", conn_id);
    info!("device connected");
    let stats = run_bridge(socket, state.connector.clone()).await;
    info!(
        frames_forwarded = stats.frames_forwarded,
        frames_dropped = stats.frames_dropped,
        "device disconnected; bridge session closed"
    );
}

/// Counters for one bridge session, reported when it ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_forwarded: u64,
    /// Frames received from the device while no upstream session was
    /// available, or refused by the outbound queue. Dropped, never buffered.
    pub frames_dropped: u64,
}

type ConnectTask = JoinHandle<Result<Upstream, ConnectError>>;

fn apply_command(
    cmd: LinkCommand,
    connector: &Option<Arc<dyn UpstreamConnector>>,
    connect_task: &mut Option<ConnectTask>,
    retry: &mut Option<Pin<Box<Sleep>>>,
) {
    match cmd {
        LinkCommand::OpenUpstream => {
            // The controller only asks for an open when a credential exists.
            if let Some(connector) = connector {
                let connector = Arc::clone(connector);
                *connect_task = Some(tokio::spawn(async move { connector.connect().await }));
            }
        }
        LinkCommand::ScheduleRetry(delay) => *retry = Some(Box::pin(sleep(delay))),
        LinkCommand::Idle => {}
    }
}

/// The main event loop for one device connection.
///
/// Returns the session counters once the device side goes away; the loop
/// exit releases the upstream session, the retry timer and any in-flight
/// connect along with it.
pub(crate) async fn run_bridge<S>(
    socket: S,
    connector: Option<Arc<dyn UpstreamConnector>>,
) -> SessionStats
where
    S: Stream<Item = Result<Message, axum::Error>> + Sink<Message, Error = axum::Error> + Unpin,
{
    let (mut device_tx, mut device_rx) = socket.split();
    let mut link = ReconnectController::new(connector.is_some());
    let mut upstream: Option<LiveSession> = None;
    let mut events: Option<mpsc::Receiver<LiveEvent>> = None;
    let mut connect_task: Option<ConnectTask> = None;
    let mut retry: Option<Pin<Box<Sleep>>> = None;
    let mut stats = SessionStats::default();

    let cmd = link.connect();
    apply_command(cmd, &connector, &mut connect_task, &mut retry);

    loop {
        tokio::select! {
            inbound = device_rx.next() => match inbound {
                Some(Ok(Message::Binary(frame))) => {
                    match upstream.as_ref().filter(|_| link.is_connected()) {
                        Some(session) => {
                            let level = frame_level(&frame);
                            if level > LEVEL_LOG_THRESHOLD {
                                debug!(level, bytes = frame.len(), "audible frame from device");
                            }
                            match session.send_audio(frame) {
                                Ok(()) => stats.frames_forwarded += 1,
                                Err(e) => {
                                    stats.frames_dropped += 1;
                                    debug!(error = %e, "frame dropped on forward");
                                }
                            }
                        }
                        // No upstream right now: drop, never queue.
                        None => stats.frames_dropped += 1,
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Text, ping and pong carry no bridge semantics.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "device socket error");
                    break;
                }
            },
            event = async { events.as_mut().expect("guarded by is_some").recv().await },
                if events.is_some() =>
            {
                match event {
                    Some(LiveEvent::Audio(bytes)) => {
                        if let Err(e) = device_tx.send(Message::Binary(bytes)).await {
                            warn!(error = %e, "device write failed");
                            break;
                        }
                    }
                    Some(LiveEvent::Transcript { text, is_final }) => {
                        if is_final {
                            info!(%text, "heard");
                        }
                    }
                    Some(LiveEvent::Opened) => debug!("upstream session streaming"),
                    Some(LiveEvent::Error(reason)) => {
                        // Non-fatal on its own; the provider follows up
                        // with a close that drives the reconnect.
                        warn!(%reason, "upstream error");
                    }
                    Some(LiveEvent::Closed { code }) => {
                        warn!(?code, "upstream session closed");
                        upstream = None;
                        events = None;
                        let cmd = link.on_closed();
                        apply_command(cmd, &connector, &mut connect_task, &mut retry);
                    }
                    None => {
                        warn!("upstream event stream ended");
                        upstream = None;
                        events = None;
                        let cmd = link.on_closed();
                        apply_command(cmd, &connector, &mut connect_task, &mut retry);
                    }
                }
            },
            result = async { connect_task.as_mut().expect("guarded by is_some").await },
                if connect_task.is_some() =>
            {
                connect_task = None;
                match result {
                    Ok(Ok(up)) => {
                        link.on_connect_success();
                        info!("upstream session established");
                        upstream = Some(up.session);
                        events = Some(up.events);
                    }
                    Ok(Err(e)) => {
                        warn!(error = %e, "upstream connect failed");
                        let cmd = link.on_connect_failure();
                        apply_command(cmd, &connector, &mut connect_task, &mut retry);
                    }
                    Err(e) => {
                        error!(error = %e, "connect task failed to run");
                        let cmd = link.on_connect_failure();
                        apply_command(cmd, &connector, &mut connect_task, &mut retry);
                    }
                }
            },
            () = async { retry.as_mut().expect("guarded by is_some").await }, if retry.is_some() => {
                retry = None;
                let cmd = link.retry_due();
                apply_command(cmd, &connector, &mut connect_task, &mut retry);
            },
        }
    }

    // Device gone: release the upstream session and disarm pending work.
    // Dropping an already-closed session is a no-op.
    link.teardown();
    if let Some(task) = connect_task.take() {
        task.abort();
    }
    retry.take();
    drop(upstream);
    stats
}
