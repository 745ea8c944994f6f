//! Client for the Gemini Live bidirectional streaming API.
//!
//! [`connect`] performs the `BidiGenerateContent` setup handshake and hands
//! back a [`LiveSession`] for pushing microphone audio upstream plus an
//! ordered stream of [`LiveEvent`]s carrying everything the provider sends
//! back. The session socket is serviced by a background task; dropping the
//! [`LiveSession`] closes the session.

mod wire;

use base64::Engine;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};
use tracing::{debug, warn};

const LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Transport encoding declared for realtime audio input.
pub const PCM16_MIME: &str = "audio/pcm;rate=16000";

const OUTBOUND_QUEUE: usize = 64;
const EVENT_QUEUE: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Immutable description of one live session, fixed at connect time.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
    pub transcription_enabled: bool,
}

/// Everything the provider delivers for one session, in delivery order.
#[derive(Debug)]
pub enum LiveEvent {
    /// The session is open and streaming.
    Opened,
    /// One chunk of synthesized speech, already base64-decoded.
    Audio(Bytes),
    /// A fragment of the input transcription, when enabled at setup.
    Transcript { text: String, is_final: bool },
    /// A non-fatal provider error. The session will eventually close.
    Error(String),
    /// The provider closed the session. Always the last event.
    Closed { code: Option<u16> },
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),
    #[error("failed to encode setup message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("server closed the connection during setup (code {0:?})")]
    Rejected(Option<u16>),
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("outbound audio queue is full")]
    QueueFull,
    #[error("session is closed")]
    SessionClosed,
}

/// Send handle for one live session.
///
/// Holds the outbound half of the audio queue. Dropping the handle closes
/// the queue, which makes the IO task send a Close frame and exit.
pub struct LiveSession {
    audio_tx: mpsc::Sender<Bytes>,
}

impl LiveSession {
    /// Creates a session handle together with the receiving half of its
    /// outbound audio queue. [`connect`] wires the receiver to the socket
    /// task; test doubles can hold it directly to observe forwarded frames.
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (audio_tx, audio_rx) = mpsc::channel(capacity);
        (Self { audio_tx }, audio_rx)
    }

    /// Queues one audio frame for delivery. Fire and forget: a full queue
    /// or a dead session drops the frame and reports which.
    pub fn send_audio(&self, frame: Bytes) -> Result<(), SendError> {
        self.audio_tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::SessionClosed,
        })
    }
}

/// Opens a live session and completes the setup handshake.
///
/// Returns once the server acknowledges with `setupComplete`; the returned
/// event stream then starts with [`LiveEvent::Opened`].
pub async fn connect(
    api_key: &str,
    config: &SessionConfig,
) -> Result<(LiveSession, mpsc::Receiver<LiveEvent>), ConnectError> {
    let url = format!("{LIVE_ENDPOINT}?key={api_key}");
    let (mut ws, _) = connect_async(url).await?;

    let setup = wire::ClientMessage::Setup(wire::Setup {
        model: config.model.clone(),
        generation_config: wire::GenerationConfig {
            response_modalities: vec![wire::ResponseModality::Audio],
            speech_config: wire::SpeechConfig {
                voice_config: wire::VoiceConfig {
                    prebuilt_voice_config: wire::PrebuiltVoiceConfig {
                        voice_name: config.voice.clone(),
                    },
                },
            },
        },
        system_instruction: wire::Content {
            parts: vec![wire::Part {
                text: config.system_instruction.clone(),
            }],
        },
        input_audio_transcription: config
            .transcription_enabled
            .then(|| wire::AudioTranscriptionConfig {}),
    });
    let payload = serde_json::to_string(&setup)?;
    ws.send(tungstenite::Message::Text(payload.into())).await?;

    // The server acknowledges with `setupComplete` before any content flows.
    loop {
        match ws.next().await {
            Some(Ok(tungstenite::Message::Text(text))) => {
                match serde_json::from_str::<wire::ServerMessage>(&text) {
                    Ok(msg) if msg.setup_complete.is_some() => break,
                    Ok(_) => warn!("unexpected frame before setup completed"),
                    Err(e) => warn!(error = %e, "unparseable frame during setup"),
                }
            }
            Some(Ok(tungstenite::Message::Close(frame))) => {
                return Err(ConnectError::Rejected(frame.map(|f| u16::from(f.code))));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(ConnectError::Handshake(e)),
            None => return Err(ConnectError::Rejected(None)),
        }
    }

    let (session, audio_rx) = LiveSession::pair(OUTBOUND_QUEUE);
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
    tokio::spawn(run_io(ws, audio_rx, event_tx));
    Ok((session, event_rx))
}

/// Owns the socket after setup: forwards queued audio upstream and turns
/// inbound frames into [`LiveEvent`]s.
async fn run_io(mut ws: WsStream, mut audio_rx: mpsc::Receiver<Bytes>, events: mpsc::Sender<LiveEvent>) {
    let _ = events.send(LiveEvent::Opened).await;
    loop {
        tokio::select! {
            outbound = audio_rx.recv() => match outbound {
                Some(frame) => {
                    let input = wire::ClientMessage::RealtimeInput(wire::RealtimeInput {
                        audio: wire::Blob {
                            mime_type: PCM16_MIME.to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(&frame),
                        },
                    });
                    let payload = match serde_json::to_string(&input) {
                        Ok(p) => p,
                        Err(e) => {
                            warn!(error = %e, "failed to encode audio frame");
                            continue;
                        }
                    };
                    if let Err(e) = ws.send(tungstenite::Message::Text(payload.into())).await {
                        let _ = events.send(LiveEvent::Error(e.to_string())).await;
                        let _ = events.send(LiveEvent::Closed { code: None }).await;
                        break;
                    }
                }
                // All session handles dropped; close the socket politely.
                None => {
                    let _ = ws.send(tungstenite::Message::Close(None)).await;
                    break;
                }
            },
            inbound = ws.next() => match inbound {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    for event in decode_events(&text) {
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                }
                Some(Ok(tungstenite::Message::Close(frame))) => {
                    let code = frame.map(|f| u16::from(f.code));
                    debug!(?code, "server closed live session");
                    let _ = events.send(LiveEvent::Closed { code }).await;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = events.send(LiveEvent::Error(e.to_string())).await;
                    let _ = events.send(LiveEvent::Closed { code: None }).await;
                    break;
                }
                None => {
                    let _ = events.send(LiveEvent::Closed { code: None }).await;
                    break;
                }
            },
        }
    }
}

/// Translates one server content frame into zero or more events.
fn decode_events(text: &str) -> Vec<LiveEvent> {
    let msg: wire::ServerMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "unparseable server frame");
            return Vec::new();
        }
    };
    let mut events = Vec::new();
    if let Some(content) = msg.server_content {
        if let Some(transcription) = content.input_transcription {
            events.push(LiveEvent::Transcript {
                text: transcription.text,
                is_final: transcription.finished.unwrap_or(false),
            });
        }
        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                if let Some(blob) = part.inline_data {
                    match base64::engine::general_purpose::STANDARD.decode(&blob.data) {
                        Ok(bytes) => events.push(LiveEvent::Audio(Bytes::from(bytes))),
                        Err(e) => warn!(error = %e, "invalid base64 in audio part"),
                    }
                }
            }
        }
        if content.turn_complete == Some(true) {
            debug!("model turn complete");
        }
    }
    events
}
