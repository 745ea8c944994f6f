//! Seam between the bridge loop and the provider session client.

use async_trait::async_trait;
use gemini_live::{ConnectError, LiveEvent, LiveSession, SessionConfig};
use tokio::sync::mpsc;

/// One freshly opened upstream session: the send handle plus the ordered
/// stream of events the provider delivers for it.
pub struct Upstream {
    pub session: LiveSession,
    pub events: mpsc::Receiver<LiveEvent>,
}

/// Opens upstream sessions. The bridge loop only ever holds one open
/// [`Upstream`] at a time and replaces it wholesale on reconnect.
#[async_trait]
pub trait UpstreamConnector: Send + Sync {
    async fn connect(&self) -> Result<Upstream, ConnectError>;
}

/// Production connector backed by the Gemini Live API.
pub struct GeminiConnector {
    api_key: String,
    config: SessionConfig,
}

impl GeminiConnector {
    pub fn new(api_key: String, config: SessionConfig) -> Self {
        Self { api_key, config }
    }
}

#[async_trait]
impl UpstreamConnector for GeminiConnector {
    async fn connect(&self) -> Result<Upstream, ConnectError> {
        let (session, events) = gemini_live::connect(&self.api_key, &self.config).await?;
        Ok(Upstream { session, events })
    }
}
