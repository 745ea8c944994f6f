use std::net::SocketAddr;
use tracing::Level;

/// Fallback persona used when no prompt file is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a friendly voice companion living inside a small bedside robot. \
Keep answers short, warm, and spoken-word natural; the listener only ever \
hears you, never reads you.";

const DEFAULT_PORT: u16 = 8080;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error("Failed to read system prompt file {0}: {1}")]
    UnreadablePrompt(String, String),
}

/// Holds all configuration loaded from the environment at startup.
///
/// A missing `GEMINI_API_KEY` is deliberately not an error: the process
/// still starts and serves its liveness surface, it just never opens an
/// upstream session until restarted with a credential.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub gemini_api_key: Option<String>,
    pub model: String,
    pub voice: String,
    pub system_prompt: String,
    pub transcribe_input: bool,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), e.to_string()))?,
            Err(_) => DEFAULT_PORT,
        };
        let bind_address = SocketAddr::from(([0, 0, 0, 0], port));

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
        let voice = std::env::var("GEMINI_VOICE").unwrap_or_else(|_| "Kore".to_string());

        let system_prompt = match std::env::var("SYSTEM_PROMPT_PATH") {
            Ok(path) => std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::UnreadablePrompt(path, e.to_string()))?,
            Err(_) => DEFAULT_SYSTEM_PROMPT.to_string(),
        };

        let transcribe_input = match std::env::var("TRANSCRIBE_INPUT") {
            Ok(raw) => match raw.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ConfigError::InvalidValue(
                        "TRANSCRIBE_INPUT".to_string(),
                        format!("'{}' is not a boolean", other),
                    ));
                }
            },
            Err(_) => false,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            gemini_api_key,
            model,
            voice,
            system_prompt,
            transcribe_input,
            log_level,
        })
    }

    /// Snapshot handed to every upstream connect attempt. Constant for the
    /// process lifetime.
    pub fn session_config(&self) -> gemini_live::SessionConfig {
        gemini_live::SessionConfig {
            model: self.model.clone(),
            voice: self.voice.clone(),
            system_instruction: self.system_prompt.clone(),
            transcription_enabled: self.transcribe_input,
        }
    }
}
