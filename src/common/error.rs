//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {name}")]
    MissingVar { name: &'static str },

    #[error("Invalid value for '{name}': {message}")]
    InvalidVar { name: &'static str, message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors from the Minecraft status API.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Status request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Status API returned HTTP {status}")]
    Api { status: u16 },

    #[error("Timed out while reaching the status API")]
    Timeout,
}

/// Errors from the OpenRouter chat completion API.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("OpenRouter request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenRouter error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("OpenRouter returned no choices")]
    NoChoices,

    #[error("OpenRouter returned empty content")]
    EmptyContent,
}

/// Errors from the Lavalink node (REST or WebSocket).
#[derive(Debug, Error)]
pub enum LavalinkError {
    #[error("Lavalink request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Lavalink returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Lavalink socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid connection header: {0}")]
    Header(#[from] tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue),

    #[error("No Lavalink session established yet")]
    NoSession,
}

/// User-facing music subsystem failures. The `Display` text is what the
/// invoking user sees.
#[derive(Debug, Error)]
pub enum MusicError {
    #[error("Music playback isn't configured. Set the Lavalink environment variables and restart the bot.")]
    NotConfigured,

    #[error("Join a voice channel first, then ask me to play music.")]
    NotInVoice,

    #[error("I couldn't join that voice chat. Check my permissions and try again.")]
    JoinFailed,

    #[error("Please provide a search term or link.")]
    EmptyQuery,

    #[error("No matches found for that query.")]
    NoMatches,

    #[error("Nothing is playing to skip.")]
    NothingPlaying,

    #[error("There's nothing playing to pause.")]
    NothingToPause,

    #[error("I'm not paused right now.")]
    NotPaused,

    #[error("There's no active music session to stop.")]
    NoActiveSession,

    #[error("Lavalink error: {message}")]
    LoadFailed { message: String },

    #[error("Lavalink error: {0}")]
    Node(#[from] LavalinkError),
}
