//! Error types for sous

use thiserror::Error;

/// Result type alias for sous operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sous
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Voice input/output not supported in the current environment.
    /// Surfaced once to the user; the feature simply stays off.
    #[error("voice capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Voice processing error
    #[error("voice error: {0}")]
    Voice(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Recipe backend error
    #[error("backend error: {0}")]
    Backend(String),

    /// Zero steps resolved for a cooking session
    #[error("recipe has no steps: {0}")]
    EmptyRecipe(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
