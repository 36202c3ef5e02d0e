//! Crate-wide error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KioskError {
    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Persistent storage unavailable or inconsistent
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Audio could not be decoded or resampled
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Output device could not be opened or driven
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    #[error("Unknown trigger: {0}")]
    UnknownTrigger(String),
}

pub type Result<T> = std::result::Result<T, KioskError>;
