//! Error types for wumpbot

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error types
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration missing or invalid
    #[error("Config error: {0}")]
    Config(String),

    /// Local stream or process I/O failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Outbound channel has no consumer left
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}
