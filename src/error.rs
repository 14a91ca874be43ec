//! Error types for the pulse-link library.

use thiserror::Error;

/// All errors surfaced by the library.
#[derive(Error, Debug)]
pub enum PulseLinkError {
    /// Client-side configuration is invalid (missing endpoint, bad URL, ...).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// WebSocket handshake or transport failure.
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// An operation did not complete within its deadline.
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// HTTP transport failure.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON encoding or decoding failure.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The server answered a REST call with a non-success status.
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Invariant violation inside the library.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, PulseLinkError>;
