//! Error handling for the Tethered client.

/// A specialized `Result` type for Tethered operations.
pub type Result<T> = std::result::Result<T, TetheredError>;

/// The main error type for Tethered client operations.
///
/// None of these escape the request dispatcher: they are recorded on
/// [`RequestResult::error`](crate::RequestResult) instead.
#[derive(Debug, thiserror::Error)]
pub enum TetheredError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport failed (connect, TLS, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The target URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request was rejected before anything was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A host metric could not be read
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TetheredError {
    /// Create a new invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a new metrics error
    pub fn metrics_error(msg: impl Into<String>) -> Self {
        Self::Metrics(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
