//! Error types for remote client operations

use thiserror::Error;

/// Result type alias for remote client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to a remote inference service
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Endpoint is neither a URL nor a hosted space identifier
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Server returned an error response
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Predict succeeded but the output cannot be used
    #[error("Unexpected output: {0}")]
    UnexpectedOutput(String),
}

impl ClientError {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    /// Message suitable for surfacing to API callers.
    ///
    /// Server errors carry the remote service's own message without the
    /// status prefix.
    pub fn remote_message(&self) -> String {
        match self {
            ClientError::ServerError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
