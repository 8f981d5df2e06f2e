//! Common error types for inference clients

use thiserror::Error;

/// Result type for client operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur while building or invoking an inference client
#[derive(Debug, Error)]
pub enum BackendError {
    /// Endpoint could not be reached or did not look like an inference service
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The remote service accepted the call but reported a failure
    #[error("{0}")]
    Remote(String),

    /// The remote service answered with an output of the wrong shape
    #[error("Unexpected output: {0}")]
    UnexpectedOutput(String),

    /// The request does not fit the capability it was sent to
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Local filesystem failure while handling artifacts
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Whether the error happened before a remote endpoint was bound
    pub fn is_connect(&self) -> bool {
        matches!(self, BackendError::Connect(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_message_is_verbatim() {
        let err = BackendError::Remote("CUDA out of memory".to_string());
        assert_eq!(err.to_string(), "CUDA out of memory");
    }

    #[test]
    fn connect_is_flagged() {
        assert!(BackendError::Connect("refused".into()).is_connect());
        assert!(!BackendError::Remote("boom".into()).is_connect());
    }
}
