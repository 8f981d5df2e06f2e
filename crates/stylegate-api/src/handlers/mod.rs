//! HTTP request handlers for the stylegate API
//!
//! Every handler checks availability first, then validates its inputs, and
//! only then stages files and calls the bound client exactly once.

pub mod chat;
pub mod health;
pub mod occasion;
pub mod prompt;
pub mod tryon;

use axum::http::{Method, Uri};
use stylegate_core::{BackendResult, InferenceResult};

use crate::error::ApiError;
use crate::normalize::{self, PublishedResponse};
use crate::state::AppState;

/// Fallback for unmatched routes
pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {} {}", method, uri.path()))
}

/// A required field: absent and empty are both rejected with `message`
pub(crate) fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ApiError::bad_request(message)),
    }
}

/// Publish a file-valued result into the public directory.
///
/// The remote client's downloaded copy is removed once published.
pub(crate) async fn publish(
    state: &AppState,
    result: BackendResult<InferenceResult>,
    logical_name: &str,
    message: &str,
    save_error: &str,
) -> Result<PublishedResponse, ApiError> {
    let artifact = normalize::artifact(result?)?;

    let published = state.staging().publish_result(&artifact, logical_name).await;
    if let Err(e) = tokio::fs::remove_file(&artifact).await {
        tracing::debug!(path = %artifact.display(), error = %e, "Could not remove downloaded artifact");
    }

    let filename = published.map_err(|e| ApiError::internal(save_error, e))?;
    Ok(normalize::published(message, filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_missing_and_empty() {
        assert_eq!(
            required(Some("hello".into()), "No text provided").unwrap(),
            "hello"
        );
        assert_eq!(
            required(Some(String::new()), "No text provided").unwrap_err(),
            ApiError::bad_request("No text provided")
        );
        assert_eq!(
            required(None, "No prompt provided").unwrap_err(),
            ApiError::bad_request("No prompt provided")
        );
    }
}
