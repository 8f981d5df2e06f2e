//! API error types and conversions

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use stylegate_core::{BackendError, Capability};

/// API error type that converts to HTTP responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 400 Bad Request - a required input is missing or the body is malformed
    BadRequest(String),
    /// 404 Not Found - no route matched
    NotFound(String),
    /// 503 Service Unavailable - the capability has no bound client
    ServiceUnavailable { error: String, message: String },
    /// 500 Internal Server Error - remote call or staging failure
    Internal { error: String, message: String },
}

/// Error body returned to clients.
///
/// Validation failures carry only `error`; the other statuses add `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// The capability was never bound at startup
    pub fn unavailable(capability: Capability) -> Self {
        ApiError::ServiceUnavailable {
            error: format!("{} service not available", capability.display_name()),
            message: format!(
                "No endpoint for '{}' could be reached at startup",
                capability
            ),
        }
    }

    pub fn internal(error: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ApiError::Internal {
            error: error.into(),
            message: message.to_string(),
        }
    }

    /// A bound client's call failed; the remote message is passed through
    pub fn remote(err: BackendError) -> Self {
        Self::internal("Internal server error", err)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_body(self) -> ErrorResponse {
        match self {
            ApiError::BadRequest(error) => ErrorResponse {
                error,
                message: None,
            },
            ApiError::NotFound(message) => ErrorResponse {
                error: "Not found".to_string(),
                message: Some(message),
            },
            ApiError::ServiceUnavailable { error, message }
            | ApiError::Internal { error, message } => ErrorResponse {
                error,
                message: Some(message),
            },
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => f.write_str(msg),
            ApiError::ServiceUnavailable { error, message }
            | ApiError::Internal { error, message } => write!(f, "{}: {}", error, message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log errors at appropriate levels
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "API error");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "API client error");
        }

        (status, Json(self.into_body())).into_response()
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        ApiError::remote(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn bad_request_has_only_error() {
        let (status, body) = body_json(ApiError::bad_request("No file part")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "No file part"}));
    }

    #[tokio::test]
    async fn unavailable_names_the_service() {
        let (status, body) = body_json(ApiError::unavailable(Capability::Chatbot)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Chatbot service not available");
        assert!(body["message"].as_str().unwrap().contains("chatbot"));
    }

    #[tokio::test]
    async fn remote_failure_keeps_message() {
        let err = ApiError::from(BackendError::Remote("queue is full".into()));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["message"], "queue is full");
    }

    #[tokio::test]
    async fn not_found_shape() {
        let (status, body) = body_json(ApiError::NotFound("No route for /nope".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
        assert_eq!(body["message"], "No route for /nope");
    }
}
