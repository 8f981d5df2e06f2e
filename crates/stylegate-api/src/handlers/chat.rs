//! Chatbot handler

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use stylegate_core::{Capability, InferenceRequest};

use super::required;
use crate::error::ApiError;
use crate::normalize::{self, TextResponse};
use crate::state::AppState;

/// Request body for POST /predict
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: Option<String>,
}

/// POST /predict
/// Forward one chat turn to the chatbot service
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<TextResponse>, ApiError> {
    let client = state.client(Capability::Chatbot)?;
    let Json(request) = body?;
    let text = required(request.text, "No text provided")?;

    tracing::info!(endpoint = client.endpoint(), chars = text.len(), "Chat request");

    let result = client.invoke(InferenceRequest::Chat { text }).await?;
    let response = normalize::text(result)?;

    tracing::debug!(result = %response.result, "Chat result");
    Ok(Json(response))
}
