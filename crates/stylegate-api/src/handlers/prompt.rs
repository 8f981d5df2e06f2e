//! Text-to-dress handler

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use stylegate_core::{Capability, InferenceRequest};

use super::{publish, required};
use crate::error::ApiError;
use crate::normalize::{PublishedResponse, TEXT_TO_DRESS_MESSAGE};
use crate::state::AppState;

/// Request body for POST /handleprompt
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: Option<String>,
}

/// POST /handleprompt
/// Generate a garment image from a prompt and publish it
pub async fn handle_prompt(
    State(state): State<AppState>,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<PublishedResponse>, ApiError> {
    let client = state.client(Capability::TextToDress)?;
    let Json(request) = body?;
    let prompt = required(request.prompt, "No prompt provided")?;

    tracing::info!(endpoint = client.endpoint(), prompt = %prompt, "Text-to-dress request");

    let result = client.invoke(InferenceRequest::TextToDress { prompt }).await;
    let response = publish(
        &state,
        result,
        "generated_dress.png",
        TEXT_TO_DRESS_MESSAGE,
        "Failed to save generated image",
    )
    .await?;

    Ok(Json(response))
}
