//! Occasion recommendation handler

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use stylegate_core::{Capability, InferenceRequest};

use crate::error::ApiError;
use crate::normalize::{self, RecommendationResponse};
use crate::state::AppState;

/// Request body for POST /handleocassion
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccasionRequest {
    pub color: Option<String>,
    pub selected_occasion: Option<String>,
}

/// POST /handleocassion
/// Look up items for a color and an occasion
pub async fn handle_occasion(
    State(state): State<AppState>,
    body: Result<Json<OccasionRequest>, JsonRejection>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let client = state.client(Capability::Occasion)?;
    let Json(request) = body?;

    let (color, occasion) = match (request.color, request.selected_occasion) {
        (Some(color), Some(occasion)) if !color.is_empty() && !occasion.is_empty() => {
            (color, occasion)
        }
        _ => return Err(ApiError::bad_request("Color and occasion are required")),
    };

    tracing::info!(
        endpoint = client.endpoint(),
        color = %color,
        occasion = %occasion,
        "Occasion request"
    );

    let result = client
        .invoke(InferenceRequest::occasion(&color, &occasion))
        .await?;
    let response = normalize::recommendations(result)?;

    tracing::debug!(items = response.new_items.len(), "Occasion result");
    Ok(Json(response))
}
