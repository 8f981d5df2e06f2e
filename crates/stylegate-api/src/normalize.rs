//! Result normalization - shape raw remote outputs into response bodies

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use stylegate_core::InferenceResult;

use crate::error::ApiError;

pub const TRYON_MESSAGE: &str = "Result image copied successfully.";
pub const TEXT_TO_DRESS_MESSAGE: &str = "Success";

/// `{result}` body for text-valued capabilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResponse {
    pub result: String,
}

/// `{message, filename}` body for published artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedResponse {
    pub message: String,
    pub filename: String,
}

/// `{newItems, showRecommendations}` body for occasion lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub new_items: Vec<String>,
    pub show_recommendations: bool,
}

fn wrong_shape(err: stylegate_core::BackendError) -> ApiError {
    ApiError::internal("Internal server error", err)
}

pub fn text(result: InferenceResult) -> Result<TextResponse, ApiError> {
    Ok(TextResponse {
        result: result.into_text().map_err(wrong_shape)?,
    })
}

/// Split the comma-delimited list as-is; empty segments are kept
pub fn recommendations(result: InferenceResult) -> Result<RecommendationResponse, ApiError> {
    let text = result.into_text().map_err(wrong_shape)?;
    Ok(RecommendationResponse {
        new_items: text.split(',').map(str::to_string).collect(),
        show_recommendations: true,
    })
}

/// Local path of a file-valued result
pub fn artifact(result: InferenceResult) -> Result<PathBuf, ApiError> {
    result.into_file().map_err(wrong_shape)
}

pub fn published(message: &str, filename: String) -> PublishedResponse {
    PublishedResponse {
        message: message.to_string(),
        filename,
    }
}
