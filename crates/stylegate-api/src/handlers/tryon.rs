//! Virtual try-on handlers
//!
//! Both routes take the garment as the `uploadedFile` multipart part. Plain
//! try-on composites it onto the configured base person image; the occasion
//! variant first downloads the person image from the `url` part.

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::Json;
use bytes::Bytes;
use stylegate_core::{Capability, InferenceRequest};

use super::publish;
use crate::error::ApiError;
use crate::normalize::{PublishedResponse, TRYON_MESSAGE};
use crate::state::AppState;

const RESULT_NAME: &str = "result.png";
const SAVE_ERROR: &str = "Failed to save result image";

/// File part of a multipart form
#[derive(Debug)]
struct FilePart {
    file_name: String,
    bytes: Bytes,
}

/// Parts of a try-on form that the handlers look at
#[derive(Debug, Default)]
struct TryOnForm {
    uploaded_file: Option<FilePart>,
    url: Option<String>,
}

impl TryOnForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = TryOnForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("uploadedFile") => {
                    // A part without a filename is a plain form value, not a file
                    let Some(file_name) = field.file_name().map(str::to_string) else {
                        continue;
                    };
                    let bytes = field.bytes().await?;
                    form.uploaded_file = Some(FilePart { file_name, bytes });
                }
                Some("url") => {
                    form.url = Some(field.text().await?);
                }
                _ => {}
            }
        }

        Ok(form)
    }

    fn require_file(&mut self) -> Result<FilePart, ApiError> {
        let file = self
            .uploaded_file
            .take()
            .ok_or_else(|| ApiError::bad_request("No file part"))?;
        if file.file_name.is_empty() {
            return Err(ApiError::bad_request("No selected file"));
        }
        Ok(file)
    }

    fn require_url(&mut self) -> Result<String, ApiError> {
        match self.url.take() {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(ApiError::bad_request("No url provided")),
        }
    }
}

/// POST /upload
/// Try the uploaded garment on the base person image
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PublishedResponse>, ApiError> {
    let client = state.client(Capability::VirtualTryon)?;
    let mut form = TryOnForm::read(multipart?).await?;
    let garment = form.require_file()?;

    tracing::info!(
        endpoint = client.endpoint(),
        file_name = %garment.file_name,
        size = garment.bytes.len(),
        "Try-on request"
    );

    let staged = state
        .staging()
        .stage_upload(&garment.bytes)
        .await
        .map_err(|e| ApiError::internal("Failed to save uploaded file", e))?;

    let result = client
        .invoke(InferenceRequest::TryOn {
            person_image: state.staging().base_image().to_path_buf(),
            garment_image: staged.path().to_path_buf(),
        })
        .await;
    state.staging().discard(staged).await;

    let response = publish(&state, result, RESULT_NAME, TRYON_MESSAGE, SAVE_ERROR).await?;
    Ok(Json(response))
}

/// POST /uploadocassion
/// Try the uploaded garment on a person image fetched from `url`
pub async fn upload_occasion(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PublishedResponse>, ApiError> {
    let client = state.client(Capability::VirtualTryon)?;
    let mut form = TryOnForm::read(multipart?).await?;
    let garment = form.require_file()?;
    let url = form.require_url()?;

    tracing::info!(
        endpoint = client.endpoint(),
        file_name = %garment.file_name,
        url = %url.trim(),
        "Occasion try-on request"
    );

    let person = state
        .staging()
        .stage_download(&url)
        .await
        .ok_or_else(|| {
            ApiError::internal(
                "Failed to download image",
                format!("Could not fetch {}", url.trim()),
            )
        })?;

    let garment = match state.staging().stage_upload(&garment.bytes).await {
        Ok(staged) => staged,
        Err(e) => {
            state.staging().discard(person).await;
            return Err(ApiError::internal("Failed to save uploaded file", e));
        }
    };

    let result = client
        .invoke(InferenceRequest::TryOn {
            person_image: person.path().to_path_buf(),
            garment_image: garment.path().to_path_buf(),
        })
        .await;
    state.staging().discard(person).await;
    state.staging().discard(garment).await;

    let response = publish(&state, result, RESULT_NAME, TRYON_MESSAGE, SAVE_ERROR).await?;
    Ok(Json(response))
}
