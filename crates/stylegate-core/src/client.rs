//! InferenceClient trait - the seam between the HTTP layer and remote services

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::capability::Capability;
use crate::error::{BackendError, BackendResult};

/// Capability-specific input bundle for a single remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceRequest {
    /// Chatbot turn
    Chat { text: String },
    /// Virtual try-on: a person image and a garment image, both staged locally
    TryOn {
        person_image: PathBuf,
        garment_image: PathBuf,
    },
    /// Garment generation from a text prompt
    TextToDress { prompt: String },
    /// Recommendation lookup from a composed phrase
    Occasion { query: String },
}

impl InferenceRequest {
    /// Build the occasion query phrase from its two inputs
    pub fn occasion(color: &str, occasion: &str) -> Self {
        InferenceRequest::Occasion {
            query: format!("{} shirt for {}", color, occasion),
        }
    }

    /// The capability this request is addressed to
    pub fn capability(&self) -> Capability {
        match self {
            InferenceRequest::Chat { .. } => Capability::Chatbot,
            InferenceRequest::TryOn { .. } => Capability::VirtualTryon,
            InferenceRequest::TextToDress { .. } => Capability::TextToDress,
            InferenceRequest::Occasion { .. } => Capability::Occasion,
        }
    }
}

/// Raw output of a remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceResult {
    /// Text payload
    Text(String),
    /// Local path of a downloaded artifact
    File(PathBuf),
}

impl InferenceResult {
    pub fn into_text(self) -> BackendResult<String> {
        match self {
            InferenceResult::Text(text) => Ok(text),
            InferenceResult::File(path) => Err(BackendError::UnexpectedOutput(format!(
                "expected text, got file {}",
                path.display()
            ))),
        }
    }

    pub fn into_file(self) -> BackendResult<PathBuf> {
        match self {
            InferenceResult::File(path) => Ok(path),
            InferenceResult::Text(text) => Err(BackendError::UnexpectedOutput(format!(
                "expected file, got text '{}'",
                text
            ))),
        }
    }
}

/// A client bound to one remote endpoint.
///
/// Implementations perform exactly one remote attempt per `invoke`; retrying
/// is the business of endpoint resolution at startup, never of the call path.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Address of the endpoint this client is bound to
    fn endpoint(&self) -> &str;

    /// Invoke the remote operation once
    async fn invoke(&self, request: InferenceRequest) -> BackendResult<InferenceResult>;
}

/// Builds clients against candidate endpoints.
///
/// A successful `connect` means the endpoint is constructible; it says
/// nothing about whether later calls will succeed.
#[async_trait]
pub trait ClientConnector: Send + Sync {
    async fn connect(
        &self,
        capability: Capability,
        endpoint: &str,
    ) -> BackendResult<Arc<dyn InferenceClient>>;
}
