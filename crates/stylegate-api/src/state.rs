//! Application state for the stylegate API

use std::sync::Arc;

use stylegate_core::{Capability, InferenceClient};
use stylegate_registry::CapabilityRegistry;

use crate::error::ApiError;
use crate::staging::StagingArea;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Clients bound at startup, never modified afterwards
    registry: Arc<CapabilityRegistry>,
    /// Uploads and public directories
    staging: Arc<StagingArea>,
}

impl AppState {
    pub fn new(registry: Arc<CapabilityRegistry>, staging: Arc<StagingArea>) -> Self {
        Self { registry, staging }
    }

    /// Get the bound client for a capability, or 503 if none was bound
    pub fn client(&self, capability: Capability) -> Result<Arc<dyn InferenceClient>, ApiError> {
        self.registry.get(capability).ok_or_else(|| {
            tracing::warn!(capability = %capability, "Request for unavailable capability");
            ApiError::unavailable(capability)
        })
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }
}
