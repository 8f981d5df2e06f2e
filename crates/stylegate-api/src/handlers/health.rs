//! Health check handler

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use stylegate_core::ServiceStatus;

use crate::staging::DirectoryReport;
use crate::state::AppState;

/// Response for GET /health
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub directories: DirectoryReport<String>,
    pub directories_exist: DirectoryReport<bool>,
    /// Every configured capability with its availability
    pub services: BTreeMap<String, ServiceStatus>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        directories: state.staging().directories(),
        directories_exist: state.staging().directories_exist(),
        services: state.registry().statuses(),
    })
}
