//! stylegate-api - HTTP layer of the stylegate gateway
//!
//! Routes each inbound request to the client bound for its capability,
//! stages any file inputs locally, and normalizes the remote output into a
//! JSON body. The layer only depends on the `InferenceClient` trait, so any
//! backend (remote or fake) can be plugged in through the registry.
//!
//! # Usage
//!
//! ```ignore
//! use stylegate_api::{create_router, AppState, StagingArea};
//!
//! let state = AppState::new(Arc::new(registry), Arc::new(staging));
//! let router = create_router(state);
//! ```

pub mod error;
pub mod handlers;
pub mod normalize;
pub mod staging;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use staging::{DirectoryReport, StagedFile, StagingArea, StagingError};
pub use state::AppState;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Multipart image uploads can exceed axum's default body cap
const UPLOAD_LIMIT_BYTES: usize = 32 * 1024 * 1024;

/// Create the gateway router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let results = ServeDir::new(state.staging().public_dir());

    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        // Chatbot
        .route("/predict", post(handlers::chat::predict))
        // Virtual try-on
        .route(
            "/upload",
            post(handlers::tryon::upload).layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        .route(
            "/uploadocassion",
            post(handlers::tryon::upload_occasion)
                .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES)),
        )
        // Text-to-dress
        .route("/handleprompt", post(handlers::prompt::handle_prompt))
        // Occasion recommendations
        .route("/handleocassion", post(handlers::occasion::handle_occasion))
        // Published results
        .nest_service("/results", results)
        .fallback(handlers::not_found)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
