pub mod catalog;
pub mod content;
pub mod health;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;

use crate::api::state::ApiState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Create the main API router
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/stats", get(health::get_stats))

        // Slug resolution and catalog browsing
        .route("/api/resolve/{slug}", get(content::resolve))
        .route("/api/catalog/{category}", get(catalog::get_category_page))
        .route("/api/home", get(catalog::get_home))

        // Import
        .route("/api/content/fetch", post(content::fetch_content))
        .route("/api/content/batch", post(content::batch_fetch))

        .with_state(state)
}
