use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::error;

use super::{ApiError, api_error};
use crate::api::state::ApiState;
use crate::content::database::count_content;
use crate::global::queue::{TaskStats, task_stats};

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
pub struct StatsResponse {
    content_count: u64,
    categories: usize,
    tasks: TaskStats,
    modules: ModuleStats,
}

#[derive(Serialize)]
struct ModuleStats {
    catalog_enabled: bool,
    tmdb_enabled: bool,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get application statistics
pub async fn get_stats(State(state): State<ApiState>) -> Result<Json<StatsResponse>, ApiError> {
    let content_count = count_content(state.db.db()).await.map_err(|e| {
        error!(error = %e, "Failed to count content");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read statistics")
    })?;

    let tasks = task_stats(&state.db).await.map_err(|e| {
        error!(error = %e, "Failed to get task stats");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read statistics")
    })?;

    Ok(Json(StatsResponse {
        content_count,
        categories: state.config.catalog.categories.len(),
        tasks,
        modules: ModuleStats {
            catalog_enabled: state.catalog_module.is_some(),
            tmdb_enabled: state.config.tmdb.enabled,
        },
    }))
}
