use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{ApiError, api_error};
use crate::api::state::ApiState;
use crate::catalog::{Classification, ContentId, build_slug, classify, has_truncated_movie_marker};
use crate::content::ContentDocument;

// ========================================================================
// Request/Response Types
// ========================================================================

#[derive(Debug, Deserialize)]
pub struct FetchContentRequest {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchFetchRequest {
    pub ids: Vec<String>,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Serialize)]
pub struct TaskQueuedResponse {
    pub message: String,
    pub task_id: String,
    pub task_type: String,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub content_id: ContentId,
    pub canonical_slug: String,
    pub content: ContentDocument,
}

// ========================================================================
// Handlers
// ========================================================================

/// Resolve a URL slug to stored content
/// GET /api/resolve/{slug}
pub async fn resolve(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<Response, ApiError> {
    let classification = classify(&slug);

    let Some(content_id) = classification.content_id() else {
        info!(slug = %slug, "Unresolvable slug");
        return Err(api_error(StatusCode::NOT_FOUND, format!("No content for '{}'", slug)));
    };

    if has_truncated_movie_marker(&slug) {
        warn!(
            slug = %slug,
            content_id = %content_id,
            "Slug resolves to a series but ends in a truncated movie marker"
        );
    }

    let document = state
        .store
        .get(&content_id)
        .await
        .map_err(|e| {
            error!(error = %e, content_id = %content_id, "Failed to get content");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to resolve slug")
        })?
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                format!("Content {} is not in the catalog", content_id),
            )
        })?;

    let canonical = build_slug(&document.title, &content_id);

    if matches!(classification, Classification::Movie { legacy: true, .. }) {
        info!(slug = %slug, canonical = %canonical, "Redirecting legacy movie URL");
        let location = format!("/api/resolve/{}", canonical);
        return Ok(Redirect::permanent(&location).into_response());
    }

    Ok(Json(ResolveResponse {
        content_id,
        canonical_slug: canonical.into_string(),
        content: document,
    })
    .into_response())
}

/// Queue a metadata fetch for one id
/// POST /api/content/fetch
/// Body: { "id": "tt0068646" }
pub async fn fetch_content(
    State(state): State<ApiState>,
    Json(request): Json<FetchContentRequest>,
) -> Result<Json<TaskQueuedResponse>, ApiError> {
    info!(id = %request.id, "API request: fetch content");

    let content_id: ContentId = request
        .id
        .parse()
        .map_err(|e: String| api_error(StatusCode::BAD_REQUEST, e))?;

    let module = catalog_module(&state)?;
    let task_id = module.queue_fetch(content_id.clone()).await.map_err(|e| {
        error!(error = %e, "Failed to queue fetch task");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to queue task: {}", e))
    })?;

    Ok(Json(TaskQueuedResponse {
        message: format!("Fetch task queued for {}", content_id),
        task_id,
        task_type: crate::content::task::FETCH_CONTENT_TASK.to_string(),
    }))
}

/// Queue a batch metadata fetch
/// POST /api/content/batch
/// Body: { "ids": ["tt0068646", "1396"], "refresh": false }
pub async fn batch_fetch(
    State(state): State<ApiState>,
    Json(request): Json<BatchFetchRequest>,
) -> Result<Json<TaskQueuedResponse>, ApiError> {
    info!(count = request.ids.len(), refresh = request.refresh, "API request: batch fetch");

    if request.ids.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "ids must not be empty"));
    }

    let content_ids = request
        .ids
        .iter()
        .map(|id| id.parse::<ContentId>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;

    let module = catalog_module(&state)?;
    let count = content_ids.len();
    let task_id = module
        .queue_batch(content_ids, request.refresh)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to queue batch task");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to queue task: {}", e))
        })?;

    Ok(Json(TaskQueuedResponse {
        message: format!("Batch fetch task queued for {} ids", count),
        task_id,
        task_type: crate::content::task::BATCH_FETCH_TASK.to_string(),
    }))
}

fn catalog_module(state: &ApiState) -> Result<&std::sync::Arc<crate::content::CatalogModule>, ApiError> {
    state.catalog_module.as_ref().ok_or_else(|| {
        error!("Catalog module not available");
        api_error(StatusCode::SERVICE_UNAVAILABLE, "Metadata import is not enabled")
    })
}
