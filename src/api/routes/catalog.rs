use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{ApiError, api_error};
use crate::api::state::ApiState;
use crate::catalog::{
    AllocatedSection, CatalogEntry, ContentId, Page, PageCursor, SectionSpec, allocate_unique,
};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Offset token from a previous response, for "load more".
    pub cursor: Option<usize>,
}

#[derive(Serialize)]
pub struct CatalogPageResponse {
    pub category: String,
    pub page: Option<u32>,
    pub offset: usize,
    pub items: Vec<CatalogEntry>,
    pub exhausted: bool,
    pub next_page: Option<u32>,
    pub next_cursor: Option<usize>,
}

#[derive(Serialize)]
pub struct HomeSectionResponse {
    pub name: String,
    pub quota: usize,
    pub shortfall: usize,
    pub backfilled: usize,
    pub items: Vec<CatalogEntry>,
}

#[derive(Serialize)]
pub struct HomeResponse {
    pub sections: Vec<HomeSectionResponse>,
}

/// Look ids up in the snapshot, keeping page order.
fn hydrate(ids: &[ContentId], entries: &[CatalogEntry]) -> Vec<CatalogEntry> {
    let by_id: HashMap<&ContentId, &CatalogEntry> =
        entries.iter().map(|entry| (&entry.content_id, entry)).collect();
    ids.iter()
        .filter_map(|id| by_id.get(id).map(|entry| (*entry).clone()))
        .collect()
}

/// One window of a configured category
/// GET /api/catalog/{category}?page=N or ?cursor=K
pub async fn get_category_page(
    State(state): State<ApiState>,
    Path(category): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CatalogPageResponse>, ApiError> {
    let catalog = &state.config.catalog;
    let def = catalog
        .category(&category)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Unknown category '{}'", category)))?;

    let entries = state.catalog().await.map_err(|e| {
        error!(error = %e, "Failed to load catalog");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load catalog")
    })?;

    let region = def.region(&entries);
    let window = def.window(catalog.default_page_size);

    let (page_number, page): (Option<u32>, Page) = match query.cursor {
        Some(cursor) => {
            let mut cursor = PageCursor::resume(window, cursor);
            (None, cursor.next_page(&region))
        }
        None => {
            let number = query.page.unwrap_or(1).max(1);
            (Some(number), window.page(&region, number))
        }
    };

    debug!(
        category = %category,
        offset = page.offset,
        count = page.len(),
        exhausted = page.exhausted,
        "Catalog page served"
    );

    Ok(Json(CatalogPageResponse {
        category,
        page: page_number,
        offset: page.offset,
        items: hydrate(&page.ids, &entries),
        exhausted: page.exhausted,
        next_page: page_number.filter(|_| !page.exhausted).map(|n| n.saturating_add(1)),
        next_cursor: (!page.exhausted).then(|| page.next_offset()),
    }))
}

/// Home page sections, disjoint across sections
/// GET /api/home
pub async fn get_home(State(state): State<ApiState>) -> Result<Json<HomeResponse>, ApiError> {
    let catalog = &state.config.catalog;

    let entries = state.catalog().await.map_err(|e| {
        error!(error = %e, "Failed to load catalog");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load catalog")
    })?;

    let specs: Vec<SectionSpec<'_, CatalogEntry>> = catalog
        .home_sections
        .iter()
        .filter_map(|section| {
            let def = catalog.category(&section.category)?;
            Some(SectionSpec::new(
                def.name.clone(),
                section.quota,
                move |entry: &CatalogEntry| def.rule.matches(entry),
            ))
        })
        .collect();

    let allocation = allocate_unique(&entries, &specs);

    let sections = allocation
        .sections
        .iter()
        .map(|section: &AllocatedSection| HomeSectionResponse {
            name: section.name.clone(),
            quota: section.quota,
            shortfall: section.shortfall(),
            backfilled: section.backfilled,
            items: hydrate(&section.ids, &entries),
        })
        .collect();

    Ok(Json(HomeResponse { sections }))
}
