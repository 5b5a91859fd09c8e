use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use media_catalog::api::server::create_app;
use media_catalog::api::state::ApiState;
use media_catalog::catalog::{CatalogEntry, ContentId, ContentKind, build_slug};
use media_catalog::content::{ContentDocument, ContentStore, InMemoryContentStore};
use media_catalog::global::config::AppConfig;
use media_catalog::global::database::DatabaseInstance;

const CONFIG: &str = r#"
[app]
log_level = "debug"

[database]
host = "localhost"
port = 27017
name = "media_catalog_test"

[http]
timeout_seconds = 5
user_agent = "media-catalog-test"
default_rate_limit = 5.0

[http.retry]
max_retries = 0
base_delay_ms = 10
max_delay_ms = 10

[catalog]
default_page_size = 3

[[catalog.categories]]
name = "trending"
rule = { rule = "all" }

[[catalog.categories]]
name = "horror"
rule = { rule = "genre", value = "Horror" }

[[catalog.home_sections]]
category = "horror"
quota = 3

[[catalog.home_sections]]
category = "trending"
quota = 3
"#;

fn entry(n: u32, genres: &[&str]) -> CatalogEntry {
    let content_id: ContentId = format!("tt{n:07}").parse().unwrap();
    CatalogEntry {
        slug: format!("title-{n}-{content_id}"),
        content_id,
        kind: ContentKind::Movie,
        title: format!("Title {n}"),
        year: Some(2000),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        countries: vec![],
        rating: None,
        popularity: 100.0 - n as f64,
    }
}

fn document(id: &str, title: &str) -> ContentDocument {
    let content_id: ContentId = id.parse().unwrap();
    let now = chrono::Utc::now();
    ContentDocument {
        id: None,
        kind: match content_id {
            ContentId::Movie(_) => ContentKind::Movie,
            ContentId::Series(_) => ContentKind::Series,
        },
        slug: build_slug(title, &content_id).into_string(),
        content_id,
        title: title.to_string(),
        original_title: None,
        overview: None,
        year: None,
        genres: vec![],
        genres_inferred: false,
        countries: vec![],
        rating: None,
        vote_count: None,
        popularity: 10.0,
        poster_path: None,
        backdrop_path: None,
        runtime_minutes: None,
        seasons: None,
        episodes: None,
        tmdb_id: None,
        imdb_id: None,
        fetched_at: now,
        updated_at: now,
    }
}

/// State backed by an in-memory store with a pre-filled catalog snapshot, so
/// no route below needs MongoDB.
async fn state() -> ApiState {
    let config = Arc::new(AppConfig::from_toml(CONFIG).unwrap());
    // The driver connects lazily.
    let db = DatabaseInstance::new("localhost", 27017, "media_catalog_test")
        .await
        .unwrap();
    let store = InMemoryContentStore::new();
    store.upsert(&document("tt0068646", "The Godfather")).await.unwrap();
    store.upsert(&document("1396", "Breaking Bad")).await.unwrap();
    let state = ApiState::new(config, Arc::new(db)).with_store(Arc::new(store));

    let entries = vec![
        entry(1, &["Drama"]),
        entry(2, &["Horror"]),
        entry(3, &[]),
        entry(4, &["Horror"]),
        entry(5, &[]),
        entry(6, &[]),
        entry(7, &[]),
    ];
    state.snapshot.insert((), Arc::new(entries)).await;
    state
}

async fn get(state: ApiState, uri: &str) -> (StatusCode, Value) {
    let response = create_app(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post(state: ApiState, uri: &str, body: Value) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    create_app(state).oneshot(request).await.unwrap().status()
}

fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["content_id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_reports_version() {
    let (status, body) = get(state().await, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn invalid_slug_is_not_found() {
    let (status, body) = get(state().await, "/api/resolve/just-a-title").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("just-a-title"));
}

#[tokio::test]
async fn canonical_slug_resolves_to_the_stored_title() {
    let (status, body) = get(state().await, "/api/resolve/the-godfather-tt0068646").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content_id"], "tt0068646");
    assert_eq!(body["canonical_slug"], "the-godfather-tt0068646");
    assert_eq!(body["content"]["title"], "The Godfather");
}

#[tokio::test]
async fn stale_title_prefix_still_resolves_by_id() {
    let (status, body) = get(state().await, "/api/resolve/old-name-1396").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["canonical_slug"], "breaking-bad-1396");
}

#[tokio::test]
async fn legacy_movie_url_redirects_permanently() {
    let response = create_app(state().await)
        .oneshot(
            Request::builder()
                .uri("/api/resolve/tt0068646")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(
        response.headers()["location"],
        "/api/resolve/the-godfather-tt0068646"
    );
}

#[tokio::test]
async fn well_formed_but_unknown_ids_are_not_found() {
    for uri in [
        "/api/resolve/tt9999999",
        "/api/resolve/missing-movie-tt9999999",
        "/api/resolve/missing-show-424242",
    ] {
        let (status, _) = get(state().await, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn unknown_category_is_not_found() {
    let (status, _) = get(state().await, "/api/catalog/westerns").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn category_pages_are_stable_windows() {
    let state = state().await;

    let (status, first) = get(state.clone(), "/api/catalog/trending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&first["items"]), ["tt0000001", "tt0000002", "tt0000003"]);
    assert_eq!(first["next_page"], 2);
    assert_eq!(first["next_cursor"], 3);

    let (_, again) = get(state.clone(), "/api/catalog/trending?page=1").await;
    assert_eq!(ids(&again["items"]), ids(&first["items"]));

    let (_, third) = get(state.clone(), "/api/catalog/trending?page=3").await;
    assert_eq!(ids(&third["items"]), ["tt0000007"]);
    assert_eq!(third["exhausted"], true);
    assert_eq!(third["next_page"], Value::Null);
}

#[tokio::test]
async fn cursor_continues_where_the_last_page_ended() {
    let state = state().await;

    let (_, page) = get(state.clone(), "/api/catalog/trending?cursor=3").await;
    assert_eq!(ids(&page["items"]), ["tt0000004", "tt0000005", "tt0000006"]);
    assert_eq!(page["next_cursor"], 6);

    let (_, horror) = get(state, "/api/catalog/horror").await;
    assert_eq!(ids(&horror["items"]), ["tt0000002", "tt0000004"]);
    assert_eq!(horror["exhausted"], true);
}

#[tokio::test]
async fn home_sections_never_repeat_an_id() {
    let (status, body) = get(state().await, "/api/home").await;
    assert_eq!(status, StatusCode::OK);

    let sections = body["sections"].as_array().unwrap();
    assert_eq!(sections[0]["name"], "horror");
    // Two horror titles plus one backfilled title.
    assert_eq!(ids(&sections[0]["items"]), ["tt0000002", "tt0000004", "tt0000001"]);
    assert_eq!(sections[0]["backfilled"], 1);
    assert_eq!(sections[0]["shortfall"], 0);

    assert_eq!(ids(&sections[1]["items"]), ["tt0000003", "tt0000005", "tt0000006"]);
}

#[tokio::test]
async fn import_rejects_malformed_ids() {
    let state = state().await;
    assert_eq!(
        post(state.clone(), "/api/content/fetch", serde_json::json!({ "id": "tt12" })).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        post(state.clone(), "/api/content/batch", serde_json::json!({ "ids": ["1396", "0"] })).await,
        StatusCode::BAD_REQUEST
    );
    // Valid id, but no import module configured.
    assert_eq!(
        post(state, "/api/content/fetch", serde_json::json!({ "id": "tt0068646" })).await,
        StatusCode::SERVICE_UNAVAILABLE
    );
}
