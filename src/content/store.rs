use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::database;
use super::model::ContentDocument;
use crate::catalog::{CatalogEntry, ContentId};
use crate::global::database::DatabaseInstance;
use crate::global::error::DatabaseError;

/// Storage port for fetched titles.
///
/// Route handlers and import tasks go through this trait, so they can run
/// against [`InMemoryContentStore`] when no MongoDB is around.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get(&self, id: &ContentId) -> Result<Option<ContentDocument>, DatabaseError>;

    async fn exists(&self, id: &ContentId) -> Result<bool, DatabaseError>;

    /// Insert or replace a document, keeping the original `fetched_at`.
    async fn upsert(&self, document: &ContentDocument) -> Result<(), DatabaseError>;

    /// Every stored title, most popular first, ties by id.
    async fn list_catalog(&self) -> Result<Vec<CatalogEntry>, DatabaseError>;
}

/// The `content` collection.
#[derive(Clone)]
pub struct MongoContentStore {
    db: Arc<DatabaseInstance>,
}

impl MongoContentStore {
    pub fn new(db: Arc<DatabaseInstance>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContentStore for MongoContentStore {
    async fn get(&self, id: &ContentId) -> Result<Option<ContentDocument>, DatabaseError> {
        database::get_content(self.db.db(), id).await
    }

    async fn exists(&self, id: &ContentId) -> Result<bool, DatabaseError> {
        database::content_exists(self.db.db(), id).await
    }

    async fn upsert(&self, document: &ContentDocument) -> Result<(), DatabaseError> {
        database::upsert_content(self.db.db(), document).await
    }

    async fn list_catalog(&self) -> Result<Vec<CatalogEntry>, DatabaseError> {
        database::list_catalog_entries(self.db.db()).await
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryContentStore {
    documents: Arc<Mutex<HashMap<ContentId, ContentDocument>>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn get(&self, id: &ContentId) -> Result<Option<ContentDocument>, DatabaseError> {
        Ok(self.documents.lock().await.get(id).cloned())
    }

    async fn exists(&self, id: &ContentId) -> Result<bool, DatabaseError> {
        Ok(self.documents.lock().await.contains_key(id))
    }

    async fn upsert(&self, document: &ContentDocument) -> Result<(), DatabaseError> {
        let mut guard = self.documents.lock().await;
        let mut document = document.clone();
        if let Some(existing) = guard.get(&document.content_id) {
            document.fetched_at = existing.fetched_at;
        }
        guard.insert(document.content_id.clone(), document);
        Ok(())
    }

    async fn list_catalog(&self) -> Result<Vec<CatalogEntry>, DatabaseError> {
        let guard = self.documents.lock().await;
        let mut entries: Vec<CatalogEntry> = guard.values().map(CatalogEntry::from).collect();
        // Same order as the Mongo index: ids compare as stored strings
        entries.sort_by(|a, b| {
            b.popularity
                .total_cmp(&a.popularity)
                .then_with(|| a.content_id.to_string().cmp(&b.content_id.to_string()))
        });
        Ok(entries)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::catalog::ContentKind;

    pub(crate) fn document(id: &str, title: &str, popularity: f64) -> ContentDocument {
        let content_id: ContentId = id.parse().unwrap();
        let now = Utc::now();
        ContentDocument {
            id: None,
            kind: match content_id {
                ContentId::Movie(_) => ContentKind::Movie,
                ContentId::Series(_) => ContentKind::Series,
            },
            slug: crate::catalog::build_slug(title, &content_id).into_string(),
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
            popularity,
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

    #[tokio::test]
    async fn upsert_keeps_first_fetch_time() {
        let store = InMemoryContentStore::new();
        let mut first = document("1396", "Breaking Bad", 50.0);
        first.fetched_at = Utc::now() - Duration::days(3);
        store.upsert(&first).await.unwrap();

        let mut refreshed = document("1396", "Breaking Bad", 80.0);
        refreshed.fetched_at = Utc::now();
        store.upsert(&refreshed).await.unwrap();

        let stored = store.get(&"1396".parse().unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.fetched_at, first.fetched_at);
        assert_eq!(stored.popularity, 80.0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn catalog_is_ordered_by_popularity_then_id() {
        let store = InMemoryContentStore::new();
        for doc in [
            document("tt0111161", "The Shawshank Redemption", 10.0),
            document("1396", "Breaking Bad", 90.0),
            document("tt0068646", "The Godfather", 10.0),
        ] {
            store.upsert(&doc).await.unwrap();
        }

        let ids: Vec<String> = store
            .list_catalog()
            .await
            .unwrap()
            .iter()
            .map(|entry| entry.content_id.to_string())
            .collect();
        assert_eq!(ids, ["1396", "tt0068646", "tt0111161"]);
    }
}
