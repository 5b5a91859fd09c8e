use futures::stream::StreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOptions, IndexOptions, ReplaceOptions};
use mongodb::{Database, IndexModel};
use tracing::{debug, info, warn};

use super::model::ContentDocument;
use crate::catalog::{CatalogEntry, ContentId};
use crate::global::error::DatabaseError;

pub const CONTENT_COLLECTION: &str = "content";

/// Initialize the content collection and its indexes
pub async fn initialize_collections(db: &Database) -> Result<(), DatabaseError> {
    info!("Initializing content collections");

    let collection = db.collection::<ContentDocument>(CONTENT_COLLECTION);

    let id_index = IndexModel::builder()
        .keys(doc! { "content_id": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();

    // Slugs are resolved back to ids, so two documents may never share one
    let slug_index = IndexModel::builder()
        .keys(doc! { "slug": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();

    let popularity_index = IndexModel::builder()
        .keys(doc! { "popularity": -1, "content_id": 1 })
        .build();

    let genre_index = IndexModel::builder().keys(doc! { "genres": 1 }).build();

    collection
        .create_indexes(vec![id_index, slug_index, popularity_index, genre_index])
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to create content indexes: {}", e)))?;

    debug!("Created indexes for content collection");
    Ok(())
}

/// Insert or replace a document, keeping the original `fetched_at`.
pub async fn upsert_content(db: &Database, data: &ContentDocument) -> Result<(), DatabaseError> {
    let collection = db.collection::<ContentDocument>(CONTENT_COLLECTION);
    let filter = doc! { "content_id": data.content_id.to_string() };

    let mut data = data.clone();
    if let Some(existing) = collection
        .find_one(filter.clone())
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to read content: {}", e)))?
    {
        data.id = existing.id;
        data.fetched_at = existing.fetched_at;
    }

    collection
        .replace_one(filter, &data)
        .with_options(ReplaceOptions::builder().upsert(true).build())
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to upsert content: {}", e)))?;

    debug!(content_id = %data.content_id, slug = %data.slug, "Content upserted");
    Ok(())
}

pub async fn get_content(db: &Database, id: &ContentId) -> Result<Option<ContentDocument>, DatabaseError> {
    let collection = db.collection::<ContentDocument>(CONTENT_COLLECTION);

    collection
        .find_one(doc! { "content_id": id.to_string() })
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to get content: {}", e)))
}

pub async fn content_exists(db: &Database, id: &ContentId) -> Result<bool, DatabaseError> {
    let collection = db.collection::<ContentDocument>(CONTENT_COLLECTION);

    let count = collection
        .count_documents(doc! { "content_id": id.to_string() })
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to check existence: {}", e)))?;

    Ok(count > 0)
}

/// Every stored title in catalog order: most popular first, ties by id.
///
/// The order is stable between calls as long as the collection is
/// unchanged, which is what the category windows rely on.
pub async fn list_catalog_entries(db: &Database) -> Result<Vec<CatalogEntry>, DatabaseError> {
    let collection = db.collection::<CatalogEntry>(CONTENT_COLLECTION);

    let options = FindOptions::builder()
        .sort(doc! { "popularity": -1, "content_id": 1 })
        .projection(doc! {
            "_id": 0,
            "content_id": 1,
            "kind": 1,
            "title": 1,
            "slug": 1,
            "year": 1,
            "genres": 1,
            "countries": 1,
            "rating": 1,
            "popularity": 1,
        })
        .build();

    let mut cursor = collection
        .find(doc! {})
        .with_options(options)
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to list catalog: {}", e)))?;

    let mut results = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(entry) => results.push(entry),
            Err(e) => warn!(error = %e, "Failed to deserialize catalog entry"),
        }
    }

    Ok(results)
}

pub async fn count_content(db: &Database) -> Result<u64, DatabaseError> {
    let collection = db.collection::<ContentDocument>(CONTENT_COLLECTION);

    collection
        .count_documents(doc! {})
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to count content: {}", e)))
}

pub async fn delete_content(db: &Database, id: &ContentId) -> Result<bool, DatabaseError> {
    let collection = db.collection::<ContentDocument>(CONTENT_COLLECTION);

    let result = collection
        .delete_one(doc! { "content_id": id.to_string() })
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to delete content: {}", e)))?;

    Ok(result.deleted_count > 0)
}
