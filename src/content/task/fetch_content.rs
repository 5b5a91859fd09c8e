use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{ContentId, TitleHeuristic};
use crate::content::converter::metadata_to_document;
use crate::content::model::ContentDocument;
use crate::content::provider::MetadataProvider;
use crate::content::store::{ContentStore, MongoContentStore};
use crate::global::{
    database::DatabaseInstance,
    error::AppError,
    queue::{Task, TaskData, TaskPriority, TaskStatus},
};

pub const FETCH_CONTENT_TASK: &str = "fetch_content";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchContentPayload {
    pub content_id: ContentId,
}

/// Fetch one title from the provider and store it.
pub async fn fetch_and_store(
    store: &dyn ContentStore,
    provider: &dyn MetadataProvider,
    heuristic: &dyn TitleHeuristic,
    id: &ContentId,
) -> Result<ContentDocument, AppError> {
    let meta = provider.fetch(id).await?;
    let document = metadata_to_document(meta, heuristic);
    store.upsert(&document).await?;
    Ok(document)
}

pub struct FetchContentTask {
    id: String,
    content_id: ContentId,
    provider: Arc<dyn MetadataProvider>,
    heuristic: Arc<dyn TitleHeuristic>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl FetchContentTask {
    pub fn new(
        content_id: ContentId,
        provider: Arc<dyn MetadataProvider>,
        heuristic: Arc<dyn TitleHeuristic>,
    ) -> Self {
        Self {
            id: format!("fetch_{}_{}", content_id, uuid::Uuid::new_v4()),
            content_id,
            provider,
            heuristic,
            created_at: chrono::Utc::now(),
        }
    }

    /// Keep the identity of a persisted task so its queue record is reused.
    pub fn restored(mut self, data: &TaskData) -> Self {
        self.id = data.id.clone();
        self.created_at = data.created_at;
        self
    }

    pub fn content_id(&self) -> &ContentId {
        &self.content_id
    }
}

#[async_trait::async_trait]
impl Task for FetchContentTask {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> &str {
        FETCH_CONTENT_TASK
    }

    fn priority(&self) -> TaskPriority {
        TaskPriority::Normal
    }

    fn to_data(&self) -> TaskData {
        let payload = FetchContentPayload {
            content_id: self.content_id.clone(),
        };

        TaskData {
            id: self.id.clone(),
            name: self.name().to_string(),
            priority: self.priority(),
            status: TaskStatus::Pending,
            created_at: self.created_at,
            payload: serde_json::to_value(payload).unwrap_or_default(),
        }
    }

    async fn execute(&self, db: Arc<DatabaseInstance>) -> Result<(), AppError> {
        info!(
            task = %self.name(),
            provider = %self.provider.name(),
            content_id = %self.content_id,
            "Fetching content"
        );

        let store = MongoContentStore::new(db);
        let document =
            fetch_and_store(&store, self.provider.as_ref(), self.heuristic.as_ref(), &self.content_id).await?;

        info!(
            task = %self.name(),
            content_id = %document.content_id,
            slug = %document.slug,
            title = %document.title,
            "Content stored"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::KeywordHeuristic;
    use crate::content::provider::tests::FakeProvider;
    use crate::content::store::InMemoryContentStore;

    #[test]
    fn payload_round_trips_through_task_data() {
        let id: ContentId = "1396".parse().unwrap();
        let task = FetchContentTask::new(
            id.clone(),
            Arc::new(FakeProvider::new(vec![])),
            Arc::new(KeywordHeuristic::default()),
        );

        let data = task.to_data();
        assert_eq!(data.name, FETCH_CONTENT_TASK);
        assert_eq!(data.priority, TaskPriority::Normal);
        assert_eq!(data.payload, serde_json::json!({ "content_id": "1396" }));

        let payload: FetchContentPayload = serde_json::from_value(data.payload).unwrap();
        assert_eq!(payload.content_id, id);
    }

    #[tokio::test]
    async fn fetched_title_is_stored_under_its_canonical_slug() {
        let id: ContentId = "tt0068646".parse().unwrap();
        let provider = FakeProvider::new(vec![(id.clone(), "The Godfather".into())]);
        let store = InMemoryContentStore::new();

        let document = fetch_and_store(&store, &provider, &KeywordHeuristic::default(), &id)
            .await
            .unwrap();
        assert_eq!(document.slug, "the-godfather-tt0068646");

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.slug, document.slug);
    }

    #[tokio::test]
    async fn provider_errors_leave_the_store_untouched() {
        let id: ContentId = "1396".parse().unwrap();
        let store = InMemoryContentStore::new();

        let result = fetch_and_store(&store, &FakeProvider::new(vec![]), &KeywordHeuristic::default(), &id).await;
        assert!(matches!(result, Err(AppError::Http(_))));
        assert!(store.is_empty().await);
    }
}
