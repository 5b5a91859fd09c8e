use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::fetch_content::fetch_and_store;
use crate::catalog::{ContentId, TitleHeuristic};
use crate::content::provider::MetadataProvider;
use crate::content::store::{ContentStore, MongoContentStore};
use crate::global::{
    config::ImportConfig,
    database::DatabaseInstance,
    error::AppError,
    queue::{Task, TaskData, TaskPriority, TaskStatus},
};

pub const BATCH_FETCH_TASK: &str = "batch_fetch_content";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFetchPayload {
    pub content_ids: Vec<ContentId>,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum ItemResult {
    Stored,
    Skipped,
    Failed,
}

pub struct BatchFetchTask {
    id: String,
    content_ids: Vec<ContentId>,
    refresh: bool,
    provider: Arc<dyn MetadataProvider>,
    heuristic: Arc<dyn TitleHeuristic>,
    import: ImportConfig,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl BatchFetchTask {
    pub fn new(
        content_ids: Vec<ContentId>,
        provider: Arc<dyn MetadataProvider>,
        heuristic: Arc<dyn TitleHeuristic>,
        import: ImportConfig,
    ) -> Self {
        Self {
            id: format!("batch_{}", uuid::Uuid::new_v4()),
            content_ids,
            refresh: false,
            provider,
            heuristic,
            import,
            created_at: chrono::Utc::now(),
        }
    }

    /// Keep the identity of a persisted task so its queue record is reused.
    pub fn restored(mut self, data: &TaskData) -> Self {
        self.id = data.id.clone();
        self.created_at = data.created_at;
        self
    }

    /// Refetch titles that are already stored
    pub fn with_refresh(mut self) -> Self {
        self.refresh = true;
        self
    }

    async fn fetch_one(&self, store: &dyn ContentStore, id: &ContentId) -> ItemResult {
        if !self.refresh {
            match store.exists(id).await {
                Ok(true) => {
                    debug!(task = %self.name(), content_id = %id, "Already stored, skipping");
                    return ItemResult::Skipped;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(task = %self.name(), content_id = %id, error = %e, "Existence check failed");
                    return ItemResult::Failed;
                }
            }
        }

        match fetch_and_store(store, self.provider.as_ref(), self.heuristic.as_ref(), id).await {
            Ok(_) => ItemResult::Stored,
            Err(e) => {
                warn!(task = %self.name(), content_id = %id, error = %e, "Failed to fetch content in batch");
                ItemResult::Failed
            }
        }
    }

    /// Fetch every id in chunks of `batch_size`, at most `concurrency` at a
    /// time. Individual failures are counted, never propagated.
    pub async fn run_batch(&self, store: &dyn ContentStore) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let chunk_size = self.import.batch_size.max(1);
        let concurrency = self.import.concurrency.max(1);
        let chunks: Vec<&[ContentId]> = self.content_ids.chunks(chunk_size).collect();

        for (index, chunk) in chunks.iter().enumerate() {
            let results: Vec<ItemResult> = stream::iter(chunk.iter().cloned())
                .map(|id| async move { self.fetch_one(store, &id).await })
                .buffer_unordered(concurrency)
                .collect()
                .await;

            for result in results {
                match result {
                    ItemResult::Stored => outcome.stored += 1,
                    ItemResult::Skipped => outcome.skipped += 1,
                    ItemResult::Failed => outcome.failed += 1,
                }
            }

            info!(
                task = %self.name(),
                progress = format!("{}/{}", index + 1, chunks.len()),
                stored = outcome.stored,
                skipped = outcome.skipped,
                failed = outcome.failed,
                "Batch chunk finished"
            );

            if index + 1 < chunks.len() && self.import.inter_batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.import.inter_batch_delay_ms)).await;
            }
        }

        outcome
    }
}

#[async_trait::async_trait]
impl Task for BatchFetchTask {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn name(&self) -> &str {
        BATCH_FETCH_TASK
    }

    fn priority(&self) -> TaskPriority {
        TaskPriority::Low
    }

    fn to_data(&self) -> TaskData {
        let payload = BatchFetchPayload {
            content_ids: self.content_ids.clone(),
            refresh: self.refresh,
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
            count = self.content_ids.len(),
            refresh = self.refresh,
            "Batch fetching content"
        );

        let store = MongoContentStore::new(db);
        let outcome = self.run_batch(&store).await;

        info!(
            task = %self.name(),
            total = self.content_ids.len(),
            stored = outcome.stored,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Batch fetch completed"
        );
        Ok(())
    }
}
