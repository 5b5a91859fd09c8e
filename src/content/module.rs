use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::provider::MetadataProvider;
use super::task::{
    BATCH_FETCH_TASK, BatchFetchPayload, BatchFetchTask, FETCH_CONTENT_TASK, FetchContentPayload,
    FetchContentTask,
};
use crate::catalog::{ContentId, TitleHeuristic};
use crate::global::config::ImportConfig;
use crate::global::database::DatabaseInstance;
use crate::global::error::AppError;
use crate::global::module::{ModuleMessage, ParentModule};
use crate::global::queue::{QueueWorker, Task, TaskData, TaskFactory, TaskQueue};

const QUEUE_BUFFER: usize = 1000;

/// Rebuilds fetch tasks left in the queue collection by a previous run.
pub struct CatalogTaskFactory {
    provider: Arc<dyn MetadataProvider>,
    heuristic: Arc<dyn TitleHeuristic>,
    import: ImportConfig,
}

impl CatalogTaskFactory {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        heuristic: Arc<dyn TitleHeuristic>,
        import: ImportConfig,
    ) -> Self {
        Self { provider, heuristic, import }
    }
}

impl TaskFactory for CatalogTaskFactory {
    fn rebuild(&self, data: &TaskData) -> Option<Box<dyn Task>> {
        match data.name.as_str() {
            FETCH_CONTENT_TASK => {
                let payload: FetchContentPayload = serde_json::from_value(data.payload.clone()).ok()?;
                let task = FetchContentTask::new(payload.content_id, self.provider.clone(), self.heuristic.clone())
                    .restored(data);
                Some(Box::new(task))
            }
            BATCH_FETCH_TASK => {
                let payload: BatchFetchPayload = serde_json::from_value(data.payload.clone()).ok()?;
                let mut task = BatchFetchTask::new(
                    payload.content_ids,
                    self.provider.clone(),
                    self.heuristic.clone(),
                    self.import.clone(),
                )
                .restored(data);
                if payload.refresh {
                    task = task.with_refresh();
                }
                Some(Box::new(task))
            }
            _ => None,
        }
    }
}

/// Owns the fetch queue and its worker.
pub struct CatalogModule {
    queue: TaskQueue,
    provider: Arc<dyn MetadataProvider>,
    heuristic: Arc<dyn TitleHeuristic>,
    import: ImportConfig,
}

impl CatalogModule {
    pub fn new(
        db: Arc<DatabaseInstance>,
        provider: Arc<dyn MetadataProvider>,
        heuristic: Arc<dyn TitleHeuristic>,
        import: ImportConfig,
    ) -> Self {
        let (queue, rx) = TaskQueue::new("catalog_queue".to_string(), QUEUE_BUFFER);

        let factory = CatalogTaskFactory::new(provider.clone(), heuristic.clone(), import.clone());
        let worker = QueueWorker::new("catalog_worker".to_string(), db).with_factory(Arc::new(factory));
        tokio::spawn(async move {
            if let Err(e) = worker.run(rx).await {
                tracing::error!(error = %e, "Queue worker error");
            }
        });

        Self {
            queue,
            provider,
            heuristic,
            import,
        }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn provider(&self) -> &Arc<dyn MetadataProvider> {
        &self.provider
    }

    pub fn heuristic(&self) -> &Arc<dyn TitleHeuristic> {
        &self.heuristic
    }

    /// Queue a single fetch; returns the task id.
    pub async fn queue_fetch(&self, content_id: ContentId) -> Result<String, AppError> {
        let task = FetchContentTask::new(content_id, self.provider.clone(), self.heuristic.clone());
        let task_id = task.id();

        info!(
            module = %self.name(),
            content_id = %task.content_id(),
            "Queueing fetch content task"
        );

        self.queue.enqueue(Box::new(task)).await?;
        Ok(task_id)
    }

    pub async fn queue_batch(&self, content_ids: Vec<ContentId>, refresh: bool) -> Result<String, AppError> {
        let count = content_ids.len();
        let mut task = BatchFetchTask::new(
            content_ids,
            self.provider.clone(),
            self.heuristic.clone(),
            self.import.clone(),
        );
        if refresh {
            task = task.with_refresh();
        }
        let task_id = task.id();

        info!(
            module = %self.name(),
            count = count,
            refresh = refresh,
            "Queueing batch fetch task"
        );

        self.queue.enqueue(Box::new(task)).await?;
        Ok(task_id)
    }
}

impl ParentModule for CatalogModule {
    fn name(&self) -> &str {
        "catalog"
    }

    fn run(
        &self,
        _db: Arc<DatabaseInstance>,
        mut rx: mpsc::Receiver<ModuleMessage>,
    ) -> Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + '_>> {
        Box::pin(async move {
            info!(module = %self.name(), provider = %self.provider.name(), "Module started");

            loop {
                match rx.recv().await {
                    Some(ModuleMessage::Shutdown) => {
                        info!(module = %self.name(), "Received shutdown signal");
                        if let Err(e) = self.queue.shutdown().await {
                            warn!(module = %self.name(), error = %e, "Failed to shutdown queue");
                        }
                        break;
                    }
                    Some(ModuleMessage::Custom(data)) => {
                        debug!(module = %self.name(), message = %data, "Received custom message");
                    }
                    None => {
                        warn!(module = %self.name(), "Channel closed unexpectedly");
                        break;
                    }
                }
            }

            info!(module = %self.name(), "Module stopped");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::KeywordHeuristic;
    use crate::content::provider::tests::FakeProvider;
    use crate::global::queue::{TaskPriority, TaskStatus};

    fn factory() -> CatalogTaskFactory {
        CatalogTaskFactory::new(
            Arc::new(FakeProvider::new(vec![])),
            Arc::new(KeywordHeuristic::default()),
            ImportConfig::default(),
        )
    }

    fn data(name: &str, payload: serde_json::Value) -> TaskData {
        TaskData {
            id: "persisted-1".into(),
            name: name.into(),
            priority: TaskPriority::Normal,
            status: TaskStatus::Running,
            created_at: chrono::Utc::now(),
            payload,
        }
    }

    #[test]
    fn rebuilds_known_tasks_with_their_original_id() {
        let factory = factory();

        let fetch = factory
            .rebuild(&data(FETCH_CONTENT_TASK, serde_json::json!({ "content_id": "tt0068646" })))
            .unwrap();
        assert_eq!(fetch.id(), "persisted-1");
        assert_eq!(fetch.name(), FETCH_CONTENT_TASK);

        let batch = factory
            .rebuild(&data(
                BATCH_FETCH_TASK,
                serde_json::json!({ "content_ids": ["1396"], "refresh": true }),
            ))
            .unwrap();
        assert_eq!(batch.priority(), TaskPriority::Low);
        assert_eq!(batch.to_data().payload["refresh"], true);
    }

    #[test]
    fn unknown_or_corrupt_tasks_are_skipped() {
        let factory = factory();
        assert!(factory.rebuild(&data("fetch_anime", serde_json::json!({}))).is_none());
        assert!(
            factory
                .rebuild(&data(FETCH_CONTENT_TASK, serde_json::json!({ "content_id": "tt12" })))
                .is_none()
        );
    }
}
