use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc};

use futures::stream::StreamExt;
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{database::DatabaseInstance, error::AppError};

const TASK_COLLECTION: &str = "task_queue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskPriority {
    Low = 0,
    Normal = 1,
    High = 2,
    Critical = 3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed { error: String },
}

/// Serializable task data for persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskData {
    pub id: String,
    pub name: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub payload: serde_json::Value,
}

#[async_trait::async_trait]
pub trait Task: Send + Sync {
    fn id(&self) -> String;
    fn name(&self) -> &str;
    fn priority(&self) -> TaskPriority;

    fn to_data(&self) -> TaskData;

    async fn execute(&self, db: Arc<DatabaseInstance>) -> Result<(), AppError>;
}

/// Rebuilds persisted tasks after a restart.
pub trait TaskFactory: Send + Sync {
    fn rebuild(&self, data: &TaskData) -> Option<Box<dyn Task>>;
}

struct PriorityTask {
    task: Box<dyn Task>,
    priority: TaskPriority,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl PartialEq for PriorityTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.created_at == other.created_at
    }
}

impl Eq for PriorityTask {}

impl PartialOrd for PriorityTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first, then older tasks first
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => other.created_at.cmp(&self.created_at),
            other => other,
        }
    }
}

impl PriorityTask {
    fn new(task: Box<dyn Task>) -> Self {
        let priority = task.priority();
        let created_at = task.to_data().created_at;
        Self { task, priority, created_at }
    }
}

pub enum QueueMessage {
    AddTask(Box<dyn Task>),
    Shutdown,
}

/// Sending side of a task queue
pub struct TaskQueue {
    name: String,
    tx: mpsc::Sender<QueueMessage>,
}

impl TaskQueue {
    /// Returns the queue and the receiver its worker should consume.
    pub fn new(name: String, buffer_size: usize) -> (Self, mpsc::Receiver<QueueMessage>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        (Self { name, tx }, rx)
    }

    pub async fn enqueue(&self, task: Box<dyn Task>) -> Result<(), AppError> {
        info!(
            queue = %self.name,
            task_id = %task.id(),
            task_name = %task.name(),
            priority = ?task.priority(),
            "Enqueueing task"
        );

        self.tx
            .send(QueueMessage::AddTask(task))
            .await
            .map_err(|e| AppError::Module(format!("Failed to enqueue task: {}", e)))
    }

    pub async fn shutdown(&self) -> Result<(), AppError> {
        info!(queue = %self.name, "Sending shutdown signal to queue");

        self.tx
            .send(QueueMessage::Shutdown)
            .await
            .map_err(|e| AppError::Module(format!("Failed to shutdown queue: {}", e)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Clone for TaskQueue {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            tx: self.tx.clone(),
        }
    }
}

/// Executes queued tasks one at a time, highest priority first
pub struct QueueWorker {
    name: String,
    db: Arc<DatabaseInstance>,
    factory: Option<Arc<dyn TaskFactory>>,
}

impl QueueWorker {
    pub fn new(name: String, db: Arc<DatabaseInstance>) -> Self {
        Self { name, db, factory: None }
    }

    pub fn with_factory(mut self, factory: Arc<dyn TaskFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub async fn run(self, mut rx: mpsc::Receiver<QueueMessage>) -> Result<(), AppError> {
        info!(worker = %self.name, "Task queue worker started");

        let mut tasks_processed = 0u64;
        let mut priority_queue = BinaryHeap::new();

        if let Err(e) = self.load_persisted_tasks(&mut priority_queue).await {
            warn!(worker = %self.name, error = %e, "Failed to load persisted tasks");
        }

        'outer: loop {
            if priority_queue.is_empty() {
                match rx.recv().await {
                    Some(QueueMessage::AddTask(task)) => self.accept(task, &mut priority_queue).await,
                    Some(QueueMessage::Shutdown) => {
                        info!(worker = %self.name, tasks_processed = tasks_processed, "Shutdown signal received");
                        break;
                    }
                    None => {
                        warn!(worker = %self.name, "Channel closed");
                        break;
                    }
                }
            }

            // Pull in everything already waiting so priorities are honoured.
            loop {
                match rx.try_recv() {
                    Ok(QueueMessage::AddTask(task)) => self.accept(task, &mut priority_queue).await,
                    Ok(QueueMessage::Shutdown) => {
                        info!(worker = %self.name, pending = priority_queue.len(), "Shutdown during processing");
                        break 'outer;
                    }
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        if priority_queue.is_empty() {
                            break 'outer;
                        }
                        break;
                    }
                }
            }

            let Some(priority_task) = priority_queue.pop() else {
                continue;
            };

            let task_id = priority_task.task.id();
            let priority = priority_task.priority;

            debug!(
                worker = %self.name,
                task_id = %task_id,
                task_name = %priority_task.task.name(),
                priority = ?priority,
                queue_size = priority_queue.len(),
                "Processing task"
            );

            self.persist_or_warn(&*priority_task.task, TaskStatus::Running).await;

            match priority_task.task.execute(self.db.clone()).await {
                Ok(_) => {
                    tasks_processed += 1;
                    info!(
                        worker = %self.name,
                        task_id = %task_id,
                        priority = ?priority,
                        tasks_processed = tasks_processed,
                        "Task completed"
                    );
                    self.persist_or_warn(&*priority_task.task, TaskStatus::Completed).await;
                }
                Err(e) => {
                    error!(
                        worker = %self.name,
                        task_id = %task_id,
                        priority = ?priority,
                        error = %e,
                        "Task failed"
                    );
                    let status = TaskStatus::Failed { error: e.to_string() };
                    self.persist_or_warn(&*priority_task.task, status).await;
                }
            }
        }

        info!(
            worker = %self.name,
            tasks_processed = tasks_processed,
            "Task queue worker stopped"
        );

        Ok(())
    }

    async fn accept(&self, task: Box<dyn Task>, queue: &mut BinaryHeap<PriorityTask>) {
        self.persist_or_warn(&*task, TaskStatus::Pending).await;
        queue.push(PriorityTask::new(task));
    }

    async fn persist_or_warn(&self, task: &dyn Task, status: TaskStatus) {
        if let Err(e) = persist_task_status(&self.db, task, status).await {
            warn!(worker = %self.name, task_id = %task.id(), error = %e, "Failed to persist task status");
        }
    }

    async fn load_persisted_tasks(&self, queue: &mut BinaryHeap<PriorityTask>) -> Result<(), AppError> {
        let Some(factory) = &self.factory else {
            return Ok(());
        };

        let collection = self.db.db().collection::<TaskData>(TASK_COLLECTION);

        // Running tasks were interrupted by the last shutdown.
        let filter = doc! { "status": { "$in": ["Pending", "Running"] } };
        let mut cursor = collection
            .find(filter)
            .await
            .map_err(|e| AppError::Module(format!("Failed to load tasks: {}", e)))?;

        let mut loaded_count = 0;

        while let Some(result) = cursor.next().await {
            match result {
                Ok(task_data) => match factory.rebuild(&task_data) {
                    Some(task) => {
                        debug!(
                            worker = %self.name,
                            task_id = %task_data.id,
                            task_name = %task_data.name,
                            "Restored persisted task"
                        );
                        queue.push(PriorityTask::new(task));
                        loaded_count += 1;
                    }
                    None => {
                        warn!(worker = %self.name, task_name = %task_data.name, "No factory for persisted task");
                    }
                },
                Err(e) => {
                    warn!(worker = %self.name, error = %e, "Failed to deserialize task");
                }
            }
        }

        if loaded_count > 0 {
            info!(worker = %self.name, count = loaded_count, "Loaded persisted tasks");
        }

        Ok(())
    }
}

async fn persist_task_status(
    db: &DatabaseInstance,
    task: &dyn Task,
    status: TaskStatus,
) -> Result<(), AppError> {
    let mut task_data = task.to_data();
    task_data.status = status;

    let collection = db.db().collection::<TaskData>(TASK_COLLECTION);
    let filter = doc! { "id": &task_data.id };
    let options = mongodb::options::ReplaceOptions::builder().upsert(true).build();

    collection
        .replace_one(filter, task_data)
        .with_options(options)
        .await
        .map_err(|e| AppError::Module(format!("Failed to persist task: {}", e)))?;

    Ok(())
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskStats {
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Count persisted tasks by status.
pub async fn task_stats(db: &DatabaseInstance) -> Result<TaskStats, AppError> {
    let collection = db.db().collection::<TaskData>(TASK_COLLECTION);
    let count = |filter| {
        let collection = collection.clone();
        async move {
            collection
                .count_documents(filter)
                .await
                .map_err(|e| AppError::Module(format!("Failed to count tasks: {}", e)))
        }
    };

    Ok(TaskStats {
        pending: count(doc! { "status": "Pending" }).await?,
        running: count(doc! { "status": "Running" }).await?,
        completed: count(doc! { "status": "Completed" }).await?,
        failed: count(doc! { "status.Failed": { "$exists": true } }).await?,
    })
}
