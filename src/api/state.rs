use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::catalog::CatalogEntry;
use crate::content::{CatalogModule, ContentStore, MongoContentStore, TtlCache};
use crate::global::{config::AppConfig, database::DatabaseInstance, error::DatabaseError};

/// Cached read of the ordered catalog list.
pub type CatalogSnapshot = TtlCache<(), Arc<Vec<CatalogEntry>>>;

/// Application state shared across API handlers
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseInstance>,
    pub store: Arc<dyn ContentStore>,
    pub snapshot: Arc<CatalogSnapshot>,
    /// Held while the snapshot is reloaded, so one expiry costs one query.
    refresh: Arc<Mutex<()>>,

    pub catalog_module: Option<Arc<CatalogModule>>,
}

impl ApiState {
    pub fn new(config: Arc<AppConfig>, db: Arc<DatabaseInstance>) -> Self {
        let ttl = Duration::from_secs(config.cache.snapshot_ttl_seconds);
        Self {
            config,
            store: Arc::new(MongoContentStore::new(db.clone())),
            db,
            snapshot: Arc::new(CatalogSnapshot::new(1, ttl)),
            refresh: Arc::new(Mutex::new(())),
            catalog_module: None,
        }
    }

    /// Serve titles from another store than the `content` collection.
    pub fn with_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_catalog_module(mut self, module: Arc<CatalogModule>) -> Self {
        self.catalog_module = Some(module);
        self
    }

    /// The flat ordered source list every category and section reads from.
    ///
    /// All requests within one snapshot see the same order, so page windows
    /// stay stable between "load more" calls.
    pub async fn catalog(&self) -> Result<Arc<Vec<CatalogEntry>>, DatabaseError> {
        if let Some(entries) = self.snapshot.get(&()).await {
            return Ok(entries);
        }

        let _guard = self.refresh.lock().await;
        // Another request may have reloaded while we waited
        if let Some(entries) = self.snapshot.get(&()).await {
            return Ok(entries);
        }

        let entries = Arc::new(self.store.list_catalog().await?);
        debug!(count = entries.len(), "Catalog snapshot refreshed");
        self.snapshot.insert((), entries.clone()).await;
        Ok(entries)
    }
}
