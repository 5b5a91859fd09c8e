use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use media_catalog::api::{server::start_api_server, state::ApiState};
use media_catalog::catalog::{KeywordHeuristic, TitleHeuristic};
use media_catalog::content::{
    CachedProvider, CatalogModule, MetadataCache, MetadataProvider, TmdbProvider, database as content_db,
};
use media_catalog::global::{
    config::AppConfig,
    database::DatabaseInstance,
    http::HttpClientManager,
    logging,
    module::{ModuleHandle, ParentModule},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first
    let config = match AppConfig::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            eprintln!("Please ensure config.toml exists in the working directory (see config.example.toml)");
            return Err(e.into());
        }
    };

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = logging::init(&config.app)?;

    info!("Starting media-catalog...");
    debug!(?config, "Loaded configuration");

    // Initialize database
    let db = DatabaseInstance::new(&config.database.host, config.database.port, &config.database.name).await?;
    let db = Arc::new(db);

    if let Err(e) = db.ping().await {
        warn!(error = %e, "MongoDB did not answer the startup ping");
    }
    content_db::initialize_collections(db.db()).await?;

    let http_manager = HttpClientManager::new(&config)?;

    let mut state = ApiState::new(config.clone(), db.clone());
    let mut module_handles = Vec::new();

    if config.can_start_tmdb() {
        let cache = Arc::new(MetadataCache::new(
            config.cache.capacity,
            Duration::from_secs(config.cache.ttl_seconds),
        ));
        let tmdb = TmdbProvider::new(http_manager.tmdb().clone(), &config.tmdb);
        let provider: Arc<dyn MetadataProvider> = Arc::new(CachedProvider::new(tmdb, cache));
        let heuristic: Arc<dyn TitleHeuristic> = Arc::new(KeywordHeuristic::default());

        info!("Initializing catalog module");
        let module = Arc::new(CatalogModule::new(db.clone(), provider, heuristic, config.import.clone()));
        module_handles.push(spawn_parent_module(module.clone(), db.clone()));
        state = state.with_catalog_module(module);
    } else {
        warn!("Metadata import is disabled; the catalog is served read-only");
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server_config = config.server.clone();
    let server = tokio::spawn(async move {
        let shutdown = async move {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = start_api_server(state, &server_config.host, server_config.port, shutdown).await {
            error!(error = %e, "API server stopped with error");
        }
    });

    // Keep running until Ctrl+C
    info!("Application running, press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, initiating graceful shutdown");

    let _ = shutdown_tx.send(());

    for handle in module_handles {
        info!(module = %handle.name, "Sending shutdown signal");
        if let Err(e) = handle.shutdown().await {
            error!(module = %handle.name, error = %e, "Failed to shutdown module");
        }
    }

    if let Err(e) = server.await {
        error!(error = %e, "API server task panicked");
    }

    // Give the queue worker time to persist the running task's state
    tokio::time::sleep(Duration::from_secs(1)).await;
    info!("Shutdown complete");

    Ok(())
}

/// Spawn a parent module that runs until it receives a shutdown message
fn spawn_parent_module<M: ParentModule + 'static>(module: Arc<M>, db: Arc<DatabaseInstance>) -> ModuleHandle {
    let (tx, rx) = mpsc::channel(100);
    let name = module.name().to_string();

    info!(module = %name, "Spawning parent module");

    tokio::spawn(async move {
        if let Err(e) = module.run(db, rx).await {
            error!(module = %module.name(), error = %e, "Module terminated with error");
        }
    });

    ModuleHandle { name, tx }
}
