use std::sync::Arc;

use anyhow::{Context, Result};
use api::config::{AppConfig, LogFormat};
use api::{AppState, JobManager, Metrics, Pipeline, RetryPolicy, router};
use extract::{ChunkExtractor, ExtractionEngine, Extractor, OllamaClient};
use index::{GraphStore, MemoryGraphStore, Neo4jStore};
use ingest::Chunker;
use query::{GraphChat, QueryLLM};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use validate::ValidationGate;

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Neo4j when enabled and reachable, otherwise the in-process store.
async fn connect_store(config: &AppConfig) -> Arc<dyn GraphStore> {
    if !config.neo4j.enabled {
        info!("Neo4j disabled, using in-memory graph store");
        return Arc::new(MemoryGraphStore::new());
    }

    let policy = RetryPolicy::from_config(&config.retry);
    let neo4j = &config.neo4j;

    let connected = policy
        .retry("neo4j_connect", || async move {
            let store = Neo4jStore::connect(&neo4j.uri, &neo4j.user, &neo4j.password).await?;
            store.init_schema().await?;
            anyhow::Ok(store)
        })
        .await;

    match connected {
        Ok(store) => {
            info!(uri = %neo4j.uri, "Connected to Neo4j");
            Arc::new(store)
        }
        Err(e) => {
            warn!(uri = %neo4j.uri, error = %format!("{:#}", e), "Neo4j unavailable, falling back to in-memory graph store");
            Arc::new(MemoryGraphStore::new())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    let metrics = Metrics::new();
    let store = connect_store(&config).await;

    let gate = ValidationGate::from_path(config.validation.shapes_path.as_deref())
        .context("Failed to load validation shapes")?;
    info!(rules = gate.shapes().rule_count(), "Validation shapes loaded");

    let extractor: Arc<dyn ChunkExtractor> = Arc::new(Extractor::new(
        OllamaClient::new(config.llm.base_url.clone(), config.llm.extraction_model.clone()),
        config.llm.max_json_retries,
    ));

    let pipeline = Pipeline::new(
        Chunker::new(config.chunker_config())?,
        ExtractionEngine::new(Arc::clone(&extractor)),
        gate,
        Arc::clone(&store),
        config.staging.dir.clone(),
        metrics.clone(),
    );

    let chat = GraphChat::new(
        extractor,
        Arc::clone(&store),
        Arc::new(QueryLLM::new(config.llm.base_url.clone(), config.llm.chat_model.clone())),
    );

    let state = Arc::new(AppState {
        jobs: JobManager::new(Arc::new(pipeline), config.concurrency.max_concurrent_jobs, metrics.clone()),
        store,
        chat,
        metrics,
    });

    let app = router(state, config.server.max_upload_mb * 1024 * 1024);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, model = %config.llm.extraction_model, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
