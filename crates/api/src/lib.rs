//! HTTP surface for the knowledge-graph pipeline.

pub mod config;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod pipeline;
pub mod retry;
pub mod routes;

pub use config::AppConfig;
pub use error::ApiError;
pub use jobs::{Job, JobManager, JobRegistry, JobStatus};
pub use metrics::Metrics;
pub use pipeline::{IngestOutcome, Pipeline};
pub use retry::RetryPolicy;
pub use routes::{AppState, router};

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use extract::{ChunkExtractor, ExtractionEngine, ExtractionError, ExtractionResult};
    use index::{GraphStats, GraphStore, Neighbor, QueryRow};
    use ingest::{Chunker, ChunkerConfig};
    use query::{GraphChat, TextGenerator};
    use serde_json::{Map, Value};
    use tokio::sync::Semaphore;
    use validate::ValidationGate;

    use crate::jobs::JobManager;
    use crate::metrics::Metrics;
    use crate::pipeline::Pipeline;
    use crate::routes::AppState;

    /// Replays canned replies in order, then returns empty graphs.
    pub struct ScriptedExtractor {
        replies: Mutex<VecDeque<Result<&'static str, &'static str>>>,
        panics: bool,
    }

    impl ScriptedExtractor {
        pub fn new(replies: Vec<Result<&'static str, &'static str>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                panics: false,
            }
        }

        pub fn panicking() -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                panics: true,
            }
        }
    }

    #[async_trait]
    impl ChunkExtractor for ScriptedExtractor {
        async fn extract(&self, _text: &str) -> Result<ExtractionResult, ExtractionError> {
            if self.panics {
                panic!("extractor exploded");
            }
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Ok(json)) => ExtractionResult::parse(json),
                Some(Err(message)) => Err(ExtractionError::InvalidResponse(message.to_string())),
                None => Ok(ExtractionResult::default()),
            }
        }
    }

    /// Blocks every extraction until the test adds permits to `gate`.
    pub struct GatedExtractor {
        gate: Arc<Semaphore>,
    }

    impl GatedExtractor {
        pub fn new(gate: Arc<Semaphore>) -> Self {
            Self { gate }
        }
    }

    #[async_trait]
    impl ChunkExtractor for GatedExtractor {
        async fn extract(&self, _text: &str) -> Result<ExtractionResult, ExtractionError> {
            let _permit = self.gate.acquire().await;
            Ok(ExtractionResult::default())
        }
    }

    /// Every call fails as if the database were down.
    pub struct FailingStore;

    #[async_trait]
    impl GraphStore for FailingStore {
        fn backend(&self) -> &'static str {
            "failing"
        }

        async fn init_schema(&self) -> Result<()> {
            bail!("database unavailable")
        }

        async fn ping(&self) -> Result<()> {
            bail!("database unavailable")
        }

        async fn upsert_entity(&self, _: &str, _: &str, _: Option<&str>) -> Result<()> {
            bail!("database unavailable")
        }

        async fn upsert_relation(&self, _: &str, _: &str, _: &str, _: Option<&str>) -> Result<()> {
            bail!("database unavailable")
        }

        async fn query(&self, _: &str, _: Map<String, Value>) -> Result<Vec<QueryRow>> {
            bail!("database unavailable")
        }

        async fn export_graph(&self) -> Result<ExtractionResult> {
            bail!("database unavailable")
        }

        async fn clear(&self) -> Result<()> {
            bail!("database unavailable")
        }

        async fn neighborhood(&self, _: &str, _: usize) -> Result<Vec<Neighbor>> {
            bail!("database unavailable")
        }

        async fn stats(&self) -> Result<GraphStats> {
            bail!("database unavailable")
        }
    }

    pub struct CannedAnswer(pub &'static str);

    #[async_trait]
    impl TextGenerator for CannedAnswer {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    pub fn pipeline_with(
        extractor: Arc<dyn ChunkExtractor>,
        store: Arc<dyn GraphStore>,
        staging: &Path,
        metrics: Arc<Metrics>,
    ) -> Pipeline {
        Pipeline::new(
            Chunker::new(ChunkerConfig::default()).unwrap(),
            ExtractionEngine::new(extractor),
            ValidationGate::new(Default::default()).unwrap(),
            store,
            staging.to_path_buf(),
            metrics,
        )
    }

    pub fn test_pipeline(
        extractor: ScriptedExtractor,
        store: Arc<dyn GraphStore>,
        staging: &Path,
    ) -> Pipeline {
        pipeline_with(Arc::new(extractor), store, staging, Metrics::new())
    }

    pub fn test_state(
        extractor: ScriptedExtractor,
        store: Arc<dyn GraphStore>,
        staging: &Path,
    ) -> Arc<AppState> {
        let extractor: Arc<dyn ChunkExtractor> = Arc::new(extractor);
        let metrics = Metrics::new();
        let pipeline = pipeline_with(Arc::clone(&extractor), Arc::clone(&store), staging, metrics.clone());

        Arc::new(AppState {
            jobs: JobManager::new(Arc::new(pipeline), 2, metrics.clone()),
            chat: GraphChat::new(
                extractor,
                Arc::clone(&store),
                Arc::new(CannedAnswer("Elon Musk is the CEO of SpaceX.")),
            ),
            store,
            metrics,
        })
    }
}
