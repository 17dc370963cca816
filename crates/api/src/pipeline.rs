use std::path::PathBuf;
use std::sync::Arc;

use extract::{ChunkFailure, ExtractionEngine, ProgressSink, repair_references};
use index::{GraphStore, persist_graph};
use ingest::{Chunker, IngestError};
use serde::Serialize;
use tracing::{error, info, warn};
use validate::{ValidationGate, ValidationReport};

use crate::metrics::{Metrics, PipelineSample, TimedOperation};

/// Progress checkpoints, in percent
pub const PROGRESS_STARTED: f64 = 1.0;
pub const PROGRESS_CHUNKED: f64 = 10.0;
pub const PROGRESS_EXTRACTED: f64 = 90.0;
pub const PROGRESS_VALIDATED: f64 = 95.0;
pub const PROGRESS_DONE: f64 = 100.0;

/// Receives pipeline progress in percent.
pub trait PipelineProgress: Send + Sync {
    fn report(&self, percent: f64);
}

impl<F> PipelineProgress for F
where
    F: Fn(f64) + Send + Sync,
{
    fn report(&self, percent: f64) {
        self(percent)
    }
}

/// Ignores progress; used by the synchronous ingest path.
pub struct NoProgress;

impl PipelineProgress for NoProgress {
    fn report(&self, _percent: f64) {}
}

/// Map chunk attempts onto the extraction band between the chunked and
/// extracted checkpoints.
pub fn extraction_progress(attempted: usize, total: usize) -> f64 {
    if total == 0 {
        return PROGRESS_EXTRACTED;
    }
    let span = PROGRESS_EXTRACTED - PROGRESS_CHUNKED;
    PROGRESS_CHUNKED + span * attempted as f64 / total as f64
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub filename: String,
    pub chunks_total: usize,
    pub entities: Vec<extract::Entity>,
    pub relations: Vec<extract::Relation>,
    pub validation: ValidationReport,
    pub failed_chunks: Vec<ChunkFailure>,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
}

/// Upload → chunks → per-chunk extraction → merge → repair → validate → persist.
pub struct Pipeline {
    chunker: Chunker,
    engine: ExtractionEngine,
    gate: ValidationGate,
    store: Arc<dyn GraphStore>,
    staging_dir: PathBuf,
    metrics: Arc<Metrics>,
}

impl Pipeline {
    pub fn new(
        chunker: Chunker,
        engine: ExtractionEngine,
        gate: ValidationGate,
        store: Arc<dyn GraphStore>,
        staging_dir: PathBuf,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            chunker,
            engine,
            gate,
            store,
            staging_dir,
            metrics,
        }
    }

    pub fn store(&self) -> Arc<dyn GraphStore> {
        Arc::clone(&self.store)
    }

    /// Run one document through every stage. Only ingestion errors abort the
    /// run: failed chunks are skipped, validation is advisory and a failed
    /// write is reported in the outcome.
    pub async fn run(
        &self,
        filename: &str,
        bytes: &[u8],
        progress: &dyn PipelineProgress,
    ) -> Result<IngestOutcome, IngestError> {
        let timer = TimedOperation::start();

        let chunks = ingest::ingest_upload(&self.staging_dir, filename, bytes, &self.chunker).await?;
        progress.report(PROGRESS_CHUNKED);

        let sink = |attempted: usize, total: usize| {
            progress.report(extraction_progress(attempted, total));
        };
        let document = self
            .engine
            .extract_document(&chunks, Some(&sink as &dyn ProgressSink))
            .await;

        let mut graph = document.merged();
        let repaired = repair_references(&mut graph);
        if !repaired.is_empty() {
            info!(filename, placeholders = ?repaired, "Added placeholder entities for dangling relations");
        }
        progress.report(PROGRESS_EXTRACTED);

        let validation = self.gate.validate(&graph);
        if !validation.conforms {
            warn!(
                filename,
                violations = validation.violations.len(),
                report = %validation,
                "Extracted graph does not conform to shapes"
            );
        }
        progress.report(PROGRESS_VALIDATED);

        let (persisted, persistence_error) = match persist_graph(self.store.as_ref(), &graph).await {
            Ok(_) => (true, None),
            Err(e) => {
                error!(filename, backend = self.store.backend(), error = %format!("{:#}", e), "Failed to persist graph");
                (false, Some(format!("{:#}", e)))
            }
        };

        self.metrics.record_pipeline(PipelineSample {
            duration: timer.elapsed(),
            chunks: document.chunks_total,
            failed_chunks: document.failures.len(),
            entities: graph.entities.len(),
            relations: graph.relations.len(),
            conforms: validation.conforms,
            persisted,
        });

        info!(
            filename,
            chunks = document.chunks_total,
            failed_chunks = document.failures.len(),
            entities = graph.entities.len(),
            relations = graph.relations.len(),
            conforms = validation.conforms,
            persisted,
            duration_ms = timer.elapsed().as_millis() as u64,
            "Document processed"
        );

        Ok(IngestOutcome {
            filename: filename.to_string(),
            chunks_total: document.chunks_total,
            entities: graph.entities,
            relations: graph.relations,
            validation,
            failed_chunks: document.failures,
            persisted,
            persistence_error,
        })
    }
}
