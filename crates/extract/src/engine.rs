use std::sync::Arc;

use async_trait::async_trait;
use ingest::Chunk;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::merge::GraphMerger;
use crate::schema::{ExtractedChunk, ExtractionResult};

/// One structured-extraction call: text in, schema-conforming graph out.
#[async_trait]
pub trait ChunkExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<ExtractionResult, ExtractionError>;
}

/// Receives `(chunks_attempted, chunks_total)` after every chunk attempt,
/// whether the attempt succeeded or not.
pub trait ProgressSink: Send + Sync {
    fn chunk_attempted(&self, attempted: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn chunk_attempted(&self, attempted: usize, total: usize) {
        self(attempted, total)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkFailure {
    pub chunk_index: usize,
    pub chunk_id: String,
    pub error: String,
}

/// Everything gathered from one document, including the chunks that failed.
#[derive(Debug, Clone, Default)]
pub struct DocumentExtraction {
    pub chunks: Vec<ExtractedChunk>,
    pub failures: Vec<ChunkFailure>,
    pub chunks_total: usize,
}

impl DocumentExtraction {
    /// Merge the successful chunks in processing order.
    pub fn merged(&self) -> ExtractionResult {
        let mut merger = GraphMerger::new();
        for chunk in &self.chunks {
            merger.absorb(chunk.extraction.clone());
        }
        if merger.duplicates_dropped() > 0 {
            debug!(duplicates = merger.duplicates_dropped(), "Dropped duplicate entities/relations");
        }
        merger.finish()
    }
}

#[derive(Clone)]
pub struct ExtractionEngine {
    extractor: Arc<dyn ChunkExtractor>,
}

impl ExtractionEngine {
    pub fn new(extractor: Arc<dyn ChunkExtractor>) -> Self {
        Self { extractor }
    }

    pub async fn extract_chunk(&self, chunk: &Chunk) -> Result<ExtractedChunk, ExtractionError> {
        let extraction = self.extractor.extract(&chunk.text).await?;

        Ok(ExtractedChunk {
            chunk_index: chunk.index,
            chunk_id: chunk.chunk_id.clone(),
            doc_id: chunk.doc_id.clone(),
            extraction,
        })
    }

    /// Extract every chunk, one after another. A failing chunk is logged and
    /// skipped; the document as a whole never fails here.
    pub async fn extract_document(
        &self,
        chunks: &[Chunk],
        progress: Option<&dyn ProgressSink>,
    ) -> DocumentExtraction {
        let total = chunks.len();
        let mut document = DocumentExtraction {
            chunks_total: total,
            ..Default::default()
        };

        for (attempted, chunk) in chunks.iter().enumerate() {
            match self.extract_chunk(chunk).await {
                Ok(extracted) => {
                    debug!(
                        chunk = chunk.index,
                        entities = extracted.extraction.entities.len(),
                        relations = extracted.extraction.relations.len(),
                        "Chunk extracted"
                    );
                    document.chunks.push(extracted);
                }
                Err(e) => {
                    warn!(chunk = chunk.index, chunk_id = %chunk.chunk_id, error = %e, "Chunk extraction failed, skipping");
                    document.failures.push(ChunkFailure {
                        chunk_index: chunk.index,
                        chunk_id: chunk.chunk_id.clone(),
                        error: e.to_string(),
                    });
                }
            }

            if let Some(sink) = progress {
                sink.chunk_attempted(attempted + 1, total);
            }
        }

        info!(
            chunks = total,
            failed = document.failures.len(),
            "Extraction finished"
        );

        document
    }
}
