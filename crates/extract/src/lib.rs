pub mod engine;
pub mod error;
pub mod llm;
pub mod merge;
pub mod prompt;
pub mod repair;
pub mod schema;

pub use engine::{ChunkExtractor, ChunkFailure, DocumentExtraction, ExtractionEngine, ProgressSink};
pub use error::ExtractionError;
pub use llm::OllamaClient;
pub use merge::{GraphMerger, merge_results};
pub use repair::{INFERRED_DESCRIPTION, UNKNOWN_ENTITY_TYPE, repair_references};
pub use schema::{Entity, ExtractedChunk, ExtractionResult, Relation};

use async_trait::async_trait;
use serde_json::Value;

/// LLM-backed extractor: prompts Ollama with a JSON schema and validates the
/// reply against the Entity/Relation schema.
pub struct Extractor {
    llm_client: OllamaClient,
    schema: Value,
    max_retries: usize,
}

impl Extractor {
    pub fn new(llm_client: OllamaClient, max_retries: usize) -> Self {
        Self {
            llm_client,
            schema: prompt::extraction_schema(),
            max_retries,
        }
    }

    /// Extract entities and relations from a chunk of text
    pub async fn extract_from_text(&self, text: &str) -> Result<ExtractionResult, ExtractionError> {
        // Build prompt
        let prompt = prompt::build_extraction_prompt(text);

        // Get JSON response with retry
        let json_str = self.llm_client
            .generate_json_with_retry(&prompt, &self.schema, self.max_retries)
            .await?;

        ExtractionResult::parse(&json_str)
    }
}

#[async_trait]
impl ChunkExtractor for Extractor {
    async fn extract(&self, text: &str) -> Result<ExtractionResult, ExtractionError> {
        self.extract_from_text(text).await
    }
}
