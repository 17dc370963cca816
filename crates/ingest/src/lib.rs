pub mod chunk;
pub mod chunker;
pub mod error;
pub mod reader;
pub mod staging;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig};
pub use error::IngestError;
pub use reader::FileReader;
pub use staging::StagedUpload;

use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

/// Generate a stable document ID from its name and content
pub fn generate_doc_id(filename: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update(text.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

/// Stage an uploaded document, load its text and split it into chunks.
/// The staged copy is gone by the time this returns, on success or error.
pub async fn ingest_upload(
    staging_dir: &Path,
    filename: &str,
    bytes: &[u8],
    chunker: &Chunker,
) -> Result<Vec<Chunk>, IngestError> {
    let staged = StagedUpload::stage(staging_dir, filename, bytes)?;
    let content = staged.read_text().await?;
    drop(staged);

    let doc_id = generate_doc_id(filename, &content);
    let chunks = chunker.chunk_text(&doc_id, &content, filename);

    info!(
        filename,
        doc_id = %doc_id,
        chars = content.chars().count(),
        chunks = chunks.len(),
        "Document chunked"
    );

    Ok(chunks)
}
