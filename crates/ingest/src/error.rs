use thiserror::Error;

/// Errors raised while turning an uploaded document into chunks.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document is not valid UTF-8 text: {0}")]
    Decode(String),

    #[error("Document contains no text: {0}")]
    Empty(String),

    #[error("Invalid chunking configuration: overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    #[error("Failed to stage upload: {0}")]
    Staging(String),
}
