use thiserror::Error;

/// Failure to turn one chunk into entities and relations. Never fatal to a
/// whole document: the engine records it and moves on to the next chunk.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM returned invalid JSON: {0}")]
    InvalidResponse(String),

    #[error("Response does not match the extraction schema: {0}")]
    Schema(String),
}

impl From<reqwest::Error> for ExtractionError {
    fn from(e: reqwest::Error) -> Self {
        ExtractionError::Request(e.to_string())
    }
}
