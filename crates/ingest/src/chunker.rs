use crate::chunk::Chunk;
use crate::error::IngestError;

/// Sliding-window sizes, both measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            overlap: 200,
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunking {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    /// Split text into fixed windows of `chunk_size` characters where each
    /// window starts `chunk_size - overlap` characters after the previous one.
    /// The last window may be shorter. Text no longer than one window yields
    /// exactly one chunk.
    pub fn chunk_text(&self, doc_id: &str, text: &str, source: &str) -> Vec<Chunk> {
        let step = self.config.chunk_size - self.config.overlap;

        let mut chunks = Vec::new();
        let mut start_byte = 0;
        let mut start_char = 0;

        loop {
            let rest = &text[start_byte..];
            let (window_bytes, window_chars) = advance(rest, self.config.chunk_size);
            let end_byte = start_byte + window_bytes;

            chunks.push(Chunk::new(
                doc_id.to_string(),
                chunks.len(),
                text[start_byte..end_byte].to_string(),
                source.to_string(),
                (start_char, start_char + window_chars),
            ));

            if end_byte == text.len() {
                break;
            }

            // A full window was taken, so `rest` holds at least `step` chars
            let (step_bytes, step_chars) = advance(rest, step);
            start_byte += step_bytes;
            start_char += step_chars;
        }

        chunks
    }
}

/// Byte length and char count of the first `n` chars of `s`, or of all of
/// `s` when it is shorter.
fn advance(s: &str, n: usize) -> (usize, usize) {
    match s.char_indices().nth(n) {
        Some((byte, _)) => (byte, n),
        None => (s.len(), s.chars().count()),
    }
}
