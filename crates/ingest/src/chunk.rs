use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_id: String,
    pub chunk_id: String,
    /// Position of this chunk within its document (0-based)
    pub index: usize,
    pub text: String,
    pub source: String,
    pub offset: (usize, usize), // [start, end) character positions
}

impl Chunk {
    pub fn new(
        doc_id: String,
        index: usize,
        text: String,
        source: String,
        offset: (usize, usize),
    ) -> Self {
        // Generate stable chunk_id from content
        let chunk_id = Self::generate_chunk_id(&doc_id, &text, offset);

        Self {
            doc_id,
            chunk_id,
            index,
            text,
            source,
            offset,
        }
    }

    fn generate_chunk_id(doc_id: &str, text: &str, offset: (usize, usize)) -> String {
        let mut hasher = Sha256::new();
        hasher.update(doc_id.as_bytes());
        hasher.update(text.as_bytes());
        hasher.update(offset.0.to_string().as_bytes());
        hasher.update(offset.1.to_string().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16]) // Use first 16 bytes (32 hex chars)
    }

    /// Length of the chunk in characters
    pub fn char_len(&self) -> usize {
        self.offset.1 - self.offset.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_stable() {
        let a = Chunk::new("doc".into(), 0, "hello".into(), "a.txt".into(), (0, 5));
        let b = Chunk::new("doc".into(), 0, "hello".into(), "a.txt".into(), (0, 5));
        let c = Chunk::new("doc".into(), 1, "hello".into(), "a.txt".into(), (5, 10));

        assert_eq!(a.chunk_id, b.chunk_id);
        assert_ne!(a.chunk_id, c.chunk_id);
        assert_eq!(a.chunk_id.len(), 32);
        assert_eq!(a.char_len(), 5);
    }
}
