// Embeddings module
// Chunking policy and the boundary to the sentence-embedding model

pub mod chunking;

use thiserror::Error;

pub use chunking::{Chunk, ChunkingConfig, chunk_corpus, chunk_text};

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    RequestFailed(String),
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
    #[error("expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Maps text to fixed-dimension vectors.
///
/// Implementations must preserve input order and return one vector per input.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single query string
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(&[text.to_string()])?;
        match vectors.len() {
            1 => Ok(vectors.swap_remove(0)),
            actual => Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual,
            }),
        }
    }
}
