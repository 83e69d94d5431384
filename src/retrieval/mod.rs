// Retrieval module
// The knowledge base built from one processing run and top-k chunk lookup

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;
use crate::config::ConfigError;
use crate::documents::DocumentSpan;
use crate::embeddings::{Chunk, Embedder};
use crate::index::{FlatIndex, IndexError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the generator per question
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

impl RetrievalConfig {
    #[inline]
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }
        Ok(())
    }
}

/// Chunks, their vectors, and the documents they came from.
///
/// Row `i` of the index is the embedding of `chunks[i]`. The whole value is
/// replaced when documents are processed again, never patched.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    chunks: Vec<Chunk>,
    index: FlatIndex,
    documents: Vec<DocumentSpan>,
    built_at: DateTime<Utc>,
}

impl KnowledgeBase {
    #[inline]
    pub fn new(
        chunks: Vec<Chunk>,
        index: FlatIndex,
        documents: Vec<DocumentSpan>,
    ) -> std::result::Result<Self, IndexError> {
        if chunks.len() != index.len() {
            return Err(IndexError::Misaligned {
                chunks: chunks.len(),
                vectors: index.len(),
            });
        }

        Ok(Self {
            chunks,
            index,
            documents,
            built_at: Utc::now(),
        })
    }

    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[inline]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    #[inline]
    pub fn documents(&self) -> &[DocumentSpan] {
        &self.documents
    }

    #[inline]
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    fn source_names(&self, chunk: &Chunk) -> Vec<String> {
        chunk
            .sources
            .iter()
            .filter_map(|&i| self.documents.get(i))
            .map(|span| span.name.clone())
            .collect()
    }
}

/// A chunk selected for a question
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub position: usize,
    pub text: String,
    /// Squared L2 distance between the query and chunk embeddings
    pub distance: f32,
    /// Names of the documents the chunk overlaps
    pub sources: Vec<String>,
}

/// Embed the query and return the `top_k` closest chunks, nearest first.
///
/// Fewer than `top_k` chunks come back when the knowledge base is smaller.
#[inline]
pub fn retrieve(
    query: &str,
    embedder: &dyn Embedder,
    knowledge: &KnowledgeBase,
    top_k: usize,
) -> Result<Vec<RetrievedChunk>> {
    if top_k == 0 {
        return Err(ConfigError::InvalidTopK(top_k).into());
    }

    let query_vector = embedder.embed_query(query)?;
    let neighbors = knowledge.index.search(&query_vector, top_k)?;

    let retrieved = neighbors
        .into_iter()
        .filter_map(|neighbor| {
            let chunk = knowledge.chunks.get(neighbor.position)?;
            Some(RetrievedChunk {
                position: chunk.position,
                text: chunk.text.clone(),
                distance: neighbor.distance,
                sources: knowledge.source_names(chunk),
            })
        })
        .collect::<Vec<_>>();

    debug!(
        "Retrieved {} of {} chunks for query",
        retrieved.len(),
        knowledge.chunks.len()
    );

    Ok(retrieved)
}
