
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::documents::Corpus;

/// A window of the corpus ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk in the processing run, also its index row
    pub position: usize,
    /// The chunk text
    pub text: String,
    /// Offset of the first character within the corpus, in characters
    pub start: usize,
    /// Indices into the corpus spans this chunk overlaps
    pub sources: Vec<usize>,
}

/// Configuration for fixed-width chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window width in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive windows
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }

        if self.overlap == 0 || self.overlap >= self.chunk_size {
            return Err(ConfigError::InvalidOverlap {
                overlap: self.overlap,
                chunk_size: self.chunk_size,
            });
        }

        Ok(())
    }

    /// Distance between the starts of consecutive windows
    #[inline]
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Split text into fixed-size overlapping windows.
///
/// Sizes count characters, not bytes. Every window starts `chunk_size - overlap`
/// characters after the previous one; the last window may be shorter.
#[inline]
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ConfigError> {
    let config = ChunkingConfig {
        chunk_size,
        overlap,
    };
    config.validate()?;

    let chars = text.chars().collect::<Vec<_>>();
    let chunks = window_ranges(chars.len(), &config)
        .map(|range| chars[range].iter().collect::<String>())
        .collect::<Vec<_>>();

    debug!(
        "Chunked {} characters into {} chunks (size {}, overlap {})",
        chars.len(),
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}

/// Chunk a corpus, tagging each window with the documents it came from
#[inline]
pub fn chunk_corpus(corpus: &Corpus, config: &ChunkingConfig) -> Result<Vec<Chunk>, ConfigError> {
    config.validate()?;

    let chars = corpus.text().chars().collect::<Vec<_>>();
    let chunks = window_ranges(chars.len(), config)
        .enumerate()
        .map(|(position, range)| Chunk {
            position,
            sources: corpus.documents_in(range.clone()),
            start: range.start,
            text: chars[range].iter().collect(),
        })
        .collect::<Vec<_>>();

    debug!(
        "Chunked corpus of {} documents ({} characters) into {} chunks",
        corpus.spans().len(),
        chars.len(),
        chunks.len()
    );

    Ok(chunks)
}

fn window_ranges(total: usize, config: &ChunkingConfig) -> impl Iterator<Item = Range<usize>> {
    let chunk_size = config.chunk_size;
    (0..total)
        .step_by(config.stride())
        .map(move |start| start..(start + chunk_size).min(total))
}
