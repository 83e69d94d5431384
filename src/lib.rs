use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StudyMateError>;

#[derive(Error, Debug)]
pub enum StudyMateError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Could not extract text from any of the {} documents", .failures.len())]
    DocumentExtraction {
        failures: Vec<documents::DocumentExtractionError>,
    },

    #[error("No documents were provided")]
    NoDocuments,

    #[error("No extractable text found in the provided documents")]
    NoContent {
        /// Files skipped before the corpus turned out blank
        failures: Vec<documents::DocumentExtractionError>,
    },

    #[error("Corpus produced {chunks} chunks, exceeding the limit of {limit}")]
    CorpusTooLarge {
        chunks: usize,
        limit: usize,
        failures: Vec<documents::DocumentExtractionError>,
    },

    #[error("Please load and process documents before asking questions")]
    DocumentsNotProcessed,

    #[error("Question cannot be empty")]
    EmptyQuery,

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Embedding error: {0}")]
    Embedding(#[from] embeddings::EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Generation error: {0}")]
    Generation(#[from] generation::GenerationError),

    #[error("Generation did not finish within {0:?}")]
    GenerationTimeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StudyMateError {
    /// Files that could not be read during the processing run that produced this error
    #[inline]
    pub fn extraction_failures(&self) -> &[documents::DocumentExtractionError] {
        match self {
            Self::DocumentExtraction { failures }
            | Self::NoContent { failures }
            | Self::CorpusTooLarge { failures, .. } => failures,
            _ => &[],
        }
    }
}

pub mod commands;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod generation;
pub mod index;
pub mod ollama;
pub mod retrieval;
pub mod session;
