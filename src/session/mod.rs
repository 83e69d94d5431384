// Session module
// One user's document set and question history, driven one action at a time


use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::documents::{Corpus, DocumentExtractionError, extract_all};
use crate::embeddings::{Chunk, Embedder, EmbeddingError, chunk_corpus};
use crate::generation::{Generator, answer};
use crate::index::FlatIndex;
use crate::ollama::{OllamaClient, OllamaEmbedder, OllamaGenerator};
use crate::retrieval::{KnowledgeBase, RetrievedChunk, retrieve};
use crate::{Result, StudyMateError};

/// Where the session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No documents processed yet
    Idle,
    /// A knowledge base is ready for questions
    DocumentsProcessed,
    /// At least one question has been answered against the current knowledge base
    AnswerReady,
}

/// Summary of one `process_documents` call
#[derive(Debug)]
pub struct ProcessingReport {
    /// Display names of documents that contributed text
    pub documents: Vec<String>,
    /// Files that were skipped
    pub failures: Vec<DocumentExtractionError>,
    pub chunk_count: usize,
    pub dimension: usize,
    pub elapsed: Duration,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub question: String,
    pub text: String,
    /// Retrieved chunks in the order they appeared in the prompt
    pub sources: Vec<RetrievedChunk>,
}

pub struct Session {
    id: Uuid,
    config: Config,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    knowledge: Option<Arc<KnowledgeBase>>,
    last_answer: Option<Answer>,
}

impl std::fmt::Debug for Session {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .field("chunks", &self.knowledge.as_ref().map(|k| k.chunks().len()))
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Connect to Ollama and make sure both configured models are pulled
    #[inline]
    pub async fn start(config: Config) -> Result<Self> {
        config.validate()?;

        let ollama = config.ollama.clone();
        let models = [ollama.embedding_model.clone(), ollama.generation_model.clone()];
        tokio::task::spawn_blocking(move || {
            let client = OllamaClient::new(&ollama)?.with_retry_attempts(1);
            client.health_check(&models.iter().map(String::as_str).collect::<Vec<_>>())
        })
        .await
        .map_err(|e| StudyMateError::Other(e.into()))?
        .map_err(|e| StudyMateError::ModelUnavailable(format!("{e:#}")))?;

        let embedder = OllamaEmbedder::from_config(&config.ollama)?;
        let generator = OllamaGenerator::from_config(&config.ollama, config.generation.timeout())?;

        Ok(Self::with_providers(
            config,
            Arc::new(embedder),
            Arc::new(generator),
        ))
    }

    /// Build a session around already-constructed model providers
    #[inline]
    pub fn with_providers(
        config: Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let id = Uuid::new_v4();
        info!("Started session {}", id);

        Self {
            id,
            config,
            embedder,
            generator,
            knowledge: None,
            last_answer: None,
        }
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn phase(&self) -> SessionPhase {
        match (&self.knowledge, &self.last_answer) {
            (None, _) => SessionPhase::Idle,
            (Some(_), None) => SessionPhase::DocumentsProcessed,
            (Some(_), Some(_)) => SessionPhase::AnswerReady,
        }
    }

    #[inline]
    pub fn knowledge_base(&self) -> Option<&KnowledgeBase> {
        self.knowledge.as_deref()
    }

    #[inline]
    pub fn last_answer(&self) -> Option<&Answer> {
        self.last_answer.as_ref()
    }

    /// Extract, chunk, embed and index `paths`, replacing any previous knowledge base.
    ///
    /// Unreadable files are skipped and listed in the report. On error the
    /// previous knowledge base stays in place.
    #[inline]
    #[instrument(skip_all, fields(session = %self.id, files = paths.len()))]
    pub async fn process_documents(&mut self, paths: &[PathBuf]) -> Result<ProcessingReport> {
        if paths.is_empty() {
            return Err(StudyMateError::NoDocuments);
        }

        let started = Instant::now();
        let outcome = extract_all(paths, &self.config.limits).await;

        if outcome.documents.is_empty() && !outcome.failures.is_empty() {
            return Err(StudyMateError::DocumentExtraction {
                failures: outcome.failures,
            });
        }

        let corpus = Corpus::from_documents(&outcome.documents);
        if corpus.is_blank() {
            warn!("Documents contained no extractable text");
            return Err(StudyMateError::NoContent {
                failures: outcome.failures,
            });
        }

        let chunks = chunk_corpus(&corpus, &self.config.chunking)?;
        if chunks.len() > self.config.limits.max_chunks {
            return Err(StudyMateError::CorpusTooLarge {
                chunks: chunks.len(),
                limit: self.config.limits.max_chunks,
                failures: outcome.failures,
            });
        }

        let knowledge = match self.build_knowledge_base(chunks, &corpus).await {
            Ok(knowledge) => knowledge,
            Err(e) => {
                for failure in &outcome.failures {
                    error!("Skipped before processing failed: {}", failure);
                }
                return Err(e);
            }
        };

        let report = ProcessingReport {
            documents: outcome
                .documents
                .iter()
                .filter(|d| !d.text.is_empty())
                .map(|d| d.name.clone())
                .collect(),
            failures: outcome.failures,
            chunk_count: knowledge.chunks().len(),
            dimension: knowledge.index().dimension(),
            elapsed: started.elapsed(),
            processed_at: knowledge.built_at(),
        };

        self.knowledge = Some(Arc::new(knowledge));
        self.last_answer = None;

        info!(
            "Indexed {} chunks from {} documents in {:?}",
            report.chunk_count,
            report.documents.len(),
            report.elapsed
        );

        Ok(report)
    }

    async fn build_knowledge_base(
        &self,
        chunks: Vec<Chunk>,
        corpus: &Corpus,
    ) -> Result<KnowledgeBase> {
        info!("Embedding {} chunks", chunks.len());
        let texts = chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>();
        let embedder = Arc::clone(&self.embedder);
        let vectors = tokio::task::spawn_blocking(move || embedder.embed(&texts))
            .await
            .map_err(|e| StudyMateError::Other(e.into()))??;

        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            }
            .into());
        }

        let index = FlatIndex::build(vectors)?;
        Ok(KnowledgeBase::new(chunks, index, corpus.spans().to_vec())?)
    }

    /// Answer a question from the current knowledge base
    #[inline]
    #[instrument(skip_all, fields(session = %self.id))]
    pub async fn ask(&mut self, question: &str) -> Result<&Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(StudyMateError::EmptyQuery);
        }

        let Some(knowledge) = self.knowledge.as_ref().map(Arc::clone) else {
            warn!("Question asked before documents were processed");
            return Err(StudyMateError::DocumentsNotProcessed);
        };

        let embedder = Arc::clone(&self.embedder);
        let top_k = self.config.retrieval.top_k;
        let query = question.to_string();
        let sources = tokio::task::spawn_blocking(move || {
            retrieve(&query, embedder.as_ref(), &knowledge, top_k)
        })
        .await
        .map_err(|e| StudyMateError::Other(e.into()))??;

        let text = answer(
            question,
            &sources.iter().map(|s| s.text.as_str()).collect::<Vec<_>>(),
            Arc::clone(&self.generator),
            self.config.generation.options(),
            self.config.generation.timeout(),
        )
        .await?;

        info!(
            "Answered question using {} chunks ({} characters)",
            sources.len(),
            text.chars().count()
        );

        Ok(self.last_answer.insert(Answer {
            question: question.to_string(),
            text,
            sources,
        }))
    }
}
