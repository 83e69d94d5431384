// Ollama module
// Blocking HTTP client for a local Ollama server, backing both model traits


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::OllamaConfig;
use crate::embeddings::{Embedder, EmbeddingError};
use crate::generation::{GenerationError, GenerationOptions, Generator};

const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
const EXPONENTIAL_BACKOFF_BASE: u32 = 2;

/// Failure of a single HTTP exchange after retries
#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("Client error: HTTP {0}")]
    ClientStatus(u16),
    #[error("Request timed out")]
    Timeout,
    #[error("Request error: {0}")]
    Transport(String),
    #[error("Non-retryable error: {0}")]
    NonRetryable(String),
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    agent: ureq::Agent,
    retry_attempts: u32,
    backoff: Duration,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateRequestOptions,
}

#[derive(Debug, Serialize)]
struct GenerateRequestOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
    pub details: Option<ModelDetails>,
}

#[derive(Debug, Deserialize)]
pub struct ModelDetails {
    pub format: Option<String>,
    pub family: Option<String>,
    pub parameter_size: Option<String>,
    pub quantization_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        Ok(Self {
            base_url,
            agent: build_agent(Duration::from_secs(config.request_timeout_secs)),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry, doubled on each further attempt
    #[inline]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Test connection to Ollama server and verify every model is pulled
    #[inline]
    pub fn health_check(&self, models: &[&str]) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let available = self.list_models().context("Server ping failed")?;

        let missing = models
            .iter()
            .copied()
            .filter(|wanted| !available.iter().any(|m| model_matches(wanted, &m.name)))
            .collect::<Vec<_>>();

        if !missing.is_empty() {
            let available_models: Vec<&str> = available.iter().map(|m| m.name.as_str()).collect();
            warn!(
                "Models {:?} not found. Available models: {:?}",
                missing, available_models
            );
            return Err(anyhow::anyhow!(
                "Model {:?} is not available (try `ollama pull`). Available models: {:?}",
                missing,
                available_models
            ));
        }

        info!(
            "Health check passed for Ollama server at {} with models {:?}",
            self.base_url, models
        );
        Ok(())
    }

    /// List all pulled models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build models URL")?;

        debug!("Fetching available models from {}", url);

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .get(url.as_str())
                    .call()
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to fetch models")?;

        let models_response: ModelsResponse =
            serde_json::from_str(&response_text).context("Failed to parse models response")?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// Embed texts in one request, preserving order
    #[inline]
    pub fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embedding URL")?;

        let request_json = serde_json::to_string(&EmbedRequest {
            model,
            input: texts,
        })
        .context("Failed to serialize embedding request")?;

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate embeddings")?;

        let response: EmbedResponse = serde_json::from_str(&response_text)
            .context("Failed to parse embedding response")?;

        debug!(
            "Generated {} embeddings with {} dimensions",
            response.embeddings.len(),
            response.embeddings.first().map_or(0, Vec::len)
        );

        Ok(response.embeddings)
    }

    /// Run a non-streaming completion and return only the generated text
    #[inline]
    pub fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generate URL")?;

        let request_json = serde_json::to_string(&GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateRequestOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        })
        .context("Failed to serialize generate request")?;

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate completion")?;

        let response: GenerateResponse = serde_json::from_str(&response_text)
            .context("Failed to parse generate response")?;

        debug!("Generated {} characters", response.response.chars().count());
        Ok(response.response)
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String, OllamaError>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(ureq::Error::StatusCode(status)) if status < 500 => {
                    warn!("Client error (status {}), not retrying", status);
                    return Err(OllamaError::ClientStatus(status));
                }
                Err(ureq::Error::Timeout(timeout)) => {
                    warn!("Request timed out ({:?}), not retrying", timeout);
                    return Err(OllamaError::Timeout);
                }
                Err(
                    error @ (ureq::Error::StatusCode(_)
                    | ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Io(_)),
                ) => {
                    warn!(
                        "Transport error: {}, attempt {}/{}",
                        error, attempt, self.retry_attempts
                    );
                    last_error = Some(OllamaError::Transport(error.to_string()));

                    if attempt < self.retry_attempts {
                        let delay = self.backoff * EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
                Err(error) => {
                    warn!("Non-retryable error: {}", error);
                    return Err(OllamaError::NonRetryable(error.to_string()));
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error
            .unwrap_or_else(|| OllamaError::Transport("Request failed after retries".to_string())))
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Ollama reports untagged models with an implicit `:latest` tag
#[inline]
pub fn model_matches(wanted: &str, available: &str) -> bool {
    available == wanted
        || (!wanted.contains(':')
            && available
                .strip_prefix(wanted)
                .is_some_and(|tag| tag == ":latest"))
}

fn is_timeout(error: &anyhow::Error) -> bool {
    matches!(error.downcast_ref::<OllamaError>(), Some(OllamaError::Timeout))
}

/// Sentence embeddings served by Ollama's `/api/embed`
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
    batch_size: usize,
}

impl OllamaEmbedder {
    #[inline]
    pub fn new(client: OllamaClient, model: impl Into<String>, batch_size: usize) -> Self {
        Self {
            client,
            model: model.into(),
            batch_size: batch_size.max(1),
        }
    }

    #[inline]
    pub fn from_config(config: &OllamaConfig) -> Result<Self> {
        Ok(Self::new(
            OllamaClient::new(config)?,
            config.embedding_model.clone(),
            config.batch_size as usize,
        ))
    }
}

impl Embedder for OllamaEmbedder {
    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!(
            "Embedding {} texts with {} in batches of {}",
            texts.len(),
            self.model,
            self.batch_size
        );

        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let embeddings = self
                .client
                .embed(&self.model, batch)
                .map_err(|e| EmbeddingError::RequestFailed(format!("{e:#}")))?;

            if embeddings.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: embeddings.len(),
                });
            }

            vectors.extend(embeddings);
        }

        Ok(vectors)
    }
}

/// Text completion served by Ollama's `/api/generate`
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: OllamaClient,
    model: String,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// The HTTP timeout is aligned with the per-answer generation budget
    #[inline]
    pub fn from_config(config: &OllamaConfig, timeout: Duration) -> Result<Self> {
        Ok(Self::new(
            OllamaClient::new(config)?.with_timeout(timeout),
            config.generation_model.clone(),
        ))
    }
}

impl Generator for OllamaGenerator {
    #[inline]
    fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        self.client
            .generate(&self.model, prompt, options)
            .map_err(|e| {
                if is_timeout(&e) {
                    GenerationError::TimedOut
                } else {
                    GenerationError::RequestFailed(format!("{e:#}"))
                }
            })
    }
}
