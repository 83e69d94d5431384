// Generation module
// Prompt assembly and the boundary to the text-generation model

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::{Result, StudyMateError};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    RequestFailed(String),
    #[error("invalid generation response: {0}")]
    InvalidResponse(String),
    #[error("generation request timed out")]
    TimedOut,
}

/// Sampling parameters handed to the model on every call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    #[inline]
    fn default() -> Self {
        GenerationConfig::default().options()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Wall-clock budget for one answer
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

impl GenerationConfig {
    #[inline]
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(1..=8192).contains(&self.max_tokens) {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        if !(1..=3600).contains(&self.timeout_secs) {
            return Err(ConfigError::InvalidGenerationTimeout(self.timeout_secs));
        }

        Ok(())
    }

    #[inline]
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// A causal language model. Sampling makes output non-deterministic.
pub trait Generator: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<String, GenerationError>;
}

/// Assemble the retrieved context and the question into a single prompt.
///
/// Chunks are newline-joined in retrieval order.
#[inline]
pub fn build_prompt<S: AsRef<str>>(query: &str, chunks: &[S]) -> String {
    let context = chunks
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n");

    format!("Context:\n{context}\n\nQuestion: {query}\nAnswer:")
}

/// Build the prompt for `query` over the retrieved `chunks` and generate an answer
#[inline]
pub async fn answer<S: AsRef<str> + Sync>(
    query: &str,
    chunks: &[S],
    generator: Arc<dyn Generator>,
    options: GenerationOptions,
    timeout: Duration,
) -> Result<String> {
    generate_answer(generator, build_prompt(query, chunks), options, timeout).await
}

/// Run the generator on the blocking pool, giving up after `timeout`.
///
/// An abandoned call keeps its worker thread until the HTTP agent's own
/// timeout fires; the caller gets control back immediately.
#[inline]
pub async fn generate_answer(
    generator: Arc<dyn Generator>,
    prompt: String,
    options: GenerationOptions,
    timeout: Duration,
) -> Result<String> {
    debug!(
        "Generating answer (prompt {} chars, max_tokens {}, temperature {})",
        prompt.chars().count(),
        options.max_tokens,
        options.temperature
    );

    let task = tokio::task::spawn_blocking(move || generator.generate(&prompt, &options));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(text))) => Ok(text.trim().to_string()),
        Ok(Ok(Err(GenerationError::TimedOut))) | Err(_) => {
            warn!("Generation exceeded {:?}", timeout);
            Err(StudyMateError::GenerationTimeout(timeout))
        }
        Ok(Ok(Err(e))) => Err(e.into()),
        Ok(Err(join_error)) => Err(StudyMateError::Other(anyhow::anyhow!(
            "Generation task failed: {}",
            join_error
        ))),
    }
}
