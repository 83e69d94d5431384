// Documents module
// PDF text extraction and corpus assembly

mod corpus;


use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use fancy_regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LimitsConfig;

pub use corpus::{Corpus, DocumentSpan};

const PDF_MAGIC: &[u8] = b"%PDF";

static HYPHENATED_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?<=\w)-[ \t]*\r?\n[ \t]*(?=\w)").expect("hyphen pattern is valid")
});
static HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\x{a0}]+").expect("space pattern is valid"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*(?:\n[ \t]*)+").expect("blank line pattern is valid"));

/// A file that could not be turned into text. The file is skipped.
#[derive(Debug, Error)]
#[error("Failed to extract text from {}: {cause}", file.display())]
pub struct DocumentExtractionError {
    pub file: PathBuf,
    pub cause: ExtractionCause,
}

#[derive(Debug, Error)]
pub enum ExtractionCause {
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("file is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("not a PDF document")]
    NotPdf,
    #[error("PDF parsing failed: {0}")]
    Parse(String),
    #[error("extraction did not finish within {0:?}")]
    TimedOut(Duration),
}

/// Text pulled out of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Display name, the file name without directories
    pub name: String,
    pub path: PathBuf,
    pub text: String,
}

/// Result of extracting a batch of files
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub documents: Vec<ExtractedDocument>,
    pub failures: Vec<DocumentExtractionError>,
}

/// Extract and sanitise the text of a single PDF file
#[inline]
pub fn extract_document(
    path: &Path,
    limits: &LimitsConfig,
) -> Result<ExtractedDocument, DocumentExtractionError> {
    let fail = |cause: ExtractionCause| DocumentExtractionError {
        file: path.to_path_buf(),
        cause,
    };

    let size = fs::metadata(path).map_err(|e| fail(e.into()))?.len();
    if size > limits.max_file_bytes {
        return Err(fail(ExtractionCause::TooLarge {
            size,
            limit: limits.max_file_bytes,
        }));
    }

    let bytes = fs::read(path).map_err(|e| fail(e.into()))?;
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(fail(ExtractionCause::NotPdf));
    }

    let raw = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| fail(ExtractionCause::Parse(e.to_string())))?;
    let text = sanitize_text(&raw);

    if text.is_empty() {
        warn!(
            "No extractable text in {} (image-only or encrypted PDF?)",
            path.display()
        );
    }

    debug!(
        "Extracted {} characters from {}",
        text.chars().count(),
        path.display()
    );

    Ok(ExtractedDocument {
        name: display_name(path),
        path: path.to_path_buf(),
        text,
    })
}

/// Extract every file in order, collecting failures instead of aborting.
///
/// Each file runs on the blocking pool and is bounded by
/// `limits.extraction_timeout_secs`.
#[inline]
pub async fn extract_all(paths: &[PathBuf], limits: &LimitsConfig) -> ExtractionOutcome {
    let timeout = Duration::from_secs(limits.extraction_timeout_secs);
    let mut outcome = ExtractionOutcome::default();

    for path in paths {
        let task_path = path.clone();
        let task_limits = limits.clone();
        let task =
            tokio::task::spawn_blocking(move || extract_document(&task_path, &task_limits));

        let result = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(DocumentExtractionError {
                file: path.clone(),
                cause: ExtractionCause::Parse(format!("extractor crashed: {}", join_error)),
            }),
            Err(_) => Err(DocumentExtractionError {
                file: path.clone(),
                cause: ExtractionCause::TimedOut(timeout),
            }),
        };

        match result {
            Ok(document) => outcome.documents.push(document),
            Err(e) => {
                warn!("{}", e);
                outcome.failures.push(e);
            }
        }
    }

    info!(
        "Extracted {} of {} documents",
        outcome.documents.len(),
        paths.len()
    );

    outcome
}

/// Normalise whitespace in extracted PDF text.
///
/// Words hyphenated across a line break are rejoined, runs of spaces collapse
/// to one, runs of blank lines collapse to a single paragraph break.
#[inline]
pub fn sanitize_text(raw: &str) -> String {
    let joined = HYPHENATED_BREAK.replace_all(raw, "");
    let spaced = HORIZONTAL_SPACE.replace_all(&joined, " ");
    let paragraphs = BLANK_LINES.replace_all(&spaced, "\n\n");

    paragraphs
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
