#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// PDF extraction against generated documents

mod common;

use std::fs;

use studymate::config::LimitsConfig;
use studymate::documents::{ExtractionCause, extract_all, extract_document};
use tempfile::TempDir;

use common::write_pdf;

#[test]
fn extract_rejects_oversized_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_pdf(temp_dir.path(), "big.pdf", &["Too big"]);

    let limits = LimitsConfig {
        max_file_bytes: 16,
        ..LimitsConfig::default()
    };
    let err = extract_document(&path, &limits).expect_err("should fail");

    assert!(matches!(
        err.cause,
        ExtractionCause::TooLarge { limit: 16, .. }
    ));
    assert!(err.to_string().contains("big.pdf"));
}

#[test]
fn extract_text_from_pdf() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_pdf(
        temp_dir.path(),
        "biology.pdf",
        &["Photosynthesis happens in chloroplasts"],
    );

    let document = extract_document(&path, &LimitsConfig::default()).expect("should extract");

    assert_eq!(document.name, "biology.pdf");
    assert_eq!(document.path, path);
    assert!(document.text.contains("Photosynthesis"));
}

#[tokio::test]
async fn extract_all_skips_failures() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let good = write_pdf(temp_dir.path(), "good.pdf", &["Mitochondria produce energy"]);
    let bad = temp_dir.path().join("bad.pdf");
    fs::write(&bad, "%PDF-1.4 truncated garbage").expect("should write file");

    let outcome = extract_all(
        &[bad.clone(), good.clone(), temp_dir.path().join("missing.pdf")],
        &LimitsConfig::default(),
    )
    .await;

    assert_eq!(outcome.documents.len(), 1);
    assert_eq!(outcome.documents[0].path, good);
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(outcome.failures[0].file, bad);
    assert!(matches!(outcome.failures[1].cause, ExtractionCause::Io(_)));
}
