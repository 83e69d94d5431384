use super::*;
use crate::documents::{Corpus, ExtractedDocument};
use crate::embeddings::{ChunkingConfig, EmbeddingError, chunk_corpus};
use std::path::PathBuf;

/// One dimension per keyword, 1.0 when the lowercased text mentions it
struct KeywordEmbedder(&'static [&'static str]);

impl Embedder for KeywordEmbedder {
    fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let text = text.to_lowercase();
                self.0
                    .iter()
                    .map(|keyword| if text.contains(keyword) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }
}

const KEYWORDS: &[&str] = &["sky", "grass", "green"];

fn knowledge_base(documents: &[(&str, &str)], chunking: &ChunkingConfig) -> KnowledgeBase {
    let documents = documents
        .iter()
        .map(|(name, text)| ExtractedDocument {
            name: (*name).to_string(),
            path: PathBuf::from(name),
            text: (*text).to_string(),
        })
        .collect::<Vec<_>>();
    let corpus = Corpus::from_documents(&documents);
    let chunks = chunk_corpus(&corpus, chunking).expect("chunking should succeed");

    let texts = chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>();
    let vectors = KeywordEmbedder(KEYWORDS)
        .embed(&texts)
        .expect("embedding should succeed");
    let index = FlatIndex::build(vectors).expect("index should build");

    KnowledgeBase::new(chunks, index, corpus.spans().to_vec())
        .expect("knowledge base should be consistent")
}

fn sky_knowledge_base() -> KnowledgeBase {
    knowledge_base(
        &[("nature.pdf", "The sky is blue. Grass is green.")],
        &ChunkingConfig {
            chunk_size: 20,
            overlap: 5,
        },
    )
}

#[test]
fn default_config() {
    assert_eq!(RetrievalConfig::default().top_k, 3);
    assert!(RetrievalConfig::default().validate().is_ok());
    assert!(matches!(
        RetrievalConfig { top_k: 0 }.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));
}

#[test]
fn misaligned_knowledge_base_is_rejected() {
    let chunk = Chunk {
        position: 0,
        text: "only chunk".to_string(),
        start: 0,
        sources: vec![],
    };
    let index = FlatIndex::build(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).expect("index should build");

    let err = KnowledgeBase::new(vec![chunk], index, vec![]).expect_err("should be rejected");
    assert_eq!(
        err,
        IndexError::Misaligned {
            chunks: 1,
            vectors: 2
        }
    );
}

#[test]
fn nearest_chunk_comes_first() {
    let knowledge = sky_knowledge_base();
    assert_eq!(knowledge.chunks().len(), 3);

    let retrieved = retrieve(
        "What color is the sky?",
        &KeywordEmbedder(KEYWORDS),
        &knowledge,
        1,
    )
    .expect("retrieval should succeed");

    assert_eq!(retrieved.len(), 1);
    assert_eq!(retrieved[0].position, 0);
    assert_eq!(retrieved[0].text, "The sky is blue. Gra");
    assert!(retrieved[0].distance.abs() < f32::EPSILON);
    assert_eq!(retrieved[0].sources, vec!["nature.pdf".to_string()]);
}

#[test]
fn results_are_ordered_by_distance() {
    let knowledge = sky_knowledge_base();

    let retrieved = retrieve(
        "What color is the sky?",
        &KeywordEmbedder(KEYWORDS),
        &knowledge,
        3,
    )
    .expect("retrieval should succeed");

    let positions = retrieved.iter().map(|r| r.position).collect::<Vec<_>>();
    assert_eq!(positions, vec![0, 2, 1]);
    assert!(
        retrieved
            .windows(2)
            .all(|pair| pair[0].distance <= pair[1].distance)
    );
}

#[test]
fn top_k_saturates_at_chunk_count() {
    let knowledge = knowledge_base(
        &[("short.pdf", "Grass grows under the sky.")],
        &ChunkingConfig {
            chunk_size: 20,
            overlap: 5,
        },
    );
    assert_eq!(knowledge.chunks().len(), 2);

    let retrieved = retrieve("grass", &KeywordEmbedder(KEYWORDS), &knowledge, 3)
        .expect("retrieval should succeed");

    assert_eq!(retrieved.len(), 2);
}

#[test]
fn retrieval_is_deterministic() {
    let knowledge = sky_knowledge_base();
    let embedder = KeywordEmbedder(KEYWORDS);

    let first = retrieve("green grass", &embedder, &knowledge, 2).expect("should succeed");
    let second = retrieve("green grass", &embedder, &knowledge, 2).expect("should succeed");

    assert_eq!(first, second);
    assert_eq!(first[0].position, 1);
}

#[test]
fn chunk_sources_span_documents() {
    let knowledge = knowledge_base(
        &[
            ("sky.pdf", "The sky is blue today."),
            ("grass.pdf", "Grass is green in spring."),
        ],
        &ChunkingConfig {
            chunk_size: 30,
            overlap: 5,
        },
    );

    let retrieved = retrieve("sky grass", &KeywordEmbedder(KEYWORDS), &knowledge, 1)
        .expect("retrieval should succeed");

    assert_eq!(
        retrieved[0].sources,
        vec!["sky.pdf".to_string(), "grass.pdf".to_string()]
    );
}

#[test]
fn zero_top_k_is_rejected() {
    let knowledge = sky_knowledge_base();

    let result = retrieve("sky", &KeywordEmbedder(KEYWORDS), &knowledge, 0);
    assert!(matches!(
        result,
        Err(crate::StudyMateError::Config(ConfigError::InvalidTopK(0)))
    ));
}

#[test]
fn query_dimension_must_match() {
    let knowledge = sky_knowledge_base();

    let result = retrieve("sky", &KeywordEmbedder(&["sky"]), &knowledge, 1);
    assert!(matches!(
        result,
        Err(crate::StudyMateError::Index(
            IndexError::QueryDimensionMismatch {
                expected: 3,
                actual: 1
            }
        ))
    ));
}
