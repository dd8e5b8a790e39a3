//! Embedder + process

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Character-class counts; fails on empty text
struct CountingEmbedder {
    calls: AtomicUsize,
}

impl Embedder for CountingEmbedder {
    fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Err(EmbedError::new("cannot embed empty text"));
        }
        let letters = text.chars().filter(|c| c.is_alphabetic()).count() as f32;
        let digits = text.chars().filter(|c| c.is_ascii_digit()).count() as f32;
        Ok(vec![letters, digits, 1.0])
    }

    fn dimension(&self) -> Option<usize> {
        Some(3)
    }
}

fn store_with_embedder() -> (DocumentStore, Arc<CountingEmbedder>) {
    let store = memory_store();
    let embedder = Arc::new(CountingEmbedder {
        calls: AtomicUsize::new(0),
    });
    store.set_embedder(embedder.clone());
    (store, embedder)
}

#[test]
fn test_process_without_embedder_fails() {
    let store = memory_store();
    assert!(!store.has_embedder());

    let err = store
        .process(vec![Document::new("d1", "text")])
        .err()
        .unwrap();
    assert!(matches!(err, Error::EmbedderNotSet));
}

#[test]
fn test_process_embeds_and_stores() {
    let (store, _) = store_with_embedder();
    assert!(store.has_embedder());

    let mut meta = Metadata::new();
    meta.insert("source".to_string(), MetadataValue::from("wiki"));
    let docs = vec![
        Document::new("d1", "Rust 2024").with_metadata(meta),
        Document::new("d2", "ownership"),
    ];

    let stored: Vec<VectorEntry> = store
        .process(docs)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].embedding, vec![4.0, 4.0, 1.0]);

    let fetched = store.get_vector("d1").unwrap().unwrap();
    assert_eq!(fetched, stored[0]);
    assert_eq!(fetched.metadata.get("source"), Some(&MetadataValue::from("wiki")));

    let stats = store.processing_stats();
    assert_eq!(stats.documents_processed, 2);
    assert_eq!(stats.vectors_stored, 2);
}

#[test]
fn test_process_is_lazy() {
    let (store, embedder) = store_with_embedder();
    let docs = vec![Document::new("d1", "one"), Document::new("d2", "two")];

    let mut iter = store.process(docs).unwrap();
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);

    iter.next().unwrap().unwrap();
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    drop(iter);

    assert_eq!(store.count_vectors(None).unwrap(), 1);
}

#[test]
fn test_embedding_failure_continues() {
    let (store, _) = store_with_embedder();
    let docs = vec![
        Document::new("good1", "alpha"),
        Document::new("bad", "   "),
        Document::new("good2", "beta"),
    ];

    let results: Vec<Result<VectorEntry>> = store.process(docs).unwrap().collect();
    assert!(results[0].is_ok());
    match &results[1] {
        Err(Error::Embedding { document_id, .. }) => assert_eq!(document_id, "bad"),
        other => panic!("expected embedding error, got {other:?}"),
    }
    assert!(results[2].is_ok());

    assert_eq!(store.count_vectors(None).unwrap(), 2);
    let stats = store.processing_stats();
    assert_eq!(stats.embedding_errors, 1);
    assert_eq!(stats.documents_processed, 2);
}

#[test]
fn test_closure_embedder() {
    let store = memory_store();
    store.set_embedder(Arc::new(|text: &str| -> std::result::Result<Vec<f32>, EmbedError> {
        Ok(vec![text.len() as f32, 1.0])
    }));

    let stored: Vec<VectorEntry> = store
        .process(vec![Document::new("d1", "abc")])
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(stored[0].embedding, vec![3.0, 1.0]);
}

#[test]
fn test_duplicate_document_surfaces_storage_error() {
    let (store, _) = store_with_embedder();
    let docs = vec![Document::new("d1", "first"), Document::new("d1", "again")];

    let results: Vec<Result<VectorEntry>> = store.process(docs).unwrap().collect();
    assert!(results[0].is_ok());
    assert!(results[1].as_ref().unwrap_err().is_storage());
}

/// Declares a dimension but returns whatever length the text asks for
struct SloppyEmbedder;

impl Embedder for SloppyEmbedder {
    fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbedError> {
        Ok(vec![1.0; text.len()])
    }

    fn dimension(&self) -> Option<usize> {
        Some(3)
    }
}

#[test]
fn test_declared_dimension_must_match_collection() {
    let store = memory_store();
    store.add_vector(entry("seed", &[1.0, 0.0], json!({}))).unwrap();
    store.set_embedder(Arc::new(SloppyEmbedder));

    let err = store
        .process(vec![Document::new("d1", "abc")])
        .err()
        .unwrap();
    assert!(err.is_storage());
    assert!(err.to_string().contains("3-dimensional"));
    assert_eq!(store.count_vectors(None).unwrap(), 1);
}

#[test]
fn test_embedding_off_declared_dimension_is_not_stored() {
    let store = memory_store();
    store.set_embedder(Arc::new(SloppyEmbedder));

    let results: Vec<Result<VectorEntry>> = store
        .process(vec![Document::new("ok", "abc"), Document::new("long", "abcdef")])
        .unwrap()
        .collect();
    assert!(results[0].is_ok());
    match &results[1] {
        Err(Error::Embedding { document_id, message }) => {
            assert_eq!(document_id, "long");
            assert!(message.contains("expected 3"), "{message}");
        }
        other => panic!("expected embedding error, got {other:?}"),
    }
    assert_eq!(store.count_vectors(None).unwrap(), 1);
    assert_eq!(store.processing_stats().embedding_errors, 1);
}
