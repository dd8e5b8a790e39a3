//! Single-entry writes, reads and statistics

use super::*;

#[test]
fn test_add_then_get_returns_same_entry() {
    let store = memory_store();
    let original = entry("doc1", &[0.1, 0.2, 0.3], json!({"category": "AI", "year": 2024}));

    let id = store.add_vector(original.clone()).unwrap();
    assert_eq!(id, "doc1");

    let fetched = store.get_vector("doc1").unwrap().unwrap();
    assert_eq!(fetched, original);
}

#[test]
fn test_get_missing_is_none() {
    let store = memory_store();
    assert!(store.get_vector("missing").unwrap().is_none());
}

#[test]
fn test_add_duplicate_id_is_storage_error() {
    let store = memory_store();
    store.add_vector(entry("doc1", &[1.0, 0.0], json!({}))).unwrap();

    let err = store
        .add_vector(entry("doc1", &[0.0, 1.0], json!({})))
        .unwrap_err();
    assert!(err.is_storage());
    assert_eq!(
        store.get_vector("doc1").unwrap().unwrap().embedding,
        vec![1.0, 0.0]
    );
}

#[test]
fn test_add_wrong_dimension_is_storage_error() {
    let store = memory_store();
    store.add_vector(entry("a", &[1.0, 0.0, 0.0], json!({}))).unwrap();

    let err = store.add_vector(entry("b", &[1.0, 0.0], json!({}))).unwrap_err();
    assert!(err.is_storage());
    assert_eq!(store.count_vectors(None).unwrap(), 1);
}

#[test]
fn test_nested_metadata_is_rejected() {
    let err = VectorEntry::new("doc1", "text", vec![1.0])
        .with_metadata_json(&json!({"author": {"name": "x"}}))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidMetadata(_)));
}

#[test]
fn test_update_replaces_fields() {
    let store = memory_store();
    store
        .add_vector(entry("doc1", &[1.0, 0.0], json!({"status": "draft"})))
        .unwrap();

    let replacement = VectorEntry::new("doc1", "rewritten", vec![0.0, 1.0])
        .with_metadata_json(&json!({"status": "published"}))
        .unwrap();
    assert!(store.update_vector(replacement.clone()).unwrap());

    assert_eq!(store.get_vector("doc1").unwrap().unwrap(), replacement);
    assert_eq!(store.count_vectors(None).unwrap(), 1);
}

#[test]
fn test_update_missing_entry_inserts_it() {
    let store = memory_store();
    assert!(store
        .update_vector(entry("fresh", &[1.0, 0.0], json!({})))
        .unwrap());
    assert!(store.get_vector("fresh").unwrap().is_some());
}

#[test]
fn test_delete_reports_existence() {
    let store = memory_store();
    store.add_vector(entry("doc1", &[1.0, 0.0], json!({}))).unwrap();

    assert!(store.delete_vector("doc1"));
    assert!(!store.delete_vector("doc1"));
    assert!(!store.delete_vector("never-existed"));
    assert!(store.get_vector("doc1").unwrap().is_none());
}

#[test]
fn test_clear_empties_and_resets_dimension() {
    let store = memory_store();
    seed_corpus(&store);

    assert!(store.clear().unwrap());
    assert_eq!(store.count_vectors(None).unwrap(), 0);
    assert!(store.get_all_vectors().unwrap().is_empty());

    // A fresh collection accepts a new dimension
    store.add_vector(entry("2d", &[1.0, 0.0], json!({}))).unwrap();
    assert_eq!(store.get_stats().unwrap().vector_dimension, 2);
}

#[test]
fn test_clear_keeps_metric() {
    let store = open(StoreOptions::new().distance_metric("l2"));
    store.clear().unwrap();
    assert_eq!(store.metric(), DistanceMetric::Euclidean);
}

#[test]
fn test_get_all_in_insertion_order() {
    let store = memory_store();
    seed_corpus(&store);

    let all: Vec<String> = store
        .get_all_vectors()
        .unwrap()
        .into_iter()
        .map(|e| e.document_id)
        .collect();
    assert_eq!(all, ["ai-2024", "ai-2021", "db-2023", "db-2019", "os-2022"]);
}

#[test]
fn test_content_falls_back_to_metadata() {
    let store = memory_store();
    let stored = VectorEntry::new("doc1", "", vec![1.0, 0.0])
        .with_metadata_json(&json!({"content": "from metadata"}))
        .unwrap();
    store.add_vector(stored).unwrap();

    assert_eq!(
        store.get_vector("doc1").unwrap().unwrap().content,
        "from metadata"
    );
}

// =============================================================================
// Statistics
// =============================================================================

#[test]
fn test_stats_on_empty_store() {
    let store = memory_store();
    let stats = store.get_stats().unwrap();
    assert_eq!(stats.total_vectors, 0);
    assert_eq!(stats.vector_dimension, 0);
    assert!(!stats.index_type.is_empty());
}

#[test]
fn test_stats_after_inserts() {
    let store = memory_store();
    seed_corpus(&store);

    let stats = store.get_stats().unwrap();
    assert_eq!(stats.total_vectors, 5);
    assert_eq!(stats.vector_dimension, 3);
    assert!(stats.storage_size_bytes > 0);
    assert_eq!(stats.index_type, "brute_force");
}

#[test]
fn test_count_with_filter() {
    let store = memory_store();
    seed_corpus(&store);

    assert_eq!(store.count_vectors(None).unwrap(), 5);
    assert_eq!(
        store.count_vectors(Some(&json!({"category": "DB"}))).unwrap(),
        2
    );
    assert_eq!(store.count_vectors(Some(&json!({}))).unwrap(), 5);
}

#[test]
fn test_processing_stats_track_writes_and_errors() {
    let store = memory_store();
    seed_corpus(&store);
    store.get_vector("ai-2024").unwrap();
    let _ = store.add_vector(entry("ai-2024", &[1.0, 0.0, 0.0], json!({})));

    let stats = store.processing_stats();
    assert_eq!(stats.vectors_stored, 5);
    assert_eq!(stats.vectors_retrieved, 1);
    assert_eq!(stats.errors, 1);
    assert!(stats.last_processed.is_some());
}
