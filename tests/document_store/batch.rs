//! Batch inserts: chunking and up-front validation

use super::*;

fn numbered(count: usize) -> Vec<VectorEntry> {
    (0..count)
        .map(|i| entry(&format!("doc{i:02}"), &[i as f32, 1.0], json!({"n": i as i64})))
        .collect()
}

#[test]
fn test_batch_larger_than_chunk_size() {
    let store = open(StoreOptions::new().batch_size(2));

    let ids = store.add_vectors(numbered(7)).unwrap();
    assert_eq!(ids.len(), 7);
    assert_eq!(ids[0], "doc00");
    assert_eq!(ids[6], "doc06");
    assert_eq!(store.count_vectors(None).unwrap(), 7);
}

#[test]
fn test_empty_batch_is_noop() {
    let store = memory_store();
    assert!(store.add_vectors(Vec::new()).unwrap().is_empty());
    assert_eq!(store.get_stats().unwrap().vector_dimension, 0);
}

#[test]
fn test_dimension_mismatch_writes_nothing() {
    let store = open(StoreOptions::new().batch_size(1));
    let mut batch = numbered(3);
    batch.push(entry("odd", &[1.0, 2.0, 3.0], json!({})));

    let err = store.add_vectors(batch).unwrap_err();
    assert!(err.is_storage());
    assert!(!matches!(err, Error::PartialBatch { .. }));
    assert_eq!(store.count_vectors(None).unwrap(), 0);
}

#[test]
fn test_duplicate_within_batch_writes_nothing() {
    let store = open(StoreOptions::new().batch_size(1));
    let mut batch = numbered(2);
    batch.push(entry("doc00", &[9.0, 9.0], json!({})));

    assert!(store.add_vectors(batch).unwrap_err().is_storage());
    assert_eq!(store.count_vectors(None).unwrap(), 0);
}

#[test]
fn test_existing_id_in_batch_writes_nothing() {
    let store = memory_store();
    store.add_vector(entry("doc01", &[0.0, 0.0], json!({}))).unwrap();

    let err = store.add_vectors(numbered(3)).unwrap_err();
    assert!(err.is_storage());
    assert!(err.to_string().contains("doc01"));
    assert_eq!(store.count_vectors(None).unwrap(), 1);
}

#[test]
fn test_empty_embedding_rejected() {
    let store = memory_store();
    let batch = vec![VectorEntry::new("blank", "text", Vec::new())];
    assert!(store.add_vectors(batch).unwrap_err().is_storage());
}

#[test]
fn test_batch_dimension_must_match_existing() {
    let store = memory_store();
    store.add_vector(entry("seed", &[1.0, 0.0, 0.0], json!({}))).unwrap();

    assert!(store.add_vectors(numbered(2)).unwrap_err().is_storage());
    assert_eq!(store.count_vectors(None).unwrap(), 1);
}
