//! One store shared across threads

use super::*;
use std::sync::Arc;
use std::thread;

#[test]
fn test_concurrent_writers() {
    let store = Arc::new(memory_store());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25 {
                    let id = format!("t{t}-{i}");
                    store
                        .add_vector(entry(&id, &[t as f32, i as f32, 1.0], json!({"thread": t})))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.count_vectors(None).unwrap(), 100);
    assert_eq!(store.count_vectors(Some(&json!({"thread": 2}))).unwrap(), 25);
    assert_eq!(store.processing_stats().vectors_stored, 100);
}

#[test]
fn test_readers_during_writes() {
    let store = Arc::new(memory_store());
    seed_corpus(&store);

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..50 {
                let id = format!("w{i}");
                store
                    .add_vector(entry(&id, &[0.5, 0.5, i as f32], json!({})))
                    .unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    let hits = store
                        .search_similar(&[1.0, 0.0, 0.0], &SearchOptions::new().limit(1))
                        .unwrap();
                    assert_eq!(hits[0].document_id, "ai-2024");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.count_vectors(None).unwrap(), 55);
}

#[test]
fn test_clear_while_sharing() {
    let store = Arc::new(memory_store());
    seed_corpus(&store);

    let clearer = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.clear().unwrap())
    };
    assert!(clearer.join().unwrap());

    store.add_vector(entry("after", &[1.0, 0.0], json!({}))).unwrap();
    assert_eq!(store.count_vectors(None).unwrap(), 1);
}
