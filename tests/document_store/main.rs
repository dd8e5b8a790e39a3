//! DocumentStore Integration Test Suite
//!
//! Tests organized by functionality:
//! - config: construction through the resolver (precedence, validation)
//! - crud: add / get / update / delete / clear / stats
//! - batch: chunked inserts and whole-batch validation
//! - search: similarity search, thresholds, similar-to-document, metadata search
//! - filters: filter grammar end to end against stored metadata
//! - persistence: reopening a persist directory
//! - pipeline: embedder + process
//! - concurrency: shared store across threads
//! - properties: proptest properties for parsing and translation
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test document_store
//! cargo test --test document_store search::
//! ```

use std::collections::BTreeMap;

use refinire_rag_strata::prelude::*;
use refinire_rag_strata::{ConfigResolver, ResolvedConfig};

mod batch;
mod concurrency;
mod config;
mod crud;
mod pipeline;
mod properties;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Route `tracing` output through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Empty environment, so tests never see the real process env
pub fn no_env() -> BTreeMap<String, String> {
    BTreeMap::new()
}

/// Environment map with `REFINIRE_RAG_STRATA_` prefixed keys
pub fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (format!("REFINIRE_RAG_STRATA_{k}"), v.to_string()))
        .collect()
}

/// Resolve options against an isolated environment
pub fn resolve(options: StoreOptions, env: &BTreeMap<String, String>) -> Result<ResolvedConfig> {
    ConfigResolver::new(env).resolve(&options)
}

/// Open a store against an isolated environment
pub fn open(options: StoreOptions) -> DocumentStore {
    init_tracing();
    DocumentStore::from_config(resolve(options, &no_env()).unwrap()).unwrap()
}

/// In-memory store with default settings
pub fn memory_store() -> DocumentStore {
    open(StoreOptions::new())
}

/// Entry with JSON metadata
pub fn entry(id: &str, embedding: &[f32], metadata: serde_json::Value) -> VectorEntry {
    VectorEntry::new(id, format!("content of {id}"), embedding.to_vec())
        .with_metadata_json(&metadata)
        .unwrap()
}

/// Five 3-d documents with category / year / score / tags metadata
pub fn seed_corpus(store: &DocumentStore) {
    store
        .add_vectors(vec![
            entry(
                "ai-2024",
                &[1.0, 0.0, 0.0],
                json!({"category": "AI", "year": 2024, "score": 0.9, "tags": ["ml", "nlp"]}),
            ),
            entry(
                "ai-2021",
                &[0.9, 0.1, 0.0],
                json!({"category": "AI", "year": 2021, "score": 0.7, "tags": ["ml"]}),
            ),
            entry(
                "db-2023",
                &[0.0, 1.0, 0.0],
                json!({"category": "DB", "year": 2023, "score": 0.85, "tags": ["storage"]}),
            ),
            entry(
                "db-2019",
                &[0.1, 0.9, 0.0],
                json!({"category": "DB", "year": 2019, "score": 0.4, "tags": ["storage", "sql"]}),
            ),
            entry(
                "os-2022",
                &[0.0, 0.0, 1.0],
                json!({"category": "OS", "year": 2022, "score": 0.6, "tags": ["kernel"]}),
            ),
        ])
        .unwrap();
}

/// Ids of search results, in order
pub fn ids(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.document_id.as_str()).collect()
}

/// Sorted ids of search results
pub fn sorted_ids(results: &[SearchResult]) -> Vec<String> {
    let mut ids: Vec<String> = results.iter().map(|r| r.document_id.clone()).collect();
    ids.sort();
    ids
}
