//! # refinire-rag-strata
//!
//! Document-oriented vector store for refinire-rag, backed by the embedded
//! Strata vector engine.
//!
//! ## Quick Start
//!
//! ```ignore
//! use refinire_rag_strata::prelude::*;
//!
//! // Settings come from explicit options, then REFINIRE_RAG_STRATA_* env vars,
//! // then defaults.
//! let store = DocumentStore::builder()
//!     .collection_name("papers")
//!     .persist_directory("./vectors")
//!     .open()?;
//!
//! store.add_vector(
//!     VectorEntry::new("doc1", "Ownership in Rust", vec![0.1, 0.9])
//!         .with_metadata_json(&json!({"category": "AI", "year": 2024}))?,
//! )?;
//!
//! let hits = store.search_similar(
//!     &[0.1, 0.8],
//!     &SearchOptions::new()
//!         .limit(5)
//!         .filter(json!({"$and": [{"category": "AI"}, {"year": {"$gte": 2020}}]})),
//! )?;
//! ```
//!
//! ## Pieces
//!
//! - [`config`]: explicit > environment > default resolution into [`ResolvedConfig`]
//! - [`filter`]: `$`-operator JSON filters → [`FilterExpr`] → engine `Where`
//! - [`DocumentStore`]: add / get / update / delete / search over one collection
//! - [`Embedder`]: pluggable model for [`DocumentStore::process`]

#![warn(missing_docs)]

pub mod config;
mod embedder;
mod error;
pub mod filter;
mod stats;
mod store;
mod types;

pub mod prelude;

pub use config::{ConfigResolver, EnvSource, ProcessEnv, ResolvedConfig, StoreOptions};
pub use embedder::{EmbedError, Embedder};
pub use error::{Error, Result};
pub use filter::{CombinatorKind, ComparisonOp, FilterExpr, Operand};
pub use stats::ProcessingStats;
pub use store::{
    distance_to_score, DocumentStore, DEFAULT_METADATA_SEARCH_LIMIT, LARGE_DUMP_WARNING_THRESHOLD,
};
pub use types::*;

// Re-export the vocabulary shared with the engine
pub use strata_core::{DistanceMetric, Metadata, MetadataValue, Scalar};
