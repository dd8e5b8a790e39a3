//! Convenient imports for the document store.
//!
//! ```ignore
//! use refinire_rag_strata::prelude::*;
//!
//! let store = DocumentStore::builder().open()?;
//! ```

// Main entry point
pub use crate::config::StoreOptions;
pub use crate::store::DocumentStore;

// Error handling
pub use crate::error::{Error, Result};

// Values
pub use crate::types::{Document, SearchOptions, SearchResult, StoreStats, VectorEntry};
pub use strata_core::{DistanceMetric, Metadata, MetadataValue};

// Embedding pipeline
pub use crate::embedder::{EmbedError, Embedder};

// Re-export serde_json for convenience
pub use serde_json::json;
