//! Error types for the vector engine

use strata_core::MetadataError;
use thiserror::Error;

/// Errors raised by engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Collection does not exist (or was dropped while a handle was held)
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// Collection name
        name: String,
    },

    /// Collection already exists
    #[error("collection already exists: {name}")]
    CollectionAlreadyExists {
        /// Collection name
        name: String,
    },

    /// Collection name cannot be used
    #[error("invalid collection name '{name}': {reason}")]
    InvalidCollectionName {
        /// Collection name
        name: String,
        /// Why the name was rejected
        reason: &'static str,
    },

    /// Embedding length does not match the collection
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Collection dimension
        expected: usize,
        /// Supplied dimension
        got: usize,
    },

    /// Id already present (add) or repeated within one batch
    #[error("duplicate id: {id}")]
    DuplicateId {
        /// Offending id
        id: String,
    },

    /// Zero-length embedding
    #[error("empty embedding for id {id}")]
    EmptyEmbedding {
        /// Offending id
        id: String,
    },

    /// Metadata failed validation
    #[error("invalid metadata for id {id}: {source}")]
    InvalidMetadata {
        /// Offending id
        id: String,
        /// Underlying validation error
        #[source]
        source: MetadataError,
    },

    /// I/O error while persisting or loading
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

impl From<rmp_serde::encode::Error> for EngineError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        EngineError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for EngineError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        EngineError::Serialization(e.to_string())
    }
}
