//! Error types for the document store.
//!
//! Caller mistakes (configuration, filters, metadata) are reported as their
//! own variants and are never retried. Anything the engine reports is wrapped
//! uniformly as `Storage`.

use strata_core::MetadataError;
use strata_engine::EngineError;
use thiserror::Error;

/// All document store errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value (explicit or from the environment) is unusable
    #[error("invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// Setting name, e.g. `batch_size`
        field: &'static str,
        /// What was wrong, including the offending value
        message: String,
    },

    /// Malformed filter expression, raised before any engine call
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Metadata that cannot be stored (nested object, null, mixed list)
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Engine-level failure
    #[error("storage error: {0}")]
    Storage(String),

    /// A batched insert failed after some chunks were committed
    #[error("batch insert failed after committing {} entries: {message}", committed.len())]
    PartialBatch {
        /// Ids that were durably written before the failure
        committed: Vec<String>,
        /// Engine failure for the first uncommitted chunk
        message: String,
    },

    /// `process` was called before `set_embedder`
    #[error("no embedder configured; call set_embedder first")]
    EmbedderNotSet,

    /// The embedder failed for a document
    #[error("embedding failed for document {document_id}: {message}")]
    Embedding {
        /// Document being embedded
        document_id: String,
        /// Embedder's message
        message: String,
    },
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(field: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn filter(message: impl Into<String>) -> Self {
        Error::InvalidFilter(message.into())
    }

    /// Check if this error came from the engine.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::PartialBatch { .. })
    }

    /// Check if this error is a caller mistake that retrying cannot fix.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig { .. }
                | Error::InvalidFilter(_)
                | Error::InvalidMetadata(_)
                | Error::EmbedderNotSet
        )
    }
}

impl From<EngineError> for Error {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidMetadata { id, source } => {
                Error::InvalidMetadata(format!("{id}: {source}"))
            }
            other => Error::Storage(other.to_string()),
        }
    }
}

impl From<MetadataError> for Error {
    fn from(e: MetadataError) -> Self {
        Error::InvalidMetadata(e.to_string())
    }
}
