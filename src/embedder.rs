//! Embedding model seam.
//!
//! The store never computes embeddings itself. Callers plug a model in with
//! [`DocumentStore::set_embedder`](crate::DocumentStore::set_embedder) and
//! then feed documents through
//! [`DocumentStore::process`](crate::DocumentStore::process).

use thiserror::Error;

/// Failure reported by an [`Embedder`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EmbedError {
    message: String,
}

impl EmbedError {
    /// Create an error with a message
    pub fn new(message: impl Into<String>) -> Self {
        EmbedError {
            message: message.into(),
        }
    }

    /// The message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Turns text into an embedding vector
pub trait Embedder: Send + Sync {
    /// Embed one text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Output dimension, if fixed and known up front
    fn dimension(&self) -> Option<usize> {
        None
    }
}

impl<F> Embedder for F
where
    F: Fn(&str) -> Result<Vec<f32>, EmbedError> + Send + Sync,
{
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self(text)
    }
}
