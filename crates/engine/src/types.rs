//! Record and result types exchanged with collections

use serde::{Deserialize, Serialize};
use strata_core::{DistanceMetric, Metadata};

/// Internal slot identifier for an indexed vector
///
/// Assigned monotonically per collection and never reused. Ordering by
/// `VectorId` is insertion order, which is what `get` and snapshot writes
/// iterate in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VectorId(pub u64);

impl VectorId {
    /// Raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// A stored entry: caller-chosen id, embedding, document text and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Caller-chosen unique id
    pub id: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Document text
    pub document: String,
    /// Flat metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Record {
    /// Create a record with empty metadata
    pub fn new(id: impl Into<String>, embedding: Vec<f32>, document: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            embedding,
            document: document.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One nearest-neighbour hit
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    /// Entry id
    pub id: String,
    /// Distance under the collection metric (lower = closer)
    pub distance: f32,
    /// Document text
    pub document: String,
    /// Flat metadata
    pub metadata: Metadata,
    /// Embedding, when requested
    pub embedding: Option<Vec<f32>>,
}

/// Summary of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    /// Collection name
    pub name: String,
    /// Distance metric fixed at creation
    pub metric: DistanceMetric,
    /// Embedding dimension, `None` while the collection is empty
    pub dimension: Option<usize>,
    /// Number of entries
    pub count: usize,
    /// Creation timestamp (microseconds since epoch)
    pub created_at: u64,
}
