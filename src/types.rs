//! Public value types for the document store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_core::{metadata_from_json, Metadata, MetadataValue};
use strata_engine::{QueryHit, Record};

use crate::error::Result;

/// Metadata key consulted when an entry's content is empty
pub const CONTENT_METADATA_KEY: &str = "content";

/// One stored item: id, content, embedding and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Unique id within the collection
    pub document_id: String,
    /// Document text
    pub content: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Flat metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl VectorEntry {
    /// Entry with empty metadata
    pub fn new(
        document_id: impl Into<String>,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        VectorEntry {
            document_id: document_id.into(),
            content: content.into(),
            embedding,
            metadata: Metadata::new(),
        }
    }

    /// Replace the metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Replace the metadata from a JSON object
    ///
    /// ## Errors
    /// - `InvalidMetadata` for nested objects, nulls or mixed lists
    pub fn with_metadata_json(self, metadata: &Value) -> Result<Self> {
        Ok(self.with_metadata(metadata_from_json(metadata)?))
    }

    pub(crate) fn into_record(self) -> Record {
        Record::new(self.document_id, self.embedding, self.content).with_metadata(self.metadata)
    }
}

impl From<Record> for VectorEntry {
    fn from(record: Record) -> Self {
        VectorEntry {
            content: resolve_content(record.document, &record.metadata),
            document_id: record.id,
            embedding: record.embedding,
            metadata: record.metadata,
        }
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Entry id
    pub document_id: String,
    /// Document text
    pub content: String,
    /// Flat metadata
    pub metadata: Metadata,
    /// Similarity in `[0, 1]`, higher is closer
    pub score: f32,
    /// Embedding, only when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl SearchResult {
    pub(crate) fn from_hit(hit: QueryHit, score: f32) -> Self {
        SearchResult {
            content: resolve_content(hit.document, &hit.metadata),
            document_id: hit.id,
            metadata: hit.metadata,
            score,
            embedding: hit.embedding,
        }
    }

    pub(crate) fn from_record(record: Record, score: f32) -> Self {
        SearchResult {
            content: resolve_content(record.document, &record.metadata),
            document_id: record.id,
            metadata: record.metadata,
            score,
            embedding: Some(record.embedding),
        }
    }
}

/// Options for similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Maximum number of results
    pub limit: usize,
    /// Drop results scoring below this
    pub threshold: Option<f32>,
    /// JSON filter expression
    pub filter: Option<Value>,
    /// Return embeddings with each hit
    pub include_embeddings: bool,
}

/// Default number of search results
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            limit: DEFAULT_SEARCH_LIMIT,
            threshold: None,
            filter: None,
            include_embeddings: false,
        }
    }
}

impl SearchOptions {
    /// Defaults: top 10, no threshold, no filter, no embeddings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result limit
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the minimum score
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Set the filter
    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Include embeddings in results
    pub fn include_embeddings(mut self, include: bool) -> Self {
        self.include_embeddings = include;
        self
    }
}

/// Collection statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of stored entries
    pub total_vectors: usize,
    /// Embedding dimension, 0 when empty
    pub vector_dimension: usize,
    /// Approximate bytes used
    pub storage_size_bytes: u64,
    /// Index descriptor reported by the engine
    pub index_type: String,
}

/// Input document for the embedding pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id
    pub id: String,
    /// Text to embed
    pub content: String,
    /// Flat metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Document with empty metadata
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Document {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Replace the metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Stored content, falling back to a `content` metadata string when empty
fn resolve_content(document: String, metadata: &Metadata) -> String {
    if !document.is_empty() {
        return document;
    }
    match metadata
        .get(CONTENT_METADATA_KEY)
        .and_then(MetadataValue::as_scalar)
        .and_then(|s| s.as_str())
    {
        Some(text) => text.to_string(),
        None => document,
    }
}
