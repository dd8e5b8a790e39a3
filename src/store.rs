//! The document store facade.
//!
//! `DocumentStore` shapes document-level requests into calls on one engine
//! collection and maps the engine's answers back:
//!
//! - JSON filters are translated before any engine call, so a bad filter
//!   never reaches the engine.
//! - Engine distances become similarity scores in `[0, 1]`.
//! - Engine failures surface as `Error::Storage`, except `delete_vector`,
//!   which reports failure as `false`.
//!
//! ## Thread Safety
//!
//! `DocumentStore` is `Send + Sync`. All operations take `&self` and block
//! until the engine call returns.

use crate::config::{ResolvedConfig, StoreOptions};
use crate::embedder::{EmbedError, Embedder};
use crate::error::{Error, Result};
use crate::filter::translate_json;
use crate::stats::{ProcessingStats, StatsRecorder};
use crate::types::{Document, SearchOptions, SearchResult, StoreStats, VectorEntry};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use strata_core::{validate_metadata, DistanceMetric};
use strata_engine::{Collection, Database, EngineError, Record, Where};
use tracing::{debug, info, warn};

/// `get_all_vectors` logs a warning above this many entries
pub const LARGE_DUMP_WARNING_THRESHOLD: usize = 10_000;

/// Default result cap for `search_by_metadata`
pub const DEFAULT_METADATA_SEARCH_LIMIT: usize = 100;

/// Convert an engine distance into a similarity score in `[0, 1]`
///
/// | Metric | Engine distance `d` | Score |
/// |--------|---------------------|-------|
/// | cosine | `1 - cos` in `[0, 2]` | `1 - d/2` |
/// | l2 | squared euclidean | `1 / (1 + d)` |
/// | ip | `1 - dot` | `(dot + 1) / 2` |
///
/// NaN distances score 0.
pub fn distance_to_score(metric: DistanceMetric, distance: f32) -> f32 {
    let score = match metric {
        DistanceMetric::Cosine => 1.0 - distance / 2.0,
        DistanceMetric::Euclidean => 1.0 / (1.0 + distance.max(0.0)),
        DistanceMetric::InnerProduct => {
            let dot = 1.0 - distance;
            (dot + 1.0) / 2.0
        }
    };
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Document-oriented vector store over one engine collection
///
/// # Example
///
/// ```ignore
/// use refinire_rag_strata::prelude::*;
///
/// let store = DocumentStore::builder()
///     .collection_name("papers")
///     .distance_metric("cosine")
///     .open()?;
///
/// store.add_vector(VectorEntry::new("doc1", "Rust ownership", vec![0.1, 0.9]))?;
/// let hits = store.search_similar(
///     &[0.1, 0.8],
///     &SearchOptions::new().limit(5).filter(json!({"year": {"$gte": 2020}})),
/// )?;
/// ```
pub struct DocumentStore {
    config: ResolvedConfig,
    db: Database,
    collection: RwLock<Collection>,
    embedder: Mutex<Option<Arc<dyn Embedder>>>,
    stats: StatsRecorder,
}

impl DocumentStore {
    /// Builder over explicit options
    pub fn builder() -> StoreOptions {
        StoreOptions::new()
    }

    /// Resolve `options` against the process environment and open the store
    pub fn new(options: StoreOptions) -> Result<Self> {
        options.open()
    }

    /// Open the store from an already resolved configuration
    ///
    /// ## Errors
    /// - `Storage` if the engine cannot open, or if the collection is missing
    ///   and `auto_create_collection` is off
    pub fn from_config(config: ResolvedConfig) -> Result<Self> {
        let db = match &config.persist_directory {
            Some(dir) => Database::open(dir)?,
            None => Database::ephemeral(),
        };

        let name = config.collection_name.as_str();
        let collection = match db.get_collection(name) {
            Ok(existing) => existing,
            Err(EngineError::CollectionNotFound { .. }) if config.auto_create_collection => {
                db.create_collection(name, config.distance_metric)?
            }
            Err(EngineError::CollectionNotFound { .. }) => {
                return Err(Error::Storage(format!(
                    "collection '{name}' does not exist and auto_create_collection is disabled"
                )))
            }
            Err(e) => return Err(e.into()),
        };
        if collection.metric() != config.distance_metric {
            warn!(
                collection = name,
                existing = %collection.metric(),
                configured = %config.distance_metric,
                "Collection was created with a different metric; using the existing one"
            );
        }

        let store = DocumentStore {
            db,
            collection: RwLock::new(collection),
            embedder: Mutex::new(None),
            stats: StatsRecorder::default(),
            config,
        };
        if store.config.auto_clear_on_init {
            store.clear()?;
        }

        info!(
            collection = %store.config.collection_name,
            metric = %store.metric(),
            persist_directory = ?store.config.persist_directory,
            "Initialized document store"
        );
        Ok(store)
    }

    /// The resolved configuration
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Metric of the underlying collection
    pub fn metric(&self) -> DistanceMetric {
        self.collection().metric()
    }

    fn collection(&self) -> Collection {
        self.collection.read().clone()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Store one entry, returning its id
    ///
    /// ## Errors
    /// - `InvalidMetadata` for unsupported metadata values
    /// - `Storage` for duplicate ids, dimension mismatches and engine failures
    pub fn add_vector(&self, entry: VectorEntry) -> Result<String> {
        let started = Instant::now();
        let id = entry.document_id.clone();
        self.track(|| {
            validate_metadata(&entry.metadata)?;
            let collection = self.collection();
            let record = entry.into_record();
            collection.add(vec![record])?;
            Ok(())
        })?;

        self.stats.stored(1, started.elapsed());
        debug!(document_id = %id, "Stored vector");
        Ok(id)
    }

    /// Store many entries, returning their ids in input order
    ///
    /// The whole batch is validated up front, then written in chunks of
    /// `batch_size`. If a chunk fails after earlier chunks were written, the
    /// error is `PartialBatch` and names the committed ids.
    pub fn add_vectors(&self, entries: Vec<VectorEntry>) -> Result<Vec<String>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let collection = self.collection();
        self.track(|| validate_batch(&collection, &entries))?;

        let records: Vec<Record> = entries.into_iter().map(VectorEntry::into_record).collect();
        let ids = self.write_chunks(&collection, records, started)?;
        debug!(count = ids.len(), "Stored vectors");
        Ok(ids)
    }

    /// Write `records` in `batch_size` chunks, reporting committed ids on failure
    fn write_chunks(
        &self,
        collection: &Collection,
        records: Vec<Record>,
        started: Instant,
    ) -> Result<Vec<String>> {
        let total = records.len();
        let mut committed: Vec<String> = Vec::with_capacity(total);

        for chunk in records.chunks(self.config.batch_size) {
            if let Err(e) = collection.add(chunk.to_vec()) {
                self.stats.error();
                self.stats.stored(committed.len(), started.elapsed());
                if committed.is_empty() {
                    return Err(e.into());
                }
                warn!(
                    committed = committed.len(),
                    total,
                    error = %e,
                    "Batch insert failed part way"
                );
                return Err(Error::PartialBatch {
                    committed,
                    message: e.to_string(),
                });
            }
            committed.extend(chunk.iter().map(|r| r.id.clone()));
        }

        self.stats.stored(total, started.elapsed());
        Ok(committed)
    }

    /// Replace an entry's embedding, metadata and content
    ///
    /// Writes the entry if it does not exist yet.
    pub fn update_vector(&self, entry: VectorEntry) -> Result<bool> {
        let started = Instant::now();
        let id = entry.document_id.clone();
        self.track(|| {
            validate_metadata(&entry.metadata)?;
            let collection = self.collection();
            let record = entry.into_record();
            collection.upsert(vec![record])?;
            Ok(())
        })?;

        self.stats.stored(1, started.elapsed());
        debug!(document_id = %id, "Updated vector");
        Ok(true)
    }

    /// Delete an entry
    ///
    /// Returns `false` if the id does not exist or the engine fails; never
    /// returns an error.
    pub fn delete_vector(&self, document_id: &str) -> bool {
        let ids = [document_id.to_string()];
        match self.collection().delete(&ids) {
            Ok(deleted) => {
                debug!(document_id, deleted = deleted > 0, "Delete vector");
                deleted > 0
            }
            Err(e) => {
                self.stats.error();
                warn!(document_id, error = %e, "Delete failed");
                false
            }
        }
    }

    /// Drop every entry by recreating the collection
    ///
    /// The collection keeps its metric.
    pub fn clear(&self) -> Result<bool> {
        let mut slot = self.collection.write();
        let name = self.config.collection_name.as_str();
        let metric = slot.metric();

        match self.db.delete_collection(name) {
            Ok(()) | Err(EngineError::CollectionNotFound { .. }) => {}
            Err(e) => {
                self.stats.error();
                return Err(e.into());
            }
        }
        *slot = self.db.create_collection(name, metric).map_err(|e| {
            self.stats.error();
            Error::from(e)
        })?;

        info!(collection = name, "Cleared collection");
        Ok(true)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Fetch one entry; `None` if absent
    pub fn get_vector(&self, document_id: &str) -> Result<Option<VectorEntry>> {
        let started = Instant::now();
        let record = self.track(|| Ok(self.collection().get_by_id(document_id)?))?;
        self.stats
            .retrieved(usize::from(record.is_some()), started.elapsed());
        Ok(record.map(VectorEntry::from))
    }

    /// Count entries, optionally restricted by a JSON filter
    pub fn count_vectors(&self, filter: Option<&Value>) -> Result<usize> {
        self.track(|| {
            let filter = translate_json(filter)?;
            Ok(self.collection().count(filter.as_ref())?)
        })
    }

    /// Every entry in insertion order
    ///
    /// Materializes the whole collection; logs a warning above
    /// [`LARGE_DUMP_WARNING_THRESHOLD`] entries.
    pub fn get_all_vectors(&self) -> Result<Vec<VectorEntry>> {
        let started = Instant::now();
        let records = self.track(|| {
            let collection = self.collection();
            let count = collection.count(None)?;
            if count > LARGE_DUMP_WARNING_THRESHOLD {
                warn!(
                    count,
                    threshold = LARGE_DUMP_WARNING_THRESHOLD,
                    "Dumping a large collection; consider filtered reads"
                );
            }
            Ok(collection.get(None, None, None)?)
        })?;

        self.stats.retrieved(records.len(), started.elapsed());
        Ok(records.into_iter().map(VectorEntry::from).collect())
    }

    /// Collection statistics
    pub fn get_stats(&self) -> Result<StoreStats> {
        self.track(|| {
            let collection = self.collection();
            Ok(StoreStats {
                total_vectors: collection.count(None)?,
                vector_dimension: collection.dimension().unwrap_or(0),
                storage_size_bytes: collection.storage_size_bytes(),
                index_type: collection.index_type().to_string(),
            })
        })
    }

    // ========================================================================
    // Searches
    // ========================================================================

    /// Nearest entries to `query`, best first
    ///
    /// ## Errors
    /// - `InvalidFilter` if `options.filter` is malformed (no engine call)
    /// - `Storage` on a dimension mismatch or engine failure
    pub fn search_similar(
        &self,
        query: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let started = Instant::now();
        let results = self.track(|| {
            let filter = translate_json(options.filter.as_ref())?;
            self.query(query, options.limit, filter.as_ref(), options, None)
        })?;

        self.stats.searched(results.len(), started.elapsed());
        debug!(hits = results.len(), limit = options.limit, "Similarity search");
        Ok(results)
    }

    /// Nearest entries to an existing entry, excluding the entry itself
    ///
    /// Returns an empty list if `document_id` does not exist.
    pub fn search_similar_to_document(
        &self,
        document_id: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let started = Instant::now();
        let results = self.track(|| {
            let filter = translate_json(options.filter.as_ref())?;
            let Some(seed) = self.collection().get_by_id(document_id)? else {
                debug!(document_id, "Seed document not found");
                return Ok(Vec::new());
            };
            self.query(
                &seed.embedding,
                options.limit.saturating_add(1),
                filter.as_ref(),
                options,
                Some(document_id),
            )
        })?;

        self.stats.searched(results.len(), started.elapsed());
        Ok(results)
    }

    /// Entries matching a JSON filter, without similarity ranking
    ///
    /// Every result has score `1.0` and carries its embedding. `limit`
    /// defaults to [`DEFAULT_METADATA_SEARCH_LIMIT`].
    pub fn search_by_metadata(
        &self,
        filter: &Value,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let started = Instant::now();
        let limit = limit.unwrap_or(DEFAULT_METADATA_SEARCH_LIMIT);
        let records = self.track(|| {
            let filter = translate_json(Some(filter))?;
            Ok(self.collection().get(None, filter.as_ref(), Some(limit))?)
        })?;

        self.stats.searched(records.len(), started.elapsed());
        Ok(records
            .into_iter()
            .map(|r| SearchResult::from_record(r, 1.0))
            .collect())
    }

    fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&Where>,
        options: &SearchOptions,
        exclude: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let collection = self.collection();
        let metric = collection.metric();
        let hits = collection.query(embedding, k, filter, options.include_embeddings)?;

        Ok(hits
            .into_iter()
            .filter(|hit| Some(hit.id.as_str()) != exclude)
            .map(|hit| {
                let score = distance_to_score(metric, hit.distance);
                SearchResult::from_hit(hit, score)
            })
            .filter(|r| options.threshold.map_or(true, |t| r.score >= t))
            .take(options.limit)
            .collect())
    }

    // ========================================================================
    // Embedding pipeline
    // ========================================================================

    /// Install the embedding model used by [`process`](Self::process)
    pub fn set_embedder(&self, embedder: Arc<dyn Embedder>) {
        *self.embedder.lock() = Some(embedder);
        debug!("Embedder configured");
    }

    /// True once an embedder is installed
    pub fn has_embedder(&self) -> bool {
        self.embedder.lock().is_some()
    }

    /// Embed and store documents, yielding each stored entry
    ///
    /// Work happens lazily as the iterator is consumed. A document whose
    /// embedding fails yields `Error::Embedding` and processing continues
    /// with the next one.
    ///
    /// An embedder that declares its [`dimension`](Embedder::dimension) is
    /// held to it: an embedding of another length is reported as
    /// `Error::Embedding` and not stored.
    ///
    /// ## Errors
    /// - `EmbedderNotSet` immediately if no embedder is installed
    /// - `Storage` immediately if the embedder's declared dimension differs
    ///   from the collection's
    pub fn process<'a, I>(
        &'a self,
        documents: I,
    ) -> Result<impl Iterator<Item = Result<VectorEntry>> + 'a>
    where
        I: IntoIterator<Item = Document>,
        I::IntoIter: 'a,
    {
        let embedder = self.embedder.lock().clone().ok_or(Error::EmbedderNotSet)?;
        let declared = embedder.dimension();
        if let (Some(declared), Some(existing)) = (declared, self.collection().dimension()) {
            if declared != existing {
                self.stats.error();
                return Err(Error::Storage(format!(
                    "embedder produces {declared}-dimensional vectors, collection holds {existing}"
                )));
            }
        }

        Ok(documents.into_iter().map(move |doc| {
            let embedded = embedder.embed(&doc.content).and_then(|embedding| match declared {
                Some(dim) if embedding.len() != dim => Err(EmbedError::new(format!(
                    "expected {dim} dimensions, got {}",
                    embedding.len()
                ))),
                _ => Ok(embedding),
            });
            let embedding = match embedded {
                Ok(embedding) => embedding,
                Err(e) => {
                    self.stats.embedding_error();
                    warn!(document_id = %doc.id, error = %e, "Embedding failed");
                    return Err(Error::Embedding {
                        document_id: doc.id,
                        message: e.to_string(),
                    });
                }
            };

            let entry = VectorEntry {
                document_id: doc.id,
                content: doc.content,
                embedding,
                metadata: doc.metadata,
            };
            self.add_vector(entry.clone())?;
            self.stats.processed();
            Ok(entry)
        }))
    }

    /// Snapshot of the processing counters
    pub fn processing_stats(&self) -> ProcessingStats {
        self.stats.snapshot()
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Count failures of `f` in the error statistic
    fn track<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        f().map_err(|e| {
            self.stats.error();
            e
        })
    }
}

/// Whole-batch checks run before any chunk is written
fn validate_batch(collection: &Collection, entries: &[VectorEntry]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        validate_metadata(&entry.metadata)
            .map_err(|e| Error::InvalidMetadata(format!("{}: {e}", entry.document_id)))?;
        if !seen.insert(entry.document_id.as_str()) {
            return Err(Error::Storage(format!(
                "duplicate id in batch: {}",
                entry.document_id
            )));
        }
        if entry.embedding.is_empty() {
            return Err(Error::Storage(format!(
                "empty embedding for id {}",
                entry.document_id
            )));
        }
    }

    let expected = collection
        .dimension()
        .unwrap_or_else(|| entries[0].embedding.len());
    if let Some(bad) = entries.iter().find(|e| e.embedding.len() != expected) {
        return Err(Error::Storage(format!(
            "dimension mismatch for id {}: expected {expected}, got {}",
            bad.document_id,
            bad.embedding.len()
        )));
    }

    let ids: Vec<String> = entries.iter().map(|e| e.document_id.clone()).collect();
    let existing = collection.get(Some(ids.as_slice()), None, None)?;
    if !existing.is_empty() {
        let taken: Vec<&str> = existing.iter().map(|r| r.id.as_str()).collect();
        return Err(Error::Storage(format!(
            "ids already exist: {}",
            taken.join(", ")
        )));
    }
    Ok(())
}
