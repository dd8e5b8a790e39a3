//! Collection: a named set of vectors sharing one metric and dimension
//!
//! ## Write path
//!
//! Every mutation validates the whole batch first, then (for persistent
//! databases) writes the post-mutation snapshot, and only then applies the
//! change in memory. A failed validation or a failed write leaves the
//! collection untouched.
//!
//! ## Thread Safety
//!
//! `Collection` is a cheap handle (`Arc<RwLock<..>>`). Clones share state.
//! Reads take the read lock; writes hold the write lock across the snapshot
//! write so concurrent writers serialize.

use crate::backend::{IndexBackendFactory, VectorIndexBackend};
use crate::error::{EngineError, EngineResult};
use crate::filter::Where;
use crate::persist::{self, EntryRef, Snapshot, SnapshotRef, SNAPSHOT_VERSION};
use crate::types::{CollectionInfo, QueryHit, Record, VectorId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use strata_core::{validate_metadata, DistanceMetric, Metadata};
use tracing::debug;

struct Row {
    key: String,
    document: String,
    metadata: Metadata,
}

pub(crate) struct CollectionState {
    name: String,
    metric: DistanceMetric,
    created_at: u64,
    next_id: u64,
    keys: BTreeMap<String, VectorId>,
    rows: BTreeMap<VectorId, Row>,
    backend: Box<dyn VectorIndexBackend>,
    dropped: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Add,
    Upsert,
}

impl CollectionState {
    fn new(name: String, metric: DistanceMetric, created_at: u64, factory: IndexBackendFactory) -> Self {
        CollectionState {
            name,
            metric,
            created_at,
            next_id: 0,
            keys: BTreeMap::new(),
            rows: BTreeMap::new(),
            backend: factory.create(metric),
            dropped: false,
        }
    }

    fn insert_record(&mut self, record: Record) {
        self.remove_key(&record.id);

        let vid = VectorId(self.next_id);
        self.next_id += 1;
        self.backend.insert(vid, &record.embedding);
        self.keys.insert(record.id.clone(), vid);
        self.rows.insert(
            vid,
            Row {
                key: record.id,
                document: record.document,
                metadata: record.metadata,
            },
        );
    }

    fn remove_key(&mut self, key: &str) -> bool {
        match self.keys.remove(key) {
            Some(vid) => {
                self.rows.remove(&vid);
                self.backend.delete(vid);
                true
            }
            None => false,
        }
    }

    fn record(&self, vid: VectorId, row: &Row) -> Record {
        Record {
            id: row.key.clone(),
            embedding: self.embedding(vid),
            document: row.document.clone(),
            metadata: row.metadata.clone(),
        }
    }

    fn embedding(&self, vid: VectorId) -> Vec<f32> {
        self.backend.get(vid).map(<[f32]>::to_vec).unwrap_or_default()
    }

    fn validate_batch(&self, records: &[Record], mode: WriteMode) -> EngineResult<()> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut replaced = 0usize;

        for record in records {
            if record.embedding.is_empty() {
                return Err(EngineError::EmptyEmbedding {
                    id: record.id.clone(),
                });
            }
            validate_metadata(&record.metadata).map_err(|source| EngineError::InvalidMetadata {
                id: record.id.clone(),
                source,
            })?;
            if !seen.insert(record.id.as_str()) {
                return Err(EngineError::DuplicateId {
                    id: record.id.clone(),
                });
            }
            if self.keys.contains_key(&record.id) {
                match mode {
                    WriteMode::Add => {
                        return Err(EngineError::DuplicateId {
                            id: record.id.clone(),
                        })
                    }
                    WriteMode::Upsert => replaced += 1,
                }
            }
        }

        // Existing entries pin the dimension unless the batch replaces all of them
        let remaining = self.keys.len() - replaced;
        let expected = if remaining > 0 {
            self.backend.dimension()
        } else {
            None
        };
        let expected = match (expected, records.first()) {
            (Some(d), _) => d,
            (None, Some(first)) => first.embedding.len(),
            (None, None) => return Ok(()),
        };
        for record in records {
            if record.embedding.len() != expected {
                return Err(EngineError::DimensionMismatch {
                    expected,
                    got: record.embedding.len(),
                });
            }
        }
        Ok(())
    }

    fn matches(&self, vid: VectorId, filter: Option<&Where>) -> bool {
        match (filter, self.rows.get(&vid)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(f), Some(row)) => f.matches(&row.metadata),
        }
    }
}

/// Handle to a collection
#[derive(Clone)]
pub struct Collection {
    state: Arc<RwLock<CollectionState>>,
    data_dir: Option<PathBuf>,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Collection")
            .field("name", &state.name)
            .field("metric", &state.metric)
            .field("dimension", &state.backend.dimension())
            .field("count", &state.keys.len())
            .field("index", &state.backend.name())
            .field("data_dir", &self.data_dir)
            .field("dropped", &state.dropped)
            .finish()
    }
}

impl Collection {
    pub(crate) fn create(
        name: String,
        metric: DistanceMetric,
        factory: IndexBackendFactory,
        data_dir: Option<PathBuf>,
    ) -> EngineResult<Self> {
        let collection = Collection {
            state: Arc::new(RwLock::new(CollectionState::new(
                name,
                metric,
                now_micros(),
                factory,
            ))),
            data_dir,
        };
        {
            let state = collection.state.read();
            collection.persist_with(&state, &HashSet::new(), &[])?;
        }
        Ok(collection)
    }

    pub(crate) fn restore(
        snapshot: Snapshot,
        factory: IndexBackendFactory,
        data_dir: PathBuf,
    ) -> Self {
        let mut state =
            CollectionState::new(snapshot.name, snapshot.metric, snapshot.created_at, factory);
        for entry in snapshot.entries {
            state.insert_record(Record {
                id: entry.id,
                embedding: entry.embedding,
                document: entry.document,
                metadata: entry.metadata,
            });
        }
        Collection {
            state: Arc::new(RwLock::new(state)),
            data_dir: Some(data_dir),
        }
    }

    pub(crate) fn mark_dropped(&self) {
        self.state.write().dropped = true;
    }

    /// Collection name
    pub fn name(&self) -> String {
        self.state.read().name.clone()
    }

    /// Distance metric fixed at creation
    pub fn metric(&self) -> DistanceMetric {
        self.state.read().metric
    }

    /// Embedding dimension, `None` while empty
    pub fn dimension(&self) -> Option<usize> {
        self.state.read().backend.dimension()
    }

    /// Name of the index backend (`brute_force`)
    pub fn index_type(&self) -> &'static str {
        self.state.read().backend.name()
    }

    /// Collection summary
    pub fn info(&self) -> CollectionInfo {
        let state = self.state.read();
        CollectionInfo {
            name: state.name.clone(),
            metric: state.metric,
            dimension: state.backend.dimension(),
            count: state.keys.len(),
            created_at: state.created_at,
        }
    }

    /// Insert new entries
    ///
    /// The batch is all-or-nothing.
    ///
    /// ## Errors
    /// - `DuplicateId` if an id already exists or repeats within the batch
    /// - `EmptyEmbedding`, `DimensionMismatch`, `InvalidMetadata` on bad input
    /// - `Io` / `Serialization` if the snapshot write fails
    pub fn add(&self, records: Vec<Record>) -> EngineResult<()> {
        self.write(records, WriteMode::Add)
    }

    /// Insert or replace entries
    ///
    /// A replaced entry moves to the end of insertion order.
    pub fn upsert(&self, records: Vec<Record>) -> EngineResult<()> {
        self.write(records, WriteMode::Upsert)
    }

    fn write(&self, records: Vec<Record>, mode: WriteMode) -> EngineResult<()> {
        let mut state = self.state.write();
        self.check_live(&state)?;
        if records.is_empty() {
            return Ok(());
        }
        state.validate_batch(&records, mode)?;

        {
            let removed: HashSet<&str> = match mode {
                WriteMode::Add => HashSet::new(),
                WriteMode::Upsert => records
                    .iter()
                    .filter(|r| state.keys.contains_key(&r.id))
                    .map(|r| r.id.as_str())
                    .collect(),
            };
            self.persist_with(&state, &removed, &records)?;
        }

        let count = records.len();
        for record in records {
            state.insert_record(record);
        }
        debug!(collection = %state.name, count, upsert = (mode == WriteMode::Upsert), "Wrote entries");
        Ok(())
    }

    /// Delete entries by id, returning how many existed
    pub fn delete(&self, ids: &[String]) -> EngineResult<usize> {
        let mut state = self.state.write();
        self.check_live(&state)?;

        let removed: HashSet<&str> = ids
            .iter()
            .filter(|id| state.keys.contains_key(id.as_str()))
            .map(String::as_str)
            .collect();
        if removed.is_empty() {
            return Ok(0);
        }
        self.persist_with(&state, &removed, &[])?;

        let count = removed.len();
        for id in removed {
            state.remove_key(id);
        }
        debug!(collection = %state.name, count, "Deleted entries");
        Ok(count)
    }

    /// Fetch one entry by id
    pub fn get_by_id(&self, id: &str) -> EngineResult<Option<Record>> {
        let state = self.state.read();
        self.check_live(&state)?;
        Ok(state.keys.get(id).and_then(|vid| {
            state
                .rows
                .get(vid)
                .map(|row| state.record(*vid, row))
        }))
    }

    /// Fetch entries in insertion order
    ///
    /// `ids` restricts to the given ids (missing ids are skipped), `filter`
    /// restricts by metadata, `limit` caps the result after filtering.
    pub fn get(
        &self,
        ids: Option<&[String]>,
        filter: Option<&Where>,
        limit: Option<usize>,
    ) -> EngineResult<Vec<Record>> {
        let state = self.state.read();
        self.check_live(&state)?;

        let wanted: Option<HashSet<&str>> = ids.map(|ids| ids.iter().map(String::as_str).collect());
        let limit = limit.unwrap_or(usize::MAX);

        Ok(state
            .rows
            .iter()
            .filter(|(_, row)| {
                wanted
                    .as_ref()
                    .map(|w| w.contains(row.key.as_str()))
                    .unwrap_or(true)
            })
            .filter(|(_, row)| filter.map(|f| f.matches(&row.metadata)).unwrap_or(true))
            .take(limit)
            .map(|(vid, row)| state.record(*vid, row))
            .collect())
    }

    /// Count entries, optionally restricted by a filter
    pub fn count(&self, filter: Option<&Where>) -> EngineResult<usize> {
        let state = self.state.read();
        self.check_live(&state)?;
        Ok(match filter {
            None => state.keys.len(),
            Some(f) => state.rows.values().filter(|r| f.matches(&r.metadata)).count(),
        })
    }

    /// k-nearest-neighbour search
    ///
    /// The filter is applied before ranking. An empty collection yields no
    /// hits regardless of the query's length.
    ///
    /// ## Errors
    /// - `DimensionMismatch` if the query length differs from the collection
    pub fn query(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&Where>,
        include_embeddings: bool,
    ) -> EngineResult<Vec<QueryHit>> {
        let state = self.state.read();
        self.check_live(&state)?;

        let Some(dimension) = state.backend.dimension() else {
            return Ok(Vec::new());
        };
        if embedding.len() != dimension {
            return Err(EngineError::DimensionMismatch {
                expected: dimension,
                got: embedding.len(),
            });
        }

        let accept = |vid: VectorId| state.matches(vid, filter);
        let hits = state.backend.search(embedding, k, &accept);

        Ok(hits
            .into_iter()
            .filter_map(|(vid, distance)| {
                state.rows.get(&vid).map(|row| QueryHit {
                    id: row.key.clone(),
                    distance,
                    document: row.document.clone(),
                    metadata: row.metadata.clone(),
                    embedding: include_embeddings.then(|| state.embedding(vid)),
                })
            })
            .collect())
    }

    /// Storage footprint in bytes
    ///
    /// Snapshot size for persistent collections, an in-memory estimate
    /// otherwise.
    pub fn storage_size_bytes(&self) -> u64 {
        let state = self.state.read();
        match &self.data_dir {
            Some(dir) => persist::snapshot_size(dir, &state.name),
            None => {
                let rows: usize = state
                    .rows
                    .values()
                    .map(|r| r.key.len() + r.document.len() + estimate_metadata(&r.metadata))
                    .sum();
                (rows + state.backend.memory_bytes()) as u64
            }
        }
    }

    fn check_live(&self, state: &CollectionState) -> EngineResult<()> {
        if state.dropped {
            Err(EngineError::CollectionNotFound {
                name: state.name.clone(),
            })
        } else {
            Ok(())
        }
    }

    fn persist_with(
        &self,
        state: &CollectionState,
        removed: &HashSet<&str>,
        added: &[Record],
    ) -> EngineResult<()> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };

        let mut entries: Vec<EntryRef<'_>> = state
            .rows
            .iter()
            .filter(|(_, row)| !removed.contains(row.key.as_str()))
            .map(|(vid, row)| EntryRef {
                id: &row.key,
                embedding: state.backend.get(*vid).unwrap_or(&[]),
                document: &row.document,
                metadata: &row.metadata,
            })
            .collect();
        entries.extend(added.iter().map(|r| EntryRef {
            id: &r.id,
            embedding: &r.embedding,
            document: &r.document,
            metadata: &r.metadata,
        }));

        persist::write_snapshot(
            dir,
            &SnapshotRef {
                version: SNAPSHOT_VERSION,
                name: &state.name,
                metric: state.metric,
                created_at: state.created_at,
                entries,
            },
        )?;
        Ok(())
    }
}

fn estimate_metadata(metadata: &Metadata) -> usize {
    metadata
        .iter()
        .map(|(k, v)| {
            k.len()
                + v.scalars()
                    .map(|s| s.as_str().map(str::len).unwrap_or(8))
                    .sum::<usize>()
        })
        .sum()
}

/// Current time in microseconds since Unix epoch
fn now_micros() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
