//! Database: registry of named collections, in memory or on disk
//!
//! ## Modes
//!
//! - `Database::ephemeral()` keeps everything in process memory.
//! - `Database::open(dir)` creates `dir` if needed, loads every collection
//!   snapshot found there, and persists each mutation before it is applied.
//!
//! Collections are kept in a `BTreeMap` so listings are name-ordered.

use crate::backend::IndexBackendFactory;
use crate::collection::Collection;
use crate::error::{EngineError, EngineResult};
use crate::persist;
use crate::types::CollectionInfo;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_core::DistanceMetric;
use tracing::{debug, info, warn};

/// Longest accepted collection name in bytes
pub const MAX_COLLECTION_NAME_LEN: usize = 255;

struct DatabaseInner {
    data_dir: Option<PathBuf>,
    factory: IndexBackendFactory,
    collections: RwLock<BTreeMap<String, Collection>>,
}

/// Embedded vector database
///
/// Cheap to clone; clones share the same collections.
///
/// # Example
///
/// ```
/// use strata_engine::{Database, Record};
/// use strata_core::DistanceMetric;
///
/// let db = Database::ephemeral();
/// let docs = db.create_collection("docs", DistanceMetric::Cosine).unwrap();
/// docs.add(vec![Record::new("a", vec![1.0, 0.0], "hello")]).unwrap();
/// assert_eq!(docs.count(None).unwrap(), 1);
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let collections = self.inner.collections.read();
        f.debug_struct("Database")
            .field("data_dir", &self.inner.data_dir)
            .field("factory", &self.inner.factory)
            .field("collections", &collections.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Database {
    /// In-memory database; nothing survives the process
    pub fn ephemeral() -> Self {
        debug!("Opened ephemeral database");
        Database {
            inner: Arc::new(DatabaseInner {
                data_dir: None,
                factory: IndexBackendFactory::default(),
                collections: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    /// Open (or create) a persistent database rooted at `path`
    ///
    /// ## Errors
    /// - `Io` if the directory cannot be created or read
    /// - `Serialization` if a snapshot is unreadable or two snapshots claim
    ///   the same collection
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let dir = path.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        if !dir.is_dir() {
            return Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{} is not a directory", dir.display()),
            )));
        }

        let factory = IndexBackendFactory::default();
        let mut collections = BTreeMap::new();
        for snapshot_path in persist::list_snapshots(&dir)? {
            let snapshot = persist::read_snapshot(&snapshot_path)?;
            let name = snapshot.name.clone();
            if collections.contains_key(&name) {
                return Err(EngineError::Serialization(format!(
                    "collection '{name}' appears in more than one snapshot"
                )));
            }
            if persist::snapshot_path(&dir, &name) != snapshot_path {
                warn!(
                    collection = %name,
                    path = %snapshot_path.display(),
                    "Snapshot file name does not match collection name"
                );
            }
            collections.insert(name, Collection::restore(snapshot, factory, dir.clone()));
        }

        info!(
            path = %dir.display(),
            collections = collections.len(),
            "Opened database"
        );
        Ok(Database {
            inner: Arc::new(DatabaseInner {
                data_dir: Some(dir),
                factory,
                collections: RwLock::new(collections),
            }),
        })
    }

    /// True if nothing is written to disk
    pub fn is_ephemeral(&self) -> bool {
        self.inner.data_dir.is_none()
    }

    /// Data directory of a persistent database
    pub fn data_dir(&self) -> Option<&Path> {
        self.inner.data_dir.as_deref()
    }

    /// Create a new, empty collection
    ///
    /// ## Errors
    /// - `InvalidCollectionName` if the name is unusable
    /// - `CollectionAlreadyExists` if the name is taken
    pub fn create_collection(&self, name: &str, metric: DistanceMetric) -> EngineResult<Collection> {
        validate_collection_name(name)?;

        let mut collections = self.inner.collections.write();
        if collections.contains_key(name) {
            return Err(EngineError::CollectionAlreadyExists {
                name: name.to_string(),
            });
        }
        let collection = Collection::create(
            name.to_string(),
            metric,
            self.inner.factory,
            self.inner.data_dir.clone(),
        )?;
        collections.insert(name.to_string(), collection.clone());

        info!(collection = name, metric = %metric, "Created collection");
        Ok(collection)
    }

    /// Look up an existing collection
    ///
    /// ## Errors
    /// - `CollectionNotFound` if no collection has this name
    pub fn get_collection(&self, name: &str) -> EngineResult<Collection> {
        self.inner
            .collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::CollectionNotFound {
                name: name.to_string(),
            })
    }

    /// Return the named collection, creating it if absent
    ///
    /// An existing collection keeps its own metric; a differing `metric`
    /// argument is logged and ignored.
    pub fn get_or_create_collection(
        &self,
        name: &str,
        metric: DistanceMetric,
    ) -> EngineResult<Collection> {
        if let Ok(existing) = self.get_collection(name) {
            if existing.metric() != metric {
                warn!(
                    collection = name,
                    existing = %existing.metric(),
                    requested = %metric,
                    "Collection exists with a different metric; keeping existing"
                );
            }
            return Ok(existing);
        }
        match self.create_collection(name, metric) {
            // Lost a race with another creator
            Err(EngineError::CollectionAlreadyExists { .. }) => self.get_collection(name),
            other => other,
        }
    }

    /// True if the collection exists
    pub fn collection_exists(&self, name: &str) -> bool {
        self.inner.collections.read().contains_key(name)
    }

    /// Drop a collection and its snapshot
    ///
    /// Outstanding handles to the collection start returning
    /// `CollectionNotFound`.
    pub fn delete_collection(&self, name: &str) -> EngineResult<()> {
        let mut collections = self.inner.collections.write();
        let collection = collections
            .remove(name)
            .ok_or_else(|| EngineError::CollectionNotFound {
                name: name.to_string(),
            })?;
        collection.mark_dropped();
        if let Some(dir) = &self.inner.data_dir {
            persist::remove_snapshot(dir, name)?;
        }

        info!(collection = name, "Deleted collection");
        Ok(())
    }

    /// Summaries of all collections, ordered by name
    pub fn list_collections(&self) -> Vec<CollectionInfo> {
        self.inner
            .collections
            .read()
            .values()
            .map(Collection::info)
            .collect()
    }
}

/// Check that a name can be used as a collection (and snapshot file) name
pub fn validate_collection_name(name: &str) -> EngineResult<()> {
    let reason = if name.is_empty() {
        Some("name cannot be empty")
    } else if name.len() > MAX_COLLECTION_NAME_LEN {
        Some("name exceeds 255 bytes")
    } else if name.contains(['/', '\\', '\0']) {
        Some("name cannot contain path separators or NUL")
    } else if name.starts_with('.') {
        Some("name cannot start with '.'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(EngineError::InvalidCollectionName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
