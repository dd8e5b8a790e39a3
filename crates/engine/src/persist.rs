//! Collection snapshots on disk
//!
//! Each collection persists to `<data_dir>/<name>.snap`, a MessagePack
//! encoding of its configuration and every entry in insertion order.
//! Snapshots are written to a `.tmp` sibling, fsynced and renamed over the
//! previous file, so a crash leaves either the old or the new snapshot.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use strata_core::{DistanceMetric, Metadata};
use tracing::debug;

/// Snapshot format version
pub(crate) const SNAPSHOT_VERSION: u8 = 1;

const SNAPSHOT_EXT: &str = "snap";
const TMP_EXT: &str = "snap.tmp";

/// Borrowed view of an entry, written without cloning embeddings
#[derive(Serialize)]
pub(crate) struct EntryRef<'a> {
    pub id: &'a str,
    pub embedding: &'a [f32],
    pub document: &'a str,
    pub metadata: &'a Metadata,
}

#[derive(Serialize)]
pub(crate) struct SnapshotRef<'a> {
    pub version: u8,
    pub name: &'a str,
    pub metric: DistanceMetric,
    pub created_at: u64,
    pub entries: Vec<EntryRef<'a>>,
}

/// Owned entry read back from disk
#[derive(Debug, Deserialize)]
pub(crate) struct StoredEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Snapshot {
    pub version: u8,
    pub name: String,
    pub metric: DistanceMetric,
    pub created_at: u64,
    pub entries: Vec<StoredEntry>,
}

/// Path of a collection's snapshot
pub(crate) fn snapshot_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{SNAPSHOT_EXT}"))
}

/// Encode and atomically replace a collection snapshot
///
/// Returns the number of bytes written.
pub(crate) fn write_snapshot(dir: &Path, snapshot: &SnapshotRef<'_>) -> EngineResult<u64> {
    let bytes = rmp_serde::to_vec_named(snapshot)?;
    let target = snapshot_path(dir, snapshot.name);
    let tmp = dir.join(format!("{}.{TMP_EXT}", snapshot.name));

    {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, &target)?;

    debug!(
        collection = snapshot.name,
        entries = snapshot.entries.len(),
        bytes = bytes.len(),
        "Wrote collection snapshot"
    );
    Ok(bytes.len() as u64)
}

/// Decode a snapshot file
pub(crate) fn read_snapshot(path: &Path) -> EngineResult<Snapshot> {
    let bytes = fs::read(path)?;
    let snapshot: Snapshot = rmp_serde::from_slice(&bytes)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(EngineError::Serialization(format!(
            "unsupported snapshot version {} in {}",
            snapshot.version,
            path.display()
        )));
    }
    Ok(snapshot)
}

/// Remove a collection's snapshot if present
pub(crate) fn remove_snapshot(dir: &Path, name: &str) -> EngineResult<()> {
    match fs::remove_file(snapshot_path(dir, name)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Snapshot files in `dir`, sorted by path
///
/// Leftover `.tmp` files from interrupted writes are deleted.
pub(crate) fn list_snapshots(dir: &Path) -> EngineResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if file_name.ends_with(&format!(".{TMP_EXT}")) {
            debug!(path = %path.display(), "Removing interrupted snapshot write");
            fs::remove_file(&path)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXT) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Size of a snapshot on disk, 0 if missing
pub(crate) fn snapshot_size(dir: &Path, name: &str) -> u64 {
    fs::metadata(snapshot_path(dir, name))
        .map(|m| m.len())
        .unwrap_or(0)
}
