//! Processing counters kept by the document store.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;

/// Snapshot of the store's processing counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingStats {
    /// Documents that went through `process`
    pub documents_processed: u64,
    /// Entries written (add, add many, update, process)
    pub vectors_stored: u64,
    /// Entries returned by reads and searches
    pub vectors_retrieved: u64,
    /// Similarity and metadata searches run
    pub searches_performed: u64,
    /// Embedder failures during `process`
    pub embedding_errors: u64,
    /// Failed operations of any kind
    pub errors: u64,
    /// Wall time spent in store operations, in seconds
    pub total_processing_time: f64,
    /// When the last operation finished
    pub last_processed: Option<DateTime<Utc>>,
}

/// Thread-safe recorder behind `ProcessingStats`
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    inner: Mutex<ProcessingStats>,
}

impl StatsRecorder {
    pub(crate) fn snapshot(&self) -> ProcessingStats {
        self.inner.lock().clone()
    }

    pub(crate) fn stored(&self, count: usize, elapsed: Duration) {
        self.update(elapsed, |s| s.vectors_stored += count as u64);
    }

    pub(crate) fn retrieved(&self, count: usize, elapsed: Duration) {
        self.update(elapsed, |s| s.vectors_retrieved += count as u64);
    }

    pub(crate) fn searched(&self, hits: usize, elapsed: Duration) {
        self.update(elapsed, |s| {
            s.searches_performed += 1;
            s.vectors_retrieved += hits as u64;
        });
    }

    pub(crate) fn processed(&self) {
        self.inner.lock().documents_processed += 1;
    }

    pub(crate) fn embedding_error(&self) {
        let mut stats = self.inner.lock();
        stats.embedding_errors += 1;
        stats.errors += 1;
    }

    pub(crate) fn error(&self) {
        self.inner.lock().errors += 1;
    }

    fn update(&self, elapsed: Duration, f: impl FnOnce(&mut ProcessingStats)) {
        let mut stats = self.inner.lock();
        f(&mut *stats);
        stats.total_processing_time += elapsed.as_secs_f64();
        stats.last_processed = Some(Utc::now());
    }
}
