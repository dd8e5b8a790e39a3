//! Vector index backend trait
//!
//! Defines the interface for swappable vector index implementations.
//! Only `BruteForceBackend` exists today; the trait avoids methods that
//! assume exhaustive scans so an approximate index can slot in later.

use crate::brute_force::BruteForceBackend;
use crate::types::VectorId;
use strata_core::DistanceMetric;

/// Trait for swappable vector index implementations
pub trait VectorIndexBackend: Send + Sync {
    /// Insert a vector (upsert semantics)
    ///
    /// The collection validates dimensions before calling in.
    fn insert(&mut self, id: VectorId, embedding: &[f32]);

    /// Delete a vector
    ///
    /// Returns true if the vector existed and was deleted.
    fn delete(&mut self, id: VectorId) -> bool;

    /// Search for the `k` nearest neighbours accepted by `accept`
    ///
    /// Returns (VectorId, distance) pairs sorted by (distance asc, VectorId asc).
    fn search(
        &self,
        query: &[f32],
        k: usize,
        accept: &dyn Fn(VectorId) -> bool,
    ) -> Vec<(VectorId, f32)>;

    /// Number of indexed vectors
    fn len(&self) -> usize;

    /// Check if empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension, `None` while empty
    fn dimension(&self) -> Option<usize>;

    /// Distance metric
    fn metric(&self) -> DistanceMetric;

    /// Get a vector by id
    fn get(&self, id: VectorId) -> Option<&[f32]>;

    /// Approximate heap footprint of the stored vectors
    fn memory_bytes(&self) -> usize;

    /// Short name reported in collection statistics
    fn name(&self) -> &'static str;
}

/// Factory for creating index backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexBackendFactory {
    /// Exhaustive O(n) search
    #[default]
    BruteForce,
}

impl IndexBackendFactory {
    /// Create a new backend instance
    pub fn create(&self, metric: DistanceMetric) -> Box<dyn VectorIndexBackend> {
        match self {
            IndexBackendFactory::BruteForce => Box::new(BruteForceBackend::new(metric)),
        }
    }
}
