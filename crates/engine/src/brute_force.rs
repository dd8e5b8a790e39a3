//! Exhaustive-scan vector index

use crate::backend::VectorIndexBackend;
use crate::types::VectorId;
use std::collections::BTreeMap;
use strata_core::DistanceMetric;

/// Brute-force backend: scores every accepted vector on each search
///
/// Vectors live in a `BTreeMap` so scans and tie-breaks are deterministic.
pub struct BruteForceBackend {
    metric: DistanceMetric,
    vectors: BTreeMap<VectorId, Vec<f32>>,
}

impl BruteForceBackend {
    /// Create an empty backend
    pub fn new(metric: DistanceMetric) -> Self {
        BruteForceBackend {
            metric,
            vectors: BTreeMap::new(),
        }
    }
}

impl VectorIndexBackend for BruteForceBackend {
    fn insert(&mut self, id: VectorId, embedding: &[f32]) {
        self.vectors.insert(id, embedding.to_vec());
    }

    fn delete(&mut self, id: VectorId) -> bool {
        self.vectors.remove(&id).is_some()
    }

    fn search(
        &self,
        query: &[f32],
        k: usize,
        accept: &dyn Fn(VectorId) -> bool,
    ) -> Vec<(VectorId, f32)> {
        if k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(VectorId, f32)> = self
            .vectors
            .iter()
            .filter(|(id, v)| v.len() == query.len() && accept(**id))
            .map(|(id, v)| (*id, self.metric.distance(query, v)))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.vectors.values().next().map(Vec::len)
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn get(&self, id: VectorId) -> Option<&[f32]> {
        self.vectors.get(&id).map(Vec::as_slice)
    }

    fn memory_bytes(&self) -> usize {
        self.vectors
            .values()
            .map(|v| v.len() * std::mem::size_of::<f32>() + std::mem::size_of::<VectorId>())
            .sum()
    }

    fn name(&self) -> &'static str {
        "brute_force"
    }
}
