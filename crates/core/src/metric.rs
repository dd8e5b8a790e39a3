//! Distance metrics for vector collections
//!
//! A collection's metric is chosen at creation time and is immutable
//! afterwards. Changing the metric requires a new collection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance metric for similarity calculation
///
/// The engine reports *distances* (lower = closer). Callers that need a
/// similarity score convert the distance themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine distance: 1 - dot(a,b) / (||a|| * ||b||)
    /// Range: [0, 2]
    #[default]
    Cosine,

    /// Squared Euclidean (L2) distance
    /// Range: [0, inf)
    Euclidean,

    /// Inner product distance: 1 - dot(a,b)
    /// Range: unbounded. Assumes normalized embeddings.
    InnerProduct,
}

impl DistanceMetric {
    /// All supported metrics, in canonical order
    pub const ALL: [DistanceMetric; 3] = [
        DistanceMetric::Cosine,
        DistanceMetric::Euclidean,
        DistanceMetric::InnerProduct,
    ];

    /// Canonical short name (`cosine`, `l2`, `ip`)
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "l2",
            DistanceMetric::InnerProduct => "ip",
        }
    }

    /// Parse from string (case-insensitive, surrounding whitespace ignored)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Some(DistanceMetric::Cosine),
            "l2" | "euclidean" => Some(DistanceMetric::Euclidean),
            "ip" | "inner_product" | "dot_product" => Some(DistanceMetric::InnerProduct),
            _ => None,
        }
    }

    /// Compute the distance between two equal-length vectors
    ///
    /// Callers are responsible for checking dimensions.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            DistanceMetric::Cosine => {
                let norm = norm(a) * norm(b);
                if norm == 0.0 {
                    // Zero vectors have no direction; treat as orthogonal
                    1.0
                } else {
                    1.0 - dot(a, b) / norm
                }
            }
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = x - y;
                    d * d
                })
                .sum(),
            DistanceMetric::InnerProduct => 1.0 - dot(a, b),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f32]) -> f32 {
    dot(a, a).sqrt()
}
