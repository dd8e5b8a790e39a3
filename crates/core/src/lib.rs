//! Core types for the Strata vector engine
//!
//! This crate defines the vocabulary shared between the embedded engine and
//! the layers built on top of it:
//! - `DistanceMetric`: similarity metric fixed per collection
//! - `Scalar` / `MetadataValue` / `Metadata`: flat metadata attached to vectors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod metric;
pub mod value;

pub use metric::DistanceMetric;
pub use value::{
    json_type_name, metadata_from_json, metadata_to_json, validate_metadata, Metadata,
    MetadataError, MetadataValue, Scalar,
};
