//! Embedded vector engine for Strata
//!
//! A small, synchronous vector store:
//! - `Database`: named collections, ephemeral or persisted to a directory
//! - `Collection`: add / upsert / get / delete / k-NN query with metadata filters
//! - `Where`: native metadata predicate evaluated before ranking
//! - `VectorIndexBackend`: swappable index (brute force today)
//!
//! Distances are reported as-is (lower = closer). Converting them into
//! similarity scores is left to callers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod brute_force;
pub mod collection;
pub mod database;
pub mod error;
pub mod filter;
mod persist;
pub mod types;

pub use backend::{IndexBackendFactory, VectorIndexBackend};
pub use brute_force::BruteForceBackend;
pub use collection::Collection;
pub use database::{validate_collection_name, Database, MAX_COLLECTION_NAME_LEN};
pub use error::{EngineError, EngineResult};
pub use filter::Where;
pub use types::{CollectionInfo, QueryHit, Record, VectorId};
