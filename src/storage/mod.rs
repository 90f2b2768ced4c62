//! Storage layer abstraction.
//!
//! Two backend kinds, kept as distinct traits because they have different
//! consistency contracts:
//! - **Graph** ([`traits::GraphBackend`]): the authoritative, bitemporally
//!   versioned entity/relation store (`SQLite` or in-memory).
//! - **Vector** ([`traits::VectorIndex`]): a companion similarity index, not
//!   part of the graph transaction (brute-force cosine/euclidean scan).

// Allow cast precision loss for score calculations where exact precision is not critical.
#![allow(clippy::cast_precision_loss)]

pub mod graph;
pub mod sqlite;
pub mod traits;
pub mod vector;

pub use graph::{GraphBackend, InMemoryGraphBackend, SqliteGraphBackend};
pub use traits::GraphStats;
pub use vector::InMemoryVectorIndex;
pub use traits::vector::{SimilarityFunction, VectorHit, VectorIndex, VectorQuery};
