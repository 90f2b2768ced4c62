//! Vector index trait (C4).
//!
//! A [`VectorIndex`] is a companion store: it is not part of the graph
//! transaction. The search planner (C6) and the embedding job manager (C5)
//! write to it after a graph mutation commits, so a failed vector write never
//! rolls back the graph.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Configuration |
//! |---------|----------|---------------|
//! | `InMemoryVectorIndex` | Default; pure-Rust scan | No external deps |
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use chronograph::storage::vector::InMemoryVectorIndex;
//! use chronograph::storage::traits::{VectorIndex, VectorQuery};
//! use std::collections::HashMap;
//!
//! let mut index = InMemoryVectorIndex::new(384, SimilarityFunction::Cosine);
//! index.add_vector("alice", &embedding, HashMap::from([("entityType".into(), "person".into())]))?;
//!
//! let results = index.search(&query_embedding, &VectorQuery::default())?;
//! ```

use crate::Result;

/// Similarity function used to rank candidates.
///
/// Chosen at index creation and fixed for the lifetime of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityFunction {
    /// Cosine similarity, in `[-1, 1]`.
    #[default]
    Cosine,
    /// Negative Euclidean distance, so that higher is still "more similar".
    Euclidean,
}

/// A single scored candidate from [`VectorIndex::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    /// The key the vector was stored under (an entity name).
    pub key: String,
    /// Similarity score per the index's configured [`SimilarityFunction`].
    pub similarity: f32,
    /// Tags stored alongside the vector.
    pub tags: std::collections::HashMap<String, String>,
}

/// Search parameters for [`VectorIndex::search`].
#[derive(Debug, Clone, Default)]
pub struct VectorQuery {
    /// Maximum number of hits to return.
    pub limit: usize,
    /// Minimum similarity a candidate must meet to be returned.
    pub min_similarity: Option<f32>,
    /// Equality filters applied to stored tags (e.g. `entityType`).
    pub tag_filters: std::collections::HashMap<String, String>,
}

/// Trait for vector-similarity index backends.
///
/// # Invariants
///
/// - Vector dimension is fixed per index; vectors of the wrong length are
///   rejected with [`crate::Error::InvalidArgument`].
/// - Re-adding an existing key overwrites its vector and tags.
/// - Removing a missing key is not an error; it returns `Ok(false)`.
/// - `search` results are ordered by descending similarity, ties broken by
///   key order.
pub trait VectorIndex: Send + Sync {
    /// The dimensionality of embedding vectors this index accepts.
    fn dimensions(&self) -> usize;

    /// The similarity function this index was created with.
    fn similarity_function(&self) -> SimilarityFunction;

    /// Inserts or overwrites the vector and tags stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if `vector.len() != dimensions()`.
    fn add_vector(
        &mut self,
        key: &str,
        vector: &[f32],
        tags: std::collections::HashMap<String, String>,
    ) -> Result<()>;

    /// Removes a vector by key. Returns `true` if a vector existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal operation fails.
    fn remove_vector(&mut self, key: &str) -> Result<bool>;

    /// Searches for vectors similar to `query_vector`, honoring `query`'s
    /// `limit`, `min_similarity`, and `tag_filters`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] if `query_vector.len() != dimensions()`.
    fn search(&self, query_vector: &[f32], query: &VectorQuery) -> Result<Vec<VectorHit>>;

    /// Returns the total count of indexed vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize>;

    /// Clears all vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails.
    fn clear(&mut self) -> Result<()>;
}
