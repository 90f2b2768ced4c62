//! Storage backend traits.

pub mod graph;
pub mod vector;

pub use graph::{GraphBackend, GraphStats};
pub use vector::{SimilarityFunction, VectorHit, VectorIndex, VectorQuery};
