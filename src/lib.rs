//! # chronograph
//!
//! A bitemporal knowledge-graph memory store with hybrid vector search.
//!
//! chronograph tracks entities and relations across two time axes — when a
//! fact was true in the world (valid time) and when the system learned it
//! (transaction time) — so callers can query "what did we believe as of
//! date X" without losing the ability to see what is true now. On top of
//! that substrate it layers embedding-backed vector search, graph/vector
//! hybrid retrieval, and a small analytics kernel (paths, components,
//! centrality).
//!
//! ## Features
//!
//! - Bitemporal entity/relation versioning with point-in-time queries
//! - Confidence decay views over relation edges
//! - Pluggable graph backend (in-memory or `SQLite`)
//! - Hybrid graph-text + vector search (weighted fusion or RRF)
//! - Background embedding jobs with rate limiting and coalescing
//! - Graph analytics: degree/centrality, path finding, connected components
//!
//! ## Example
//!
//! ```rust,ignore
//! use chronograph::{ChronographConfig, KnowledgeGraph};
//! use chronograph::graph::EntityInput;
//!
//! let kg = KnowledgeGraph::open_in_memory(ChronographConfig::default());
//! kg.create_entities(vec![EntityInput {
//!     name: "alice".to_string(),
//!     entity_type: "person".to_string(),
//!     observations: vec!["likes coffee".to_string()],
//! }])?;
//! let hits = kg.search("coffee", Default::default())?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
// Cannot be moved to function level. Current duplicates: fastembed→ort transitive deps.
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod analytics;
pub mod config;
pub mod embedding;
pub mod facade;
pub mod graph;
pub mod models;
pub mod observability;
pub mod pagination;
pub mod search;
pub mod storage;

// Re-exports for convenience
pub use config::ChronographConfig;
pub use embedding::Embedder;
pub use facade::KnowledgeGraph;
pub use models::{Entity, EntitySearchQuery, Relation, SearchHit, VersionId};

/// Error type for chronograph operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidArgument` | Malformed query parameters, empty required fields, bad regex |
/// | `NotFound` | Entity/relation/version looked up by name or id does not exist |
/// | `Conflict` | A write would violate a uniqueness invariant (duplicate triple, etc.) |
/// | `BackendUnavailable` | The storage backend is unreachable or its connection is poisoned |
/// | `ValidationError` | A value fails a domain invariant (confidence out of range, bad time range) |
/// | `RateLimited` | The embedding job scheduler's token bucket is exhausted |
/// | `ExternalUnavailable` | An external embedding provider call fails or times out |
/// | `Cancelled` | A caller-supplied cancellation token was triggered mid-operation |
#[derive(Debug, ThisError)]
pub enum Error {
    /// An argument failed basic validation before reaching storage.
    ///
    /// Raised when:
    /// - A query has an empty or unparsable regex
    /// - A required name/type string is empty
    /// - Pagination parameters are internally inconsistent (e.g. `page` without `page_size`)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested entity, relation, or version does not exist.
    ///
    /// Raised when:
    /// - `get_entity`/`get_relation` finds no matching row
    /// - A point-in-time query has no version valid at the requested instant
    #[error("not found: {0}")]
    NotFound(String),

    /// A write would violate a storage uniqueness invariant.
    ///
    /// Raised when:
    /// - Creating a relation whose `(from, to, relation_type)` triple already exists as current
    /// - A concurrent writer closed the same version first
    #[error("conflict: {0}")]
    Conflict(String),

    /// The storage backend could not service the request.
    ///
    /// Raised when:
    /// - The `SQLite` connection mutex is poisoned
    /// - A connection-level I/O error occurs
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A value failed a domain invariant.
    ///
    /// Raised when:
    /// - A confidence or strength value is outside `[0, 1]` (caught before clamping is acceptable)
    /// - A valid-time range has `end` before `start`
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The embedding job scheduler's rate limit was exceeded.
    ///
    /// Raised when:
    /// - The token bucket has no tokens available and the caller asked not to wait
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// An external dependency (embedding provider) was unavailable.
    ///
    /// Raised when:
    /// - The configured embedding HTTP provider returns an error or times out
    /// - `fastembed` model loading fails
    #[error("external service unavailable: {0}")]
    ExternalUnavailable(String),

    /// The operation was cancelled via a `CancellationToken`.
    ///
    /// Raised when:
    /// - A long-running embedding job or analytics traversal observes cancellation
    #[error("cancelled: {0}")]
    Cancelled(String),
}

/// Result type alias for chronograph operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidArgument("empty query".to_string());
        assert_eq!(err.to_string(), "invalid argument: empty query");

        let err = Error::NotFound("entity 'alice'".to_string());
        assert_eq!(err.to_string(), "not found: entity 'alice'");

        let err = Error::Conflict("relation triple exists".to_string());
        assert_eq!(err.to_string(), "conflict: relation triple exists");
    }
}
