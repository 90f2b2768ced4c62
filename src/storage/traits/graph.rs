//! Graph backend trait for knowledge-graph storage.
//!
//! A [`GraphBackend`] is a raw property-graph store: it knows how to persist
//! and query entity/relation *rows*, including bitemporal filtering, but it
//! does not itself implement the versioning protocol (close-then-insert on
//! every mutation). That protocol lives one layer up, in
//! [`crate::graph::BitemporalGraphStore`], which is generic over any
//! `GraphBackend`. This split mirrors the teacher's separation between a
//! storage backend trait and the service that wraps it.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Features |
//! |---------|----------|----------|
//! | `SqliteGraphBackend` | Default; embedded | WAL mode, recursive CTEs for traversal |
//! | `InMemoryGraphBackend` | Testing | Fast, no persistence |
//!
//! # Error Modes and Guarantees
//!
//! All backends return `Result<T>` with errors propagated via [`crate::Error`].
//! Uniqueness violations surface as [`crate::Error::Conflict`]; missing rows
//! as `Ok(None)` from getters (never an error) so callers can distinguish
//! "not found" from "backend failed".
//!
//! ## Temporal Queries
//!
//! Bitemporal queries filter by both `valid_time` and `transaction_time`:
//! - `valid_at`: entities/relations whose valid-time range contains this instant
//! - `as_of`: rows recorded in the system no later than this instant

use crate::Result;
use crate::models::graph::{Entity, EntitySearchQuery, Relation};
use crate::models::temporal::BitemporalPoint;

/// Trait for raw property-graph storage.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn GraphBackend>`.
/// - Use interior mutability (e.g. `Mutex<Connection>`) for mutable state.
/// - Every row insert/update is a new version; backends never overwrite a
///   row in place — that is what the `version` + `valid_time` columns are for.
/// - Implementations must enforce the `(from, to, relation_type)` uniqueness
///   invariant among *currently valid* relations, returning
///   [`crate::Error::Conflict`] on violation.
pub trait GraphBackend: Send + Sync {
    // ========================================================================
    // Entity row operations
    // ========================================================================

    /// Inserts a new entity version row.
    ///
    /// Does not close any prior version for the same name; callers that need
    /// versioning semantics go through [`crate::graph::BitemporalGraphStore`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert_entity_version(&self, entity: &Entity) -> Result<()>;

    /// Retrieves the current (open-ended `valid_time`) version of an entity by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup operation fails.
    fn get_current_entity(&self, name: &str) -> Result<Option<Entity>>;

    /// Retrieves every version row stored for a given entity name, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup operation fails.
    fn get_entity_history(&self, name: &str) -> Result<Vec<Entity>>;

    /// Closes the current version's `valid_time.end` at the given timestamp.
    ///
    /// No-op (returns `Ok(())`) if there is no current version.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn close_entity_valid_time(&self, name: &str, end_time: i64) -> Result<()>;

    /// Deletes all rows (every version) for an entity name.
    ///
    /// Returns `true` if at least one row existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion operation fails.
    fn delete_entity(&self, name: &str) -> Result<bool>;

    /// Searches current entities by the given query.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails (e.g. an invalid regex in `query.text`).
    fn search_entities(&self, query: &EntitySearchQuery) -> Result<Vec<Entity>>;

    /// Returns the total number of entities matching `query`, ignoring pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn count_entities(&self, query: &EntitySearchQuery) -> Result<usize>;

    /// Lists every currently-valid entity name, for bulk operations like
    /// vector-index rebuilds.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn list_entity_names(&self) -> Result<Vec<String>>;

    // ========================================================================
    // Relation row operations
    // ========================================================================

    /// Inserts a new relation version row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Conflict`] if a current relation with the same
    /// `(from, to, relation_type)` triple already exists, or another storage
    /// error if the insert fails.
    fn insert_relation_version(&self, relation: &Relation) -> Result<()>;

    /// Retrieves the current version of a relation by its triple.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn get_current_relation(&self, from: &str, to: &str, relation_type: &str) -> Result<Option<Relation>>;

    /// Retrieves every version row stored for a given relation triple, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn get_relation_history(&self, from: &str, to: &str, relation_type: &str) -> Result<Vec<Relation>>;

    /// Closes a relation's current `valid_time.end` at the given timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn close_relation_valid_time(&self, from: &str, to: &str, relation_type: &str, end_time: i64) -> Result<()>;

    /// Deletes all rows for a relation triple.
    ///
    /// Returns `true` if at least one row existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete_relation(&self, from: &str, to: &str, relation_type: &str) -> Result<bool>;

    /// Returns all current relations incident to `name`, in either direction.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn relations_for_entity(&self, name: &str) -> Result<Vec<Relation>>;

    /// Returns every current relation in the graph.
    ///
    /// Used by the analytics kernel to build an in-memory adjacency view;
    /// backends may choose to cache or stream this for large graphs.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn all_current_relations(&self) -> Result<Vec<Relation>>;

    // ========================================================================
    // Bitemporal point-in-time operations
    // ========================================================================

    /// Finds the entity version valid at `point.valid_at` as known to the
    /// system no later than `point.as_of`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_entity_at(&self, name: &str, point: &BitemporalPoint) -> Result<Option<Entity>>;

    /// Finds the relation version valid at `point.valid_at` as known to the
    /// system no later than `point.as_of`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn get_relation_at(&self, from: &str, to: &str, relation_type: &str, point: &BitemporalPoint) -> Result<Option<Relation>>;

    // ========================================================================
    // Utility operations
    // ========================================================================

    /// Returns statistics about the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn get_stats(&self) -> Result<GraphStats>;

    /// Clears all graph data.
    ///
    /// Use with caution - this removes all entities, relations, and their history.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn clear(&self) -> Result<()>;
}

/// Statistics about the knowledge graph.
#[derive(Debug, Clone, Default)]
pub struct GraphStats {
    /// Total number of distinct current entities.
    pub entity_count: usize,
    /// Number of current entities by type.
    pub entities_by_type: std::collections::HashMap<String, usize>,
    /// Total number of distinct current relations.
    pub relation_count: usize,
    /// Number of current relations by type.
    pub relations_by_type: std::collections::HashMap<String, usize>,
    /// Total number of version rows stored (entities + relations, all history).
    pub version_row_count: usize,
    /// Average current relations per entity.
    pub avg_relations_per_entity: f32,
}

impl GraphStats {
    /// Creates empty stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_stats_default() {
        let stats = GraphStats::default();
        assert_eq!(stats.entity_count, 0);
        assert_eq!(stats.relation_count, 0);
        assert_eq!(stats.version_row_count, 0);
    }
}
