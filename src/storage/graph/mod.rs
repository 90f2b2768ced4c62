//! Graph storage backends for knowledge graph operations.
//!
//! This module provides implementations of the [`GraphBackend`] trait for
//! storing and querying entities, relationships, and entity mentions.
//!
//! # Available Backends
//!
//! | Backend | Use Case | Features |
//! |---------|----------|----------|
//! | [`SqliteGraphBackend`] | Default; embedded | Recursive CTEs for traversal |
//! | [`InMemoryGraphBackend`] | Testing | Fast, no persistence |
//!
//! # Example
//!
//! ```rust,ignore
//! use chronograph::storage::graph::SqliteGraphBackend;
//! use chronograph::storage::traits::GraphBackend;
//! use chronograph::models::graph::Entity;
//!
//! let backend = SqliteGraphBackend::new("graph.db")?;
//!
//! let entity = Entity::new("alice", "person").with_observation("likes coffee");
//! backend.insert_entity_version(&entity)?;
//!
//! let current = backend.get_current_entity("alice")?;
//! ```

mod memory;
mod sqlite;

pub use memory::InMemoryGraphBackend;
pub use sqlite::SqliteGraphBackend;

// Re-export trait for convenience
pub use crate::storage::traits::graph::{GraphBackend, GraphStats};
