//! Graph analytics kernel (C7): statistics, per-node metrics, path finding,
//! and connected components, all operating on an in-memory snapshot loaded
//! through [`crate::graph::BitemporalGraphStore::load_graph`].

pub mod components;
pub mod node;
pub mod paths;
pub mod stats;

pub use components::{ComponentsReport, ConnectedComponentsMode};
pub use node::{NodeAnalytics, NodeAnalyticsOptions};
pub use paths::{FoundPath, PathAlgorithm, PathFilters, PathFindingReport, PathQuery};
pub use stats::{GraphStatistics, StatisticsOptions};

use crate::graph::Graph;
use crate::models::Relation;
use std::collections::HashMap;
use std::time::Instant;

/// An adjacency-list view over a loaded [`Graph`], built once and reused
/// across analytics calls so each one doesn't re-scan the full relation list.
pub struct Snapshot {
    /// Entity names, in load order.
    pub names: Vec<String>,
    /// `entity_type` per name.
    pub entity_types: HashMap<String, String>,
    /// Outgoing edges per entity name.
    pub outgoing: HashMap<String, Vec<Relation>>,
    /// Incoming edges per entity name.
    pub incoming: HashMap<String, Vec<Relation>>,
}

impl Snapshot {
    /// Builds an adjacency-indexed snapshot from a loaded graph.
    #[must_use]
    pub fn build(graph: &Graph) -> Self {
        let names: Vec<String> = graph.entities.iter().map(|e| e.name.clone()).collect();
        let entity_types: HashMap<String, String> = graph.entities.iter().map(|e| (e.name.clone(), e.entity_type.clone())).collect();
        let mut outgoing: HashMap<String, Vec<Relation>> = HashMap::new();
        let mut incoming: HashMap<String, Vec<Relation>> = HashMap::new();

        for name in &names {
            outgoing.entry(name.clone()).or_default();
            incoming.entry(name.clone()).or_default();
        }
        for relation in &graph.relations {
            outgoing.entry(relation.from.clone()).or_default().push(relation.clone());
            incoming.entry(relation.to.clone()).or_default().push(relation.clone());
        }

        Self { names, entity_types, outgoing, incoming }
    }

    /// Names reachable by a directed out-edge from `name`.
    #[must_use]
    pub fn out_neighbors(&self, name: &str) -> Vec<&str> {
        self.outgoing.get(name).map(|edges| edges.iter().map(|r| r.to.as_str()).collect()).unwrap_or_default()
    }

    /// Names reachable ignoring edge direction (undirected projection).
    #[must_use]
    pub fn undirected_neighbors(&self, name: &str) -> Vec<&str> {
        let mut neighbors: Vec<&str> = self.outgoing.get(name).map(|edges| edges.iter().map(|r| r.to.as_str()).collect()).unwrap_or_default();
        if let Some(edges) = self.incoming.get(name) {
            neighbors.extend(edges.iter().map(|r| r.from.as_str()));
        }
        neighbors
    }

    /// Total node count in the snapshot.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.names.len()
    }
}

/// Shared timing/coverage footer every analytics report carries
/// (`spec.md` §4.5: "all analytics report nodes-explored and elapsed time").
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsFootprint {
    /// Number of distinct nodes visited while computing the report.
    pub nodes_explored: usize,
    /// Wall-clock time spent computing the report, in milliseconds.
    pub elapsed_ms: f64,
}

impl AnalyticsFootprint {
    fn measure(started: Instant, nodes_explored: usize) -> Self {
        Self { nodes_explored, elapsed_ms: started.elapsed().as_secs_f64() * 1000.0 }
    }
}
