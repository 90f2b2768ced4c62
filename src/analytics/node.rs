//! Per-node analytics: degree, neighbourhoods, centrality, influence.

use super::{stats::local_clustering_coefficient, AnalyticsFootprint, Snapshot};
use std::collections::{HashSet, VecDeque};
use std::time::Instant;

const DEFAULT_MAX_NEIGHBORS: usize = 100;
const CLOSENESS_SAMPLE_SIZE: usize = 20;

/// Options controlling how much work [`analyze`] does.
#[derive(Debug, Clone, Copy)]
pub struct NodeAnalyticsOptions {
    /// Bound on the depth-1/depth-2 neighbour lists returned.
    pub max_neighbors: usize,
    /// Whether to compute the local clustering coefficient.
    pub clustering_coefficient: bool,
}

impl Default for NodeAnalyticsOptions {
    fn default() -> Self {
        Self { max_neighbors: DEFAULT_MAX_NEIGHBORS, clustering_coefficient: false }
    }
}

/// Per-node analytics report.
#[derive(Debug, Clone)]
pub struct NodeAnalytics {
    /// The analyzed node's name.
    pub name: String,
    /// Outgoing edge count.
    pub out_degree: usize,
    /// Incoming edge count.
    pub in_degree: usize,
    /// `in_degree + out_degree`.
    pub total_degree: usize,
    /// Directly-connected node names (undirected), bounded by `max_neighbors`.
    pub neighbors_depth_1: Vec<String>,
    /// Nodes reachable within 2 undirected hops, excluding depth-1, bounded
    /// by `max_neighbors`.
    pub neighbors_depth_2: Vec<String>,
    /// `total_degree` as a raw count.
    pub degree_centrality_raw: usize,
    /// `total_degree / (|V| - 1)`, `0.0` if `|V| <= 1`.
    pub degree_centrality_normalized: f64,
    /// Reciprocal of the average BFS distance to a random sample of up to
    /// 20 other nodes, or `None` if the node has no reachable peers.
    pub closeness_centrality_sampled: Option<f64>,
    /// Local clustering coefficient, only computed when requested.
    pub clustering_coefficient: Option<f64>,
    /// `|direct|`, `|reachable at depth 2 minus direct|`, radius.
    pub influence: InfluenceSummary,
    /// Timing/coverage footer.
    pub footprint: AnalyticsFootprint,
}

/// Reach-based influence summary (`spec.md` §4.5).
#[derive(Debug, Clone, Copy)]
pub struct InfluenceSummary {
    /// Count of directly-connected nodes.
    pub direct: usize,
    /// Count of nodes reachable at exactly depth 2, excluding direct
    /// neighbours.
    pub depth_2_only: usize,
    /// The radius actually explored: 0 if isolated, 1 if only direct
    /// neighbours exist, 2 if depth-2 neighbours were found.
    pub radius: u8,
}

/// Computes [`NodeAnalytics`] for `name` within `snapshot`.
///
/// Returns `None` if `name` is not present in the snapshot.
#[must_use]
pub fn analyze(snapshot: &Snapshot, name: &str, options: NodeAnalyticsOptions) -> Option<NodeAnalytics> {
    if !snapshot.entity_types.contains_key(name) {
        return None;
    }
    let started = Instant::now();

    let out_degree = snapshot.outgoing.get(name).map_or(0, Vec::len);
    let in_degree = snapshot.incoming.get(name).map_or(0, Vec::len);
    let total_degree = out_degree + in_degree;

    let depth_1: HashSet<String> = snapshot.undirected_neighbors(name).into_iter().map(str::to_string).filter(|n| n != name).collect();
    let mut depth_2: HashSet<String> = HashSet::new();
    for neighbor in &depth_1 {
        for further in snapshot.undirected_neighbors(neighbor) {
            if further != name && !depth_1.contains(further) {
                depth_2.insert(further.to_string());
            }
        }
    }

    let mut neighbors_depth_1: Vec<String> = depth_1.iter().cloned().collect();
    neighbors_depth_1.sort();
    neighbors_depth_1.truncate(options.max_neighbors);

    let mut neighbors_depth_2: Vec<String> = depth_2.iter().cloned().collect();
    neighbors_depth_2.sort();
    neighbors_depth_2.truncate(options.max_neighbors);

    let node_count = snapshot.node_count();
    #[allow(clippy::cast_precision_loss)]
    let degree_centrality_normalized = if node_count <= 1 { 0.0 } else { total_degree as f64 / (node_count as f64 - 1.0) };

    let closeness_centrality_sampled = sampled_closeness(snapshot, name);

    let clustering_coefficient = if options.clustering_coefficient { Some(local_clustering_coefficient(snapshot, name)) } else { None };

    let radius = if depth_1.is_empty() {
        0
    } else if depth_2.is_empty() {
        1
    } else {
        2
    };
    let influence = InfluenceSummary { direct: depth_1.len(), depth_2_only: depth_2.len(), radius };

    let nodes_explored = 1 + depth_1.len() + depth_2.len();

    Some(NodeAnalytics {
        name: name.to_string(),
        out_degree,
        in_degree,
        total_degree,
        neighbors_depth_1,
        neighbors_depth_2,
        degree_centrality_raw: total_degree,
        degree_centrality_normalized,
        closeness_centrality_sampled,
        clustering_coefficient,
        influence,
        footprint: AnalyticsFootprint::measure(started, nodes_explored),
    })
}

/// BFS from `name` to a bounded sample of up to [`CLOSENESS_SAMPLE_SIZE`]
/// other reachable nodes, returning the reciprocal of the average distance.
///
/// The sample is deterministic (first nodes found in BFS order) rather than
/// drawn from an RNG, since the crate never calls into a randomness source
/// outside version-id generation.
fn sampled_closeness(snapshot: &Snapshot, name: &str) -> Option<f64> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<(&str, u32)> = VecDeque::new();
    visited.insert(name);
    queue.push_back((name, 0));

    let mut distances: Vec<u32> = Vec::with_capacity(CLOSENESS_SAMPLE_SIZE);

    while let Some((node, distance)) = queue.pop_front() {
        if node != name {
            distances.push(distance);
            if distances.len() >= CLOSENESS_SAMPLE_SIZE {
                break;
            }
        }
        for neighbor in snapshot.undirected_neighbors(node) {
            if visited.insert(neighbor) {
                queue.push_back((neighbor, distance + 1));
            }
        }
    }

    if distances.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let average = distances.iter().copied().sum::<u32>() as f64 / distances.len() as f64;
    if average == 0.0 {
        None
    } else {
        Some(1.0 / average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::models::{Entity, Relation};

    fn star_graph() -> Snapshot {
        let entities = vec![Entity::new("center", "hub"), Entity::new("a", "leaf"), Entity::new("b", "leaf"), Entity::new("c", "leaf")];
        let relations = vec![Relation::new("center", "a", "knows"), Relation::new("center", "b", "knows"), Relation::new("center", "c", "knows")];
        Snapshot::build(&Graph { entities, relations })
    }

    #[test]
    fn center_of_a_star_has_full_depth_1_neighbors() {
        let snapshot = star_graph();
        let report = analyze(&snapshot, "center", NodeAnalyticsOptions::default()).unwrap();
        assert_eq!(report.total_degree, 3);
        assert_eq!(report.neighbors_depth_1.len(), 3);
        assert_eq!(report.neighbors_depth_2.len(), 0);
        assert_eq!(report.influence.radius, 1);
    }

    #[test]
    fn leaf_sees_other_leaves_at_depth_2() {
        let snapshot = star_graph();
        let report = analyze(&snapshot, "a", NodeAnalyticsOptions::default()).unwrap();
        assert_eq!(report.neighbors_depth_1, vec!["center".to_string()]);
        assert_eq!(report.neighbors_depth_2.len(), 2);
        assert_eq!(report.influence.radius, 2);
    }

    #[test]
    fn unknown_node_returns_none() {
        let snapshot = star_graph();
        assert!(analyze(&snapshot, "ghost", NodeAnalyticsOptions::default()).is_none());
    }

    #[test]
    fn isolated_node_has_no_closeness() {
        let entities = vec![Entity::new("lonely", "x")];
        let snapshot = Snapshot::build(&Graph { entities, relations: vec![] });
        let report = analyze(&snapshot, "lonely", NodeAnalyticsOptions::default()).unwrap();
        assert!(report.closeness_centrality_sampled.is_none());
        assert_eq!(report.influence.radius, 0);
    }
}
