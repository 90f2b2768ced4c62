//! Path finding between two named nodes (`spec.md` §4.5).

use super::{AnalyticsFootprint, Snapshot};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::time::Instant;

const DEFAULT_MAX_DEPTH: usize = 6;

/// Which path-finding algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathAlgorithm {
    /// Enumerate up to `max_paths` simple paths via breadth-first search.
    Bfs,
    /// Like `Bfs`, but searches from both ends and stitches half-paths —
    /// selected automatically when `bidirectional` is set and `max_depth > 2`.
    BidirectionalBfs,
    /// Recursive (depth-bounded) depth-first search.
    Dfs,
    /// Weighted shortest path via Dijkstra; edge weight is `1/(strength
    /// or 1)` unless the caller supplies a different property to invert.
    Dijkstra,
}

/// Edge-type and directionality filters applied during traversal.
#[derive(Debug, Clone, Default)]
pub struct PathFilters {
    /// If non-empty, only these relation types may be traversed.
    pub relation_types: Vec<String>,
    /// Relation types that may never be traversed, applied after
    /// `relation_types`.
    pub exclude_relation_types: Vec<String>,
    /// When `true`, edges may be followed in either direction.
    pub symmetric: bool,
}

impl PathFilters {
    fn allows(&self, relation_type: &str) -> bool {
        if !self.relation_types.is_empty() && !self.relation_types.iter().any(|t| t == relation_type) {
            return false;
        }
        !self.exclude_relation_types.iter().any(|t| t == relation_type)
    }
}

/// Request parameters for [`find_paths`].
#[derive(Debug, Clone)]
pub struct PathQuery {
    /// Source node name.
    pub from: String,
    /// Target node name.
    pub to: String,
    /// Which algorithm family to use.
    pub algorithm: PathAlgorithm,
    /// Maximum traversal depth. Default 6.
    pub max_depth: usize,
    /// Maximum number of distinct simple paths to enumerate. Default 10.
    pub max_paths: usize,
    /// Edge/direction filters.
    pub filters: PathFilters,
}

impl Default for PathQuery {
    fn default() -> Self {
        Self { from: String::new(), to: String::new(), algorithm: PathAlgorithm::Bfs, max_depth: DEFAULT_MAX_DEPTH, max_paths: 10, filters: PathFilters::default() }
    }
}

/// One found path: the node sequence and the relation type used at each hop.
#[derive(Debug, Clone)]
pub struct FoundPath {
    /// Node names from `from` to `to`, inclusive.
    pub nodes: Vec<String>,
    /// Relation type traversed at each hop (`nodes.len() - 1` entries).
    pub relation_types: Vec<String>,
    /// Cumulative Dijkstra weight, only set when `algorithm == Dijkstra`.
    pub weight: Option<f64>,
}

impl FoundPath {
    fn len(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

/// Full report for a path-finding request.
#[derive(Debug, Clone)]
pub struct PathFindingReport {
    /// The single shortest (or least-weight) path found, if any.
    pub shortest: Option<FoundPath>,
    /// All distinct simple paths found, up to `max_paths`.
    pub all_paths: Vec<FoundPath>,
    /// Histogram of path lengths (hop count -> path count) across `all_paths`.
    pub path_length_distribution: HashMap<usize, usize>,
    /// Intermediate nodes (excluding `from`/`to`) appearing in 2+ of
    /// `all_paths`.
    pub bottleneck_nodes: Vec<String>,
    /// Intermediate nodes ranked by how many of `all_paths` they appear in.
    pub frequent_intermediates: Vec<(String, usize)>,
    /// Relation-type usage counts across all hops in `all_paths`.
    pub relation_type_histogram: HashMap<String, usize>,
    /// Timing/coverage footer.
    pub footprint: AnalyticsFootprint,
}

/// Finds path(s) between `query.from` and `query.to` within `snapshot`.
#[must_use]
pub fn find_paths(snapshot: &Snapshot, query: &PathQuery) -> PathFindingReport {
    let started = Instant::now();
    let mut nodes_explored = HashSet::new();

    let algorithm = if query.algorithm == PathAlgorithm::BidirectionalBfs && query.max_depth <= 2 { PathAlgorithm::Bfs } else { query.algorithm };

    let all_paths = match algorithm {
        PathAlgorithm::Bfs => enumerate_bfs(snapshot, query, &mut nodes_explored),
        PathAlgorithm::BidirectionalBfs => bidirectional_bfs(snapshot, query, &mut nodes_explored),
        PathAlgorithm::Dfs => enumerate_dfs(snapshot, query, &mut nodes_explored),
        PathAlgorithm::Dijkstra => dijkstra(snapshot, query, &mut nodes_explored).into_iter().collect(),
    };

    let shortest = all_paths.iter().min_by(|a, b| match (a.weight, b.weight) {
        (Some(wa), Some(wb)) => wa.partial_cmp(&wb).unwrap_or(Ordering::Equal),
        _ => a.len().cmp(&b.len()),
    });
    let shortest = shortest.cloned();

    let mut path_length_distribution: HashMap<usize, usize> = HashMap::new();
    let mut intermediate_counts: HashMap<String, usize> = HashMap::new();
    let mut relation_type_histogram: HashMap<String, usize> = HashMap::new();

    for path in &all_paths {
        *path_length_distribution.entry(path.len()).or_insert(0) += 1;
        for node in path.nodes.iter().skip(1).take(path.nodes.len().saturating_sub(2)) {
            *intermediate_counts.entry(node.clone()).or_insert(0) += 1;
        }
        for relation_type in &path.relation_types {
            *relation_type_histogram.entry(relation_type.clone()).or_insert(0) += 1;
        }
    }

    let mut frequent_intermediates: Vec<(String, usize)> = intermediate_counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    frequent_intermediates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let bottleneck_nodes = frequent_intermediates.iter().filter(|(_, count)| *count >= 2).map(|(name, _)| name.clone()).collect();

    PathFindingReport {
        shortest,
        all_paths,
        path_length_distribution,
        bottleneck_nodes,
        frequent_intermediates,
        relation_type_histogram,
        footprint: AnalyticsFootprint::measure(started, nodes_explored.len()),
    }
}

fn step_edges<'a>(snapshot: &'a Snapshot, node: &str, filters: &PathFilters) -> Vec<(&'a str, &'a str)> {
    let mut edges: Vec<(&str, &str)> = Vec::new();
    if let Some(out) = snapshot.outgoing.get(node) {
        edges.extend(out.iter().filter(|r| filters.allows(&r.relation_type)).map(|r| (r.to.as_str(), r.relation_type.as_str())));
    }
    if filters.symmetric {
        if let Some(inc) = snapshot.incoming.get(node) {
            edges.extend(inc.iter().filter(|r| filters.allows(&r.relation_type)).map(|r| (r.from.as_str(), r.relation_type.as_str())));
        }
    }
    edges
}

fn enumerate_bfs(snapshot: &Snapshot, query: &PathQuery, nodes_explored: &mut HashSet<String>) -> Vec<FoundPath> {
    let mut found = Vec::new();
    let mut queue: VecDeque<(Vec<String>, Vec<String>)> = VecDeque::new();
    queue.push_back((vec![query.from.clone()], Vec::new()));

    while let Some((path, relation_types)) = queue.pop_front() {
        if found.len() >= query.max_paths {
            break;
        }
        let current = path.last().expect("path always has at least one node");
        nodes_explored.insert(current.clone());

        if current == &query.to && path.len() > 1 {
            found.push(FoundPath { nodes: path, relation_types, weight: None });
            continue;
        }
        if path.len() - 1 >= query.max_depth {
            continue;
        }

        for (next, relation_type) in step_edges(snapshot, current, &query.filters) {
            if path.iter().any(|n| n == next) {
                continue;
            }
            let mut next_path = path.clone();
            next_path.push(next.to_string());
            let mut next_types = relation_types.clone();
            next_types.push(relation_type.to_string());
            queue.push_back((next_path, next_types));
        }
    }

    found
}

fn enumerate_dfs(snapshot: &Snapshot, query: &PathQuery, nodes_explored: &mut HashSet<String>) -> Vec<FoundPath> {
    let mut found = Vec::new();
    let mut path = vec![query.from.clone()];
    let mut relation_types = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(query.from.clone());

    dfs_visit(snapshot, query, &mut path, &mut relation_types, &mut visited, &mut found, nodes_explored);
    found
}

#[allow(clippy::too_many_arguments)]
fn dfs_visit(
    snapshot: &Snapshot,
    query: &PathQuery,
    path: &mut Vec<String>,
    relation_types: &mut Vec<String>,
    visited: &mut HashSet<String>,
    found: &mut Vec<FoundPath>,
    nodes_explored: &mut HashSet<String>,
) {
    if found.len() >= query.max_paths {
        return;
    }
    let current = path.last().expect("path always has at least one node").clone();
    nodes_explored.insert(current.clone());

    if current == query.to && path.len() > 1 {
        found.push(FoundPath { nodes: path.clone(), relation_types: relation_types.clone(), weight: None });
        return;
    }
    if path.len() - 1 >= query.max_depth {
        return;
    }

    for (next, relation_type) in step_edges(snapshot, &current, &query.filters) {
        if visited.contains(next) {
            continue;
        }
        visited.insert(next.to_string());
        path.push(next.to_string());
        relation_types.push(relation_type.to_string());

        dfs_visit(snapshot, query, path, relation_types, visited, found, nodes_explored);

        path.pop();
        relation_types.pop();
        visited.remove(next);

        if found.len() >= query.max_paths {
            return;
        }
    }
}

/// Bidirectional BFS: each frontier advances to depth `ceil(max_depth/2)`,
/// stitching the two half-paths when a node explored from both sides meets.
fn bidirectional_bfs(snapshot: &Snapshot, query: &PathQuery, nodes_explored: &mut HashSet<String>) -> Vec<FoundPath> {
    let half_depth = query.max_depth.div_ceil(2);

    let forward = single_source_predecessors(snapshot, &query.from, half_depth, &query.filters, false, nodes_explored);
    let backward = single_source_predecessors(snapshot, &query.to, half_depth, &query.filters, true, nodes_explored);

    let mut meeting_nodes: Vec<&String> = forward.keys().filter(|n| backward.contains_key(*n)).collect();
    meeting_nodes.sort();

    let mut found = Vec::new();
    for meeting in meeting_nodes {
        if found.len() >= query.max_paths {
            break;
        }
        let Some(path) = stitch(&forward, &backward, meeting, &query.from, &query.to) else { continue };
        found.push(path);
    }
    found
}

type Predecessors = HashMap<String, (String, String)>;

fn single_source_predecessors(snapshot: &Snapshot, source: &str, max_depth: usize, filters: &PathFilters, reverse: bool, nodes_explored: &mut HashSet<String>) -> Predecessors {
    let mut predecessors: Predecessors = HashMap::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    visited.insert(source.to_string());
    queue.push_back((source.to_string(), 0));

    while let Some((node, depth)) = queue.pop_front() {
        nodes_explored.insert(node.clone());
        if depth >= max_depth {
            continue;
        }
        let edges = if reverse { step_edges_reversed(snapshot, &node, filters) } else { step_edges(snapshot, &node, filters) };
        for (next, relation_type) in edges {
            if visited.insert(next.to_string()) {
                predecessors.insert(next.to_string(), (node.clone(), relation_type.to_string()));
                queue.push_back((next.to_string(), depth + 1));
            }
        }
    }

    predecessors
}

fn step_edges_reversed<'a>(snapshot: &'a Snapshot, node: &str, filters: &PathFilters) -> Vec<(&'a str, &'a str)> {
    let mut edges: Vec<(&str, &str)> = Vec::new();
    if let Some(inc) = snapshot.incoming.get(node) {
        edges.extend(inc.iter().filter(|r| filters.allows(&r.relation_type)).map(|r| (r.from.as_str(), r.relation_type.as_str())));
    }
    if filters.symmetric {
        if let Some(out) = snapshot.outgoing.get(node) {
            edges.extend(out.iter().filter(|r| filters.allows(&r.relation_type)).map(|r| (r.to.as_str(), r.relation_type.as_str())));
        }
    }
    edges
}

fn stitch(forward: &Predecessors, backward: &Predecessors, meeting: &str, from: &str, to: &str) -> Option<FoundPath> {
    let mut front_nodes = vec![meeting.to_string()];
    let mut front_types = Vec::new();
    let mut cursor = meeting.to_string();
    while cursor != from {
        let (prev, relation_type) = forward.get(&cursor)?;
        front_nodes.push(prev.clone());
        front_types.push(relation_type.clone());
        cursor = prev.clone();
    }
    front_nodes.reverse();
    front_types.reverse();

    let mut back_nodes = Vec::new();
    let mut back_types = Vec::new();
    let mut cursor = meeting.to_string();
    while cursor != to {
        let (prev, relation_type) = backward.get(&cursor)?;
        back_nodes.push(prev.clone());
        back_types.push(relation_type.clone());
        cursor = prev.clone();
    }

    let mut nodes = front_nodes;
    nodes.extend(back_nodes);
    let mut relation_types = front_types;
    relation_types.extend(back_types);

    Some(FoundPath { nodes, relation_types, weight: None })
}

#[derive(PartialEq)]
struct HeapEntry {
    cost: f64,
    node: String,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn dijkstra(snapshot: &Snapshot, query: &PathQuery, nodes_explored: &mut HashSet<String>) -> Option<FoundPath> {
    let mut distances: HashMap<String, f64> = HashMap::new();
    let mut predecessors: HashMap<String, (String, String)> = HashMap::new();
    let mut heap = BinaryHeap::new();

    distances.insert(query.from.clone(), 0.0);
    heap.push(HeapEntry { cost: 0.0, node: query.from.clone() });

    while let Some(HeapEntry { cost, node }) = heap.pop() {
        nodes_explored.insert(node.clone());
        if node == query.to {
            break;
        }
        if cost > *distances.get(&node).unwrap_or(&f64::INFINITY) {
            continue;
        }

        let Some(edges) = snapshot.outgoing.get(&node) else { continue };
        for edge in edges {
            if !query.filters.allows(&edge.relation_type) {
                continue;
            }
            let weight = 1.0 / f64::from(edge.strength.unwrap_or(1.0)).max(f64::EPSILON);
            let next_cost = cost + weight;
            if next_cost < *distances.get(&edge.to).unwrap_or(&f64::INFINITY) {
                distances.insert(edge.to.clone(), next_cost);
                predecessors.insert(edge.to.clone(), (node.clone(), edge.relation_type.clone()));
                heap.push(HeapEntry { cost: next_cost, node: edge.to.clone() });
            }
        }
    }

    if !distances.contains_key(&query.to) {
        return None;
    }

    let mut nodes = vec![query.to.clone()];
    let mut relation_types = Vec::new();
    let mut cursor = query.to.clone();
    while cursor != query.from {
        let (prev, relation_type) = predecessors.get(&cursor)?;
        relation_types.push(relation_type.clone());
        nodes.push(prev.clone());
        cursor = prev.clone();
    }
    nodes.reverse();
    relation_types.reverse();

    Some(FoundPath { nodes, relation_types, weight: distances.get(&query.to).copied() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::models::{Entity, Relation};

    fn chain_snapshot() -> Snapshot {
        let entities = vec![Entity::new("a", "x"), Entity::new("b", "x"), Entity::new("c", "x"), Entity::new("d", "x")];
        let relations = vec![Relation::new("a", "b", "knows"), Relation::new("b", "c", "knows"), Relation::new("c", "d", "knows")];
        Snapshot::build(&Graph { entities, relations })
    }

    #[test]
    fn bfs_finds_shortest_chain_path() {
        let snapshot = chain_snapshot();
        let query = PathQuery { from: "a".into(), to: "d".into(), ..PathQuery::default() };
        let report = find_paths(&snapshot, &query);
        let shortest = report.shortest.unwrap();
        assert_eq!(shortest.nodes, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn dfs_matches_bfs_on_a_simple_chain() {
        let snapshot = chain_snapshot();
        let query = PathQuery { from: "a".into(), to: "d".into(), algorithm: PathAlgorithm::Dfs, ..PathQuery::default() };
        let report = find_paths(&snapshot, &query);
        assert_eq!(report.shortest.unwrap().nodes, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn bidirectional_bfs_stitches_a_path() {
        let snapshot = chain_snapshot();
        let query = PathQuery { from: "a".into(), to: "d".into(), algorithm: PathAlgorithm::BidirectionalBfs, max_depth: 4, ..PathQuery::default() };
        let report = find_paths(&snapshot, &query);
        let shortest = report.shortest.expect("a path should be found");
        assert_eq!(shortest.nodes.first(), Some(&"a".to_string()));
        assert_eq!(shortest.nodes.last(), Some(&"d".to_string()));
        assert_eq!(shortest.nodes.len(), 4);
    }

    #[test]
    fn dijkstra_prefers_higher_strength_edges() {
        let entities = vec![Entity::new("a", "x"), Entity::new("b", "x"), Entity::new("c", "x")];
        let relations = vec![
            Relation::new("a", "b", "weak").with_strength(0.1),
            Relation::new("a", "c", "strong").with_strength(1.0),
            Relation::new("c", "b", "strong").with_strength(1.0),
        ];
        let snapshot = Snapshot::build(&Graph { entities, relations });
        let query = PathQuery { from: "a".into(), to: "b".into(), algorithm: PathAlgorithm::Dijkstra, ..PathQuery::default() };
        let report = find_paths(&snapshot, &query);
        let shortest = report.shortest.unwrap();
        assert_eq!(shortest.nodes, vec!["a", "c", "b"]);
    }

    #[test]
    fn exclude_relation_types_filters_out_edges() {
        let snapshot = chain_snapshot();
        let query = PathQuery {
            from: "a".into(),
            to: "d".into(),
            filters: PathFilters { exclude_relation_types: vec!["knows".into()], ..PathFilters::default() },
            ..PathQuery::default()
        };
        let report = find_paths(&snapshot, &query);
        assert!(report.shortest.is_none());
    }

    #[test]
    fn bottleneck_nodes_require_at_least_two_paths() {
        let entities = vec![Entity::new("a", "x"), Entity::new("b", "x"), Entity::new("c", "x"), Entity::new("d", "x")];
        let relations = vec![
            Relation::new("a", "b", "r"),
            Relation::new("a", "c", "r"),
            Relation::new("b", "d", "r"),
            Relation::new("c", "d", "r"),
        ];
        let snapshot = Snapshot::build(&Graph { entities, relations });
        let query = PathQuery { from: "a".into(), to: "d".into(), max_paths: 10, ..PathQuery::default() };
        let report = find_paths(&snapshot, &query);
        assert_eq!(report.all_paths.len(), 2);
        assert!(report.bottleneck_nodes.is_empty());
    }
}
