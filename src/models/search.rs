//! Search result and pagination types shared by the search planner (C6) and
//! the pagination facility (C8).

use crate::models::graph::{Entity, Relation};
use serde::{Deserialize, Serialize};

/// A single scored search hit.
///
/// `graph_score` and `vector_score` are populated independently by the
/// strategy that produced them; `score` holds the final (possibly fused)
/// ranking score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matched entity.
    pub entity: Entity,
    /// Final ranking score.
    pub score: f32,
    /// Score from the graph/text strategy, if it contributed.
    pub graph_score: Option<f32>,
    /// Score from the vector strategy, if it contributed.
    pub vector_score: Option<f32>,
}

impl SearchHit {
    /// Creates a hit with only a graph/text score.
    #[must_use]
    pub fn from_graph(entity: Entity, score: f32) -> Self {
        Self {
            entity,
            score,
            graph_score: Some(score),
            vector_score: None,
        }
    }

    /// Creates a hit with only a vector score.
    #[must_use]
    pub fn from_vector(entity: Entity, score: f32) -> Self {
        Self {
            entity,
            score,
            graph_score: None,
            vector_score: Some(score),
        }
    }
}

/// Which search strategy produced a result set, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Substring/regex match via the graph store.
    GraphText,
    /// Dense-vector similarity search.
    Vector,
    /// Both, fused.
    Hybrid,
}

/// Offset/limit or page/pageSize pagination parameters, already normalized.
#[derive(Debug, Clone, Copy)]
pub struct PageParams {
    /// Zero-based row offset.
    pub offset: usize,
    /// Maximum rows to return.
    pub limit: usize,
    /// 1-based page number, if the caller used page/pageSize.
    pub page: Option<usize>,
    /// Page size, if the caller used page/pageSize.
    pub page_size: Option<usize>,
}

/// A page of entities plus the edges induced among them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginatedGraph {
    /// Entities in this page.
    pub entities: Vec<Entity>,
    /// Relations whose both endpoints are in `entities`.
    pub relations: Vec<Relation>,
    /// Offset used for this page.
    pub offset: usize,
    /// Limit used for this page.
    pub limit: usize,
    /// Number of entities actually returned.
    pub returned: usize,
    /// Total matching entities, if requested.
    pub total: Option<usize>,
    /// Whether more results exist beyond this page.
    pub has_more: bool,
    /// Wall-clock time the query took, in milliseconds.
    pub query_time_ms: u64,
    /// 1-based current page number, if page/pageSize was used.
    pub current_page: Option<usize>,
    /// Total number of pages, if `total` and a page size are known.
    pub total_pages: Option<usize>,
}
