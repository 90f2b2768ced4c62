//! Reciprocal rank fusion for hybrid search.
//!
//! For each entity `e` appearing in ranking `r`: `score(e) = Σ 1/(k + rank_r(e))`,
//! summed over every source ranking `e` appears in. Unlike [`crate::search::weighted`],
//! RRF needs no score normalization — rank position alone drives the score,
//! which makes it robust to sources whose raw scores live on unrelated scales.

use crate::models::SearchHit;
use std::collections::HashMap;

/// Configuration for RRF fusion.
#[derive(Debug, Clone)]
pub struct RrfConfig {
    /// Dampening constant; `spec.md` §4.4 fixes this at 60.
    pub k: f32,
    /// Maximum number of results to return.
    pub limit: usize,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self { k: 60.0, limit: 10 }
    }
}

impl RrfConfig {
    /// Creates a configuration with the standard `k=60` and the given limit.
    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self { k: 60.0, limit }
    }
}

/// Reciprocal-rank-fusion combiner for hybrid search results.
#[derive(Debug, Clone, Default)]
pub struct RrfFusion {
    config: RrfConfig,
}

impl RrfFusion {
    /// Creates a fusion combiner with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fusion combiner with explicit configuration.
    #[must_use]
    pub const fn with_config(config: RrfConfig) -> Self {
        Self { config }
    }

    /// Fuses graph/text and vector result lists, keyed by entity name.
    #[must_use]
    pub fn fuse(&self, graph_results: &[SearchHit], vector_results: &[SearchHit], limit: usize) -> Vec<SearchHit> {
        self.fuse_multiple(&[graph_results, vector_results], limit)
    }

    /// Fuses any number of ranked lists.
    #[must_use]
    pub fn fuse_multiple(&self, result_lists: &[&[SearchHit]], limit: usize) -> Vec<SearchHit> {
        let k = self.config.k;
        let capacity: usize = result_lists.iter().map(|l| l.len()).sum();
        let mut scores: HashMap<&str, (f32, SearchHit)> = HashMap::with_capacity(capacity);

        for results in result_lists {
            for (rank, hit) in results.iter().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let rrf_score = 1.0 / (k + rank as f32 + 1.0);
                scores
                    .entry(hit.entity.name.as_str())
                    .and_modify(|(score, existing)| {
                        *score += rrf_score;
                        if hit.graph_score.is_some() {
                            existing.graph_score = hit.graph_score;
                        }
                        if hit.vector_score.is_some() {
                            existing.vector_score = hit.vector_score;
                        }
                    })
                    .or_insert_with(|| (rrf_score, hit.clone()));
            }
        }

        let mut fused: Vec<SearchHit> = scores
            .into_values()
            .map(|(score, mut hit)| {
                hit.score = score;
                hit
            })
            .collect();

        fused.sort_unstable_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused.truncate(limit);
        fused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entity;

    fn hit(name: &str, graph: Option<f32>, vector: Option<f32>) -> SearchHit {
        SearchHit {
            entity: Entity::new(name, "thing"),
            score: 0.0,
            graph_score: graph,
            vector_score: vector,
        }
    }

    #[test]
    fn entities_in_both_rankings_outrank_single_source() {
        let graph = vec![hit("a", Some(0.9), None), hit("b", Some(0.5), None), hit("c", Some(0.1), None)];
        let vector = vec![hit("b", None, Some(0.95)), hit("c", None, Some(0.4)), hit("d", None, Some(0.2))];

        let fused = RrfFusion::new().fuse(&graph, &vector, 10);
        let names: Vec<&str> = fused.iter().map(|h| h.entity.name.as_str()).collect();

        assert_eq!(names[0], "b");
        assert_eq!(names[1], "c");
        assert!(names.contains(&"a"));
        assert!(names.contains(&"d"));
    }

    #[test]
    fn merged_hit_keeps_both_component_scores() {
        let graph = vec![hit("a", Some(0.9), None)];
        let vector = vec![hit("a", None, Some(0.8))];
        let fused = RrfFusion::new().fuse(&graph, &vector, 10);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].graph_score, Some(0.9));
        assert_eq!(fused[0].vector_score, Some(0.8));
    }
}
