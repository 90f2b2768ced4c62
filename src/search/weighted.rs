//! Weighted-sum fusion for hybrid search (`spec.md` §4.4).
//!
//! `final = w_graph * s_graph + w_vector * s_vector`, weights summing to 1.
//! An entity present in only one source is penalized by the missing term —
//! its absent score contributes `0`, not an imputed average. Each strategy
//! (graph/text, vector) is responsible for handing this module scores
//! already scaled to `[0, 1]`; fusion itself applies no further rescaling,
//! so callers that compose weighted fusion directly with raw scores (as in
//! `spec.md` §8 scenario D) get the literal weighted sum.

use crate::models::SearchHit;
use std::collections::HashMap;

/// Weights for combining graph/text and vector scores.
#[derive(Debug, Clone, Copy)]
pub struct WeightedFusionConfig {
    /// Weight applied to the graph/text score.
    pub graph_weight: f32,
    /// Weight applied to the vector score.
    pub vector_weight: f32,
}

impl Default for WeightedFusionConfig {
    fn default() -> Self {
        Self { graph_weight: 0.4, vector_weight: 0.6 }
    }
}

/// Weighted-sum combiner for hybrid search results.
#[derive(Debug, Clone, Default)]
pub struct WeightedFusion {
    config: WeightedFusionConfig,
}

impl WeightedFusion {
    /// Creates a combiner with the default 0.4/0.6 weights.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a combiner with explicit weights.
    #[must_use]
    pub const fn with_config(config: WeightedFusionConfig) -> Self {
        Self { config }
    }

    /// Fuses graph/text and vector result lists, keyed by entity name.
    #[must_use]
    pub fn fuse(&self, graph_results: &[SearchHit], vector_results: &[SearchHit], limit: usize) -> Vec<SearchHit> {
        let mut merged: HashMap<&str, SearchHit> = HashMap::with_capacity(graph_results.len() + vector_results.len());

        for hit in graph_results {
            merged.entry(hit.entity.name.as_str()).or_insert_with(|| hit.clone());
        }
        for hit in vector_results {
            merged
                .entry(hit.entity.name.as_str())
                .and_modify(|existing| existing.vector_score = hit.vector_score.or(existing.vector_score))
                .or_insert_with(|| hit.clone());
        }

        let mut fused: Vec<SearchHit> = merged
            .into_values()
            .map(|mut hit| {
                let graph_term = self.config.graph_weight * hit.graph_score.unwrap_or(0.0);
                let vector_term = self.config.vector_weight * hit.vector_score.unwrap_or(0.0);
                hit.score = graph_term + vector_term;
                hit
            })
            .collect();

        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        fused.truncate(limit);
        fused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entity;

    fn hit(name: &str, graph: Option<f32>, vector: Option<f32>) -> SearchHit {
        SearchHit { entity: Entity::new(name, "thing"), score: 0.0, graph_score: graph, vector_score: vector }
    }

    #[test]
    fn scenario_d_hybrid_tie_break() {
        let graph = vec![hit("x", Some(0.9), None), hit("y", Some(0.3), None)];
        let vector = vec![hit("y", None, Some(0.95)), hit("x", None, Some(0.10))];

        let fused = WeightedFusion::new().fuse(&graph, &vector, 10);
        let by_name: HashMap<&str, f32> = fused.iter().map(|h| (h.entity.name.as_str(), h.score)).collect();

        assert!((by_name["x"] - 0.42).abs() < 1e-6);
        assert!((by_name["y"] - 0.69).abs() < 1e-6);
        assert_eq!(fused[0].entity.name, "y");
    }

    #[test]
    fn source_only_entity_is_penalized_by_missing_weight() {
        let graph = vec![hit("only_graph", Some(1.0), None)];
        let fused = WeightedFusion::new().fuse(&graph, &[], 10);
        assert!((fused[0].score - 0.4).abs() < 1e-6);
    }
}
