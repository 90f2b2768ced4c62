//! Routes a query to the graph/text, vector, or hybrid strategy (`spec.md` §4.4).

use crate::embedding::Embedder;
use crate::graph::BitemporalGraphStore;
use crate::models::graph::{Entity, EntitySearchQuery};
use crate::models::{SearchHit, SearchStrategy};
use crate::storage::traits::graph::GraphBackend;
use crate::storage::traits::vector::{VectorIndex, VectorQuery};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

use super::rrf::RrfFusion;
use super::weighted::{WeightedFusion, WeightedFusionConfig};

/// Which merge method the hybrid strategy uses to combine graph and vector
/// rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMethod {
    /// Normalized-weight linear combination (`spec.md` §4.4).
    Weighted,
    /// Reciprocal rank fusion, `k=60`.
    Rrf,
}

/// Configuration for the hybrid strategy.
#[derive(Debug, Clone, Copy)]
pub struct HybridConfig {
    /// Weight applied to the graph/text score under [`MergeMethod::Weighted`].
    pub graph_weight: f32,
    /// Weight applied to the vector score under [`MergeMethod::Weighted`].
    pub vector_weight: f32,
    /// Whether to deduplicate entities appearing in both sources.
    pub deduplication: bool,
    /// Which merge method to use.
    pub merge_method: MergeMethod,
    /// Minimum similarity a vector hit must meet to be considered (default 0.6).
    pub min_similarity: f32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            graph_weight: 0.4,
            vector_weight: 0.6,
            deduplication: true,
            merge_method: MergeMethod::Weighted,
            min_similarity: 0.6,
        }
    }
}

/// Per-request search options.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Pins a strategy; `None` uses the planner's default.
    pub strategy: Option<SearchStrategy>,
    /// Maximum hits to return.
    pub limit: usize,
    /// Restrict results to entities of this type, if one is given.
    pub entity_type: Option<String>,
}

/// The result of a planned search, including whether it downgraded.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResponse {
    /// Ranked hits.
    pub hits: Vec<SearchHit>,
    /// The strategy actually used.
    pub strategy: SearchStrategy,
    /// Set when a hybrid search downgraded to graph-only because the vector
    /// side failed (`spec.md` §7).
    pub partial: bool,
}

/// Dispatches search requests across the graph/text, vector, and hybrid
/// strategies, generic over any [`GraphBackend`].
#[derive(Clone)]
pub struct SearchPlanner<B: GraphBackend> {
    store: BitemporalGraphStore<B>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    embedder: Option<Arc<dyn Embedder>>,
    config: HybridConfig,
}

impl<B: GraphBackend> SearchPlanner<B> {
    /// Creates a planner with only the graph/text strategy available.
    pub fn new(store: BitemporalGraphStore<B>) -> Self {
        Self { store, vector_index: None, embedder: None, config: HybridConfig::default() }
    }

    /// Enables the vector and hybrid strategies.
    #[must_use]
    pub fn with_vector_search(mut self, vector_index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        self.vector_index = Some(vector_index);
        self.embedder = Some(embedder);
        self
    }

    /// Overrides the default hybrid fusion configuration.
    #[must_use]
    pub const fn with_hybrid_config(mut self, config: HybridConfig) -> Self {
        self.config = config;
        self
    }

    /// Strategies available given current configuration: graph/text is
    /// always available; vector and hybrid require both an embedding
    /// provider and a vector index to be configured.
    #[must_use]
    pub fn available_strategies(&self) -> Vec<SearchStrategy> {
        let mut strategies = vec![SearchStrategy::GraphText];
        if self.embedder.is_some() && self.vector_index.is_some() {
            strategies.push(SearchStrategy::Vector);
            strategies.push(SearchStrategy::Hybrid);
        }
        strategies
    }

    /// Runs `query` through the requested (or default) strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected strategy is unavailable or a
    /// downstream storage/embedding call fails.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let strategy = options.strategy.unwrap_or_else(|| self.default_strategy());
        match strategy {
            SearchStrategy::GraphText => Ok(SearchResponse { hits: self.search_graph_text(query, options)?, strategy, partial: false }),
            SearchStrategy::Vector => Ok(SearchResponse { hits: self.search_vector(query, options)?, strategy, partial: false }),
            SearchStrategy::Hybrid => self.search_hybrid(query, options),
        }
    }

    fn default_strategy(&self) -> SearchStrategy {
        if self.embedder.is_some() && self.vector_index.is_some() {
            SearchStrategy::Hybrid
        } else {
            SearchStrategy::GraphText
        }
    }

    fn search_graph_text(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let entity_query = EntitySearchQuery {
            text: Some(query.to_string()),
            limit: options.limit.max(1),
            entity_type: options.entity_type.clone(),
            include_total: false,
            ..Default::default()
        };
        let page = self.store.search_nodes(&entity_query)?;
        Ok(page
            .entities
            .into_iter()
            .enumerate()
            .map(|(rank, entity)| {
                #[allow(clippy::cast_precision_loss)]
                let score = 1.0 / (rank as f32 + 1.0);
                SearchHit::from_graph(entity, score)
            })
            .collect())
    }

    fn search_vector(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let (embedder, vector_index) = self.require_vector_capability()?;
        let query_vector = embedder.embed(query)?;

        let mut tag_filters = HashMap::new();
        if let Some(entity_type) = &options.entity_type {
            tag_filters.insert("entityType".to_string(), entity_type.clone());
        }
        let vector_query = VectorQuery { limit: options.limit.max(1), min_similarity: Some(self.config.min_similarity), tag_filters };

        let hits = vector_index.search(&query_vector, &vector_query)?;
        let names: Vec<String> = hits.iter().map(|h| h.key.clone()).collect();
        let mut by_name: HashMap<String, Entity> = self.store.open_nodes(&names)?.into_iter().map(|e| (e.name.clone(), e)).collect();

        Ok(hits.into_iter().filter_map(|hit| by_name.remove(&hit.key).map(|entity| SearchHit::from_vector(entity, hit.similarity))).collect())
    }

    fn search_hybrid(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let graph_hits = self.search_graph_text(query, options)?;
        let (vector_hits, partial) = match self.search_vector(query, options) {
            Ok(hits) => (hits, false),
            Err(error) => {
                tracing::warn!(%error, "hybrid search: vector strategy unavailable, downgrading to graph-only");
                (Vec::new(), true)
            }
        };

        let limit = if options.limit == 0 { graph_hits.len().max(vector_hits.len()) } else { options.limit };
        let hits = if self.config.deduplication {
            match self.config.merge_method {
                MergeMethod::Weighted => {
                    let cfg = WeightedFusionConfig { graph_weight: self.config.graph_weight, vector_weight: self.config.vector_weight };
                    WeightedFusion::with_config(cfg).fuse(&graph_hits, &vector_hits, limit)
                }
                MergeMethod::Rrf => RrfFusion::new().fuse(&graph_hits, &vector_hits, limit),
            }
        } else {
            let mut combined = graph_hits;
            combined.extend(vector_hits);
            combined.truncate(limit);
            combined
        };

        Ok(SearchResponse { hits, strategy: SearchStrategy::Hybrid, partial })
    }

    fn require_vector_capability(&self) -> Result<(&Arc<dyn Embedder>, &Arc<dyn VectorIndex>)> {
        match (&self.embedder, &self.vector_index) {
            (Some(embedder), Some(vector_index)) => Ok((embedder, vector_index)),
            _ => Err(Error::InvalidArgument("vector search requires both an embedding provider and a vector index".to_string())),
        }
    }
}
