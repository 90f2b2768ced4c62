//! Knowledge-graph façade (C9): composes the bitemporal store, vector
//! index, embedding job manager, search planner, pagination, and result
//! cache behind one API, following the teacher's thin-wrapper-over-backend
//! style (`src/services/graph.rs`) generalized to wrap every subsystem
//! instead of just [`GraphBackend`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ChronographConfig;
use crate::embedding::{Embedder, FallbackEmbedder, JobManager, JobOutcome};
use crate::graph::{
    BitemporalGraphStore, EntityInput, EntityUpdate, Graph, ObservationDelta, ObservationResult, RelationInput, RelationUpdate,
};
use crate::models::graph::{Entity, EntitySearchQuery, Relation};
use crate::models::PaginatedGraph;
use crate::pagination::{normalize, CacheConfig, PaginationRequest, ResultCache};
use crate::search::{SearchOptions, SearchPlanner, SearchResponse};
use crate::storage::traits::graph::GraphBackend;
use crate::storage::traits::vector::{SimilarityFunction, VectorHit, VectorIndex, VectorQuery};
use crate::storage::vector::InMemoryVectorIndex;
use crate::storage::{InMemoryGraphBackend, SqliteGraphBackend};
use crate::{Error, Result};

/// Adapts a mutex-guarded `dyn VectorIndex` into a plain `VectorIndex` so the
/// search planner (which only ever needs `&self` access) and the embedding
/// job manager (which needs `&mut self` access) can share one underlying
/// index without either side owning it outright.
struct LockedVectorIndex(Arc<Mutex<dyn VectorIndex>>);

impl LockedVectorIndex {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, dyn VectorIndex>> {
        self.0.lock().map_err(|_| Error::BackendUnavailable("vector index lock poisoned".to_string()))
    }
}

impl VectorIndex for LockedVectorIndex {
    fn dimensions(&self) -> usize {
        self.lock().map(|index| index.dimensions()).unwrap_or(0)
    }

    fn similarity_function(&self) -> SimilarityFunction {
        self.lock().map(|index| index.similarity_function()).unwrap_or_default()
    }

    fn add_vector(&mut self, key: &str, vector: &[f32], tags: HashMap<String, String>) -> Result<()> {
        self.lock()?.add_vector(key, vector, tags)
    }

    fn remove_vector(&mut self, key: &str) -> Result<bool> {
        self.lock()?.remove_vector(key)
    }

    fn search(&self, query_vector: &[f32], query: &VectorQuery) -> Result<Vec<VectorHit>> {
        self.lock()?.search(query_vector, query)
    }

    fn count(&self) -> Result<usize> {
        self.lock()?.count()
    }

    fn clear(&mut self) -> Result<()> {
        self.lock()?.clear()
    }
}

/// Process-wide dependencies the façade owns, assembled once at startup.
struct Context<B: GraphBackend> {
    store: BitemporalGraphStore<B>,
    vector_index: Arc<Mutex<dyn VectorIndex>>,
    job_manager: Arc<JobManager<B>>,
    cache: ResultCache,
    config: ChronographConfig,
}

/// The knowledge-graph façade: the one type application code talks to.
///
/// Generic over any [`GraphBackend`] so the same API works against the
/// `SQLite`-backed or in-memory store; [`KnowledgeGraph::open_sqlite`] and
/// [`KnowledgeGraph::open_in_memory`] are the two supported entry points.
pub struct KnowledgeGraph<B: GraphBackend> {
    context: Arc<Context<B>>,
    planner: SearchPlanner<B>,
}

impl<B: GraphBackend> Clone for KnowledgeGraph<B> {
    fn clone(&self) -> Self {
        Self { context: Arc::clone(&self.context), planner: self.planner.clone() }
    }
}

impl KnowledgeGraph<SqliteGraphBackend> {
    /// Opens (creating if necessary) a `SQLite`-backed knowledge graph at
    /// `config.backend.uri`, with a deterministic fallback embedder.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open_sqlite(config: ChronographConfig) -> Result<Self> {
        let backend = SqliteGraphBackend::new(config.backend.uri.clone())?;
        Ok(Self::assemble(BitemporalGraphStore::new(backend), Arc::new(FallbackEmbedder), config))
    }
}

impl KnowledgeGraph<InMemoryGraphBackend> {
    /// Opens an in-memory knowledge graph, useful for tests and short-lived
    /// sessions.
    #[must_use]
    pub fn open_in_memory(config: ChronographConfig) -> Self {
        Self::assemble(BitemporalGraphStore::new(InMemoryGraphBackend::new()), Arc::new(FallbackEmbedder), config)
    }
}

impl<B: GraphBackend + 'static> KnowledgeGraph<B> {
    /// Assembles a façade from an already-constructed store, embedder, and
    /// configuration, wiring up the vector index, job manager, planner, and
    /// cache per `config`.
    fn assemble(store: BitemporalGraphStore<B>, embedder: Arc<dyn Embedder>, config: ChronographConfig) -> Self {
        // Sized from the embedder, not `config.vector.dimensions`: the index
        // must match whatever the embedder actually produces (0 for the
        // fallback embedder, disabling vector search until a real one is
        // installed via `with_embedder`).
        let vector_index: Arc<Mutex<dyn VectorIndex>> =
            Arc::new(Mutex::new(InMemoryVectorIndex::in_memory(embedder.dimensions(), config.vector.similarity_function)));

        let job_manager = Arc::new(JobManager::with_rate_limit(
            store.clone(),
            Arc::clone(&vector_index),
            Arc::clone(&embedder),
            config.embedding_rate_limit,
        ));

        let planner_vector_index: Arc<dyn VectorIndex> = Arc::new(LockedVectorIndex(Arc::clone(&vector_index)));
        let planner = SearchPlanner::new(store.clone()).with_vector_search(planner_vector_index, embedder).with_hybrid_config(config.hybrid);

        let cache = ResultCache::new(config.cache);

        Self { context: Arc::new(Context { store, vector_index, job_manager, cache, config }), planner }
    }

    /// Replaces the default [`FallbackEmbedder`] with a caller-supplied one
    /// (e.g. `FastEmbedEmbedder`), rebuilding the planner and job manager
    /// around it. Must be called before any entity is created, since
    /// existing vectors were written at the old embedder's dimensionality.
    #[must_use]
    pub fn with_embedder(self, embedder: Arc<dyn Embedder>) -> Self {
        let store = self.context.store.clone();
        let config = self.context.config.clone();
        let vector_index: Arc<Mutex<dyn VectorIndex>> =
            Arc::new(Mutex::new(InMemoryVectorIndex::in_memory(embedder.dimensions(), config.vector.similarity_function)));

        let job_manager = Arc::new(JobManager::with_rate_limit(store.clone(), Arc::clone(&vector_index), Arc::clone(&embedder), config.embedding_rate_limit));
        let planner_vector_index: Arc<dyn VectorIndex> = Arc::new(LockedVectorIndex(Arc::clone(&vector_index)));
        let planner = SearchPlanner::new(store.clone()).with_vector_search(planner_vector_index, embedder).with_hybrid_config(config.hybrid);

        Self { context: Arc::new(Context { store, vector_index, job_manager, cache: ResultCache::new(config.cache), config }), planner }
    }

    /// Creates new entities, then schedules a (best-effort) embedding job
    /// for each one.
    pub fn create_entities(&self, inputs: Vec<EntityInput>) -> Result<Vec<Entity>> {
        let names: Vec<String> = inputs.iter().map(|input| input.name.clone()).collect();
        let entities = self.context.store.create_entities(inputs)?;
        for name in names {
            self.context.job_manager.schedule_entity_embedding(&name, 1);
        }
        Ok(entities)
    }

    /// Creates or merges relations. Relations are not independently
    /// embedded, so no embedding job is scheduled.
    pub fn create_relations(&self, inputs: Vec<RelationInput>) -> Result<Vec<Relation>> {
        self.context.store.create_relations(inputs)
    }

    /// Adds observations to existing entities, scheduling an embedding job
    /// for each entity whose observation set actually changed.
    pub fn add_observations(&self, deltas: Vec<ObservationDelta>) -> Result<Vec<ObservationResult>> {
        let results = self.context.store.add_observations(deltas)?;
        for result in &results {
            if !result.changed.is_empty() {
                self.context.job_manager.schedule_entity_embedding(&result.name, 1);
            }
        }
        Ok(results)
    }

    /// Removes observations from existing entities, re-embedding each
    /// entity whose observation set actually changed.
    pub fn delete_observations(&self, deltas: Vec<ObservationDelta>) -> Result<Vec<ObservationResult>> {
        let results = self.context.store.delete_observations(deltas)?;
        for result in &results {
            if !result.changed.is_empty() {
                self.context.job_manager.schedule_entity_embedding(&result.name, 1);
            }
        }
        Ok(results)
    }

    /// Updates an entity. Re-embedding is skipped when the update only
    /// changes `entity_type`, since observations (the embedded content)
    /// were untouched.
    pub fn update_entity(&self, name: &str, update: EntityUpdate) -> Result<Entity> {
        let observations_changed = update.observations.is_some();
        let entity = self.context.store.update_entity(name, update)?;
        if observations_changed {
            self.context.job_manager.schedule_entity_embedding(name, 2);
        }
        Ok(entity)
    }

    /// Updates a relation's mutable fields.
    pub fn update_relation(&self, update: RelationUpdate) -> Result<Relation> {
        self.context.store.update_relation(update)
    }

    /// Deletes entities, fanning the removal out to the vector index so
    /// stale embeddings never surface in vector search.
    pub fn delete_entities(&self, names: &[String]) -> Result<usize> {
        let deleted = self.context.store.delete_entities(names)?;
        if let Ok(mut index) = self.context.vector_index.lock() {
            for name in names {
                let _ = index.remove_vector(name);
            }
        }
        Ok(deleted)
    }

    /// Deletes relations by `(from, to, relation_type)` triple.
    pub fn delete_relations(&self, triples: &[(String, String, String)]) -> Result<usize> {
        self.context.store.delete_relations(triples)
    }

    /// Looks up an entity by name.
    pub fn get_entity(&self, name: &str) -> Result<Option<Entity>> {
        self.context.store.get_entity(name)
    }

    /// Looks up a relation by triple.
    pub fn get_relation(&self, from: &str, to: &str, relation_type: &str) -> Result<Option<Relation>> {
        self.context.store.get_relation(from, to, relation_type)
    }

    /// Returns every historical version of an entity, oldest first.
    pub fn get_entity_history(&self, name: &str) -> Result<Vec<Entity>> {
        self.context.store.get_entity_history(name)
    }

    /// Returns every historical version of a relation, oldest first.
    pub fn get_relation_history(&self, from: &str, to: &str, relation_type: &str) -> Result<Vec<Relation>> {
        self.context.store.get_relation_history(from, to, relation_type)
    }

    /// Reconstructs the graph as of a past transaction-time instant.
    pub fn get_graph_at_time(&self, timestamp: i64) -> Result<Graph> {
        self.context.store.get_graph_at_time(timestamp)
    }

    /// Returns the current graph with relation confidence decayed per the
    /// configured half-life, or the undecayed graph if decay is disabled.
    pub fn get_decayed_graph(&self) -> Result<Graph> {
        if !self.context.config.decay_enabled {
            return self.context.store.load_graph();
        }
        self.context.store.get_decayed_graph(&self.context.config.decay)
    }

    /// Full graph/text, vector, or hybrid search, cached by
    /// `(query, options)` for the configured TTL.
    pub fn search(&self, query: &str, options: SearchOptions) -> Result<SearchResponse> {
        let cache_key = ResultCache::key("search", &format!("{query}|{options:?}"));
        if let Some(cached) = self.context.cache.get(&cache_key)
            && let Ok(response) = serde_json::from_slice::<SearchResponse>(&cached)
        {
            return Ok(response);
        }

        let response = self.planner.search(query, &options)?;
        if let Ok(serialized) = serde_json::to_vec(&response) {
            self.context.cache.put(cache_key, serialized);
        }
        Ok(response)
    }

    /// Substring/regex node search with normalized pagination.
    pub fn search_nodes(&self, mut query: EntitySearchQuery, pagination: PaginationRequest) -> Result<PaginatedGraph> {
        let params = normalize(pagination, self.context.config.pagination.max_limit, self.context.config.pagination.max_page_size)?;
        query.offset = params.offset;
        query.limit = params.limit;
        self.context.store.search_nodes(&query)
    }

    /// Returns an adjacency snapshot of the current graph for use with
    /// [`crate::analytics`].
    pub fn analytics_snapshot(&self) -> Result<crate::analytics::Snapshot> {
        let graph = self.context.store.load_graph()?;
        Ok(crate::analytics::Snapshot::build(&graph))
    }

    /// Drains up to `max_n` queued embedding jobs. Callers are expected to
    /// invoke this periodically from a background task; the façade never
    /// spawns one itself, matching the teacher's synchronous-service style.
    pub fn process_embedding_jobs(&self, max_n: usize) -> Vec<JobOutcome> {
        self.context.job_manager.process_jobs(max_n)
    }

    /// Result-cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> crate::pagination::CacheStats {
        self.context.cache.stats()
    }

    /// Runs `search` with a deadline and cooperative cancellation, following
    /// `spec.md` §5's cancellation/deadline contract. Returns
    /// [`Error::Cancelled`] if `cancel` fires before the search runs, or a
    /// timeout error surfaced as [`Error::BackendUnavailable`] if the
    /// deadline elapses first.
    pub async fn search_with_deadline(&self, query: &str, options: SearchOptions, deadline: Duration, cancel: CancellationToken) -> Result<SearchResponse> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled("search cancelled before it started".to_string()));
        }
        let this = self.clone();
        let query = query.to_string();
        tokio::time::timeout(deadline, async move { this.search(&query, options) })
            .await
            .map_err(|_| Error::BackendUnavailable("search exceeded its deadline".to_string()))?
    }

    /// Gracefully shuts the façade down: waits up to `grace_window` for
    /// in-flight embedding jobs to finish, then drops anything still queued.
    /// Idempotent.
    pub fn shutdown(&self, grace_window: Duration) {
        self.context.job_manager.shutdown(grace_window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_entities_schedules_embedding_jobs() {
        let kg = KnowledgeGraph::open_in_memory(ChronographConfig::default());
        kg.create_entities(vec![EntityInput { name: "alice".to_string(), entity_type: "person".to_string(), observations: vec!["likes tea".to_string()] }]).unwrap();
        assert_eq!(kg.context.job_manager.queued_len(), 1);
    }

    #[test]
    fn update_entity_type_only_does_not_schedule_a_job() {
        let kg = KnowledgeGraph::open_in_memory(ChronographConfig::default());
        kg.create_entities(vec![EntityInput { name: "alice".to_string(), entity_type: "person".to_string(), observations: vec!["likes tea".to_string()] }]).unwrap();
        kg.context.job_manager.process_jobs(10);
        assert_eq!(kg.context.job_manager.queued_len(), 0);

        kg.update_entity("alice", EntityUpdate { entity_type: Some("contact".to_string()), observations: None, changed_by: None }).unwrap();
        assert_eq!(kg.context.job_manager.queued_len(), 0, "entity_type-only updates should not trigger re-embedding");
    }

    #[test]
    fn delete_entities_removes_the_vector_too() {
        let kg = KnowledgeGraph::open_in_memory(ChronographConfig::default());
        kg.create_entities(vec![EntityInput { name: "alice".to_string(), entity_type: "person".to_string(), observations: vec!["likes tea".to_string()] }]).unwrap();
        kg.context.job_manager.process_jobs(10);
        assert_eq!(kg.context.vector_index.lock().unwrap().count().unwrap(), 1);

        kg.delete_entities(&["alice".to_string()]).unwrap();
        assert_eq!(kg.context.vector_index.lock().unwrap().count().unwrap(), 0);
    }

    #[test]
    fn search_hits_are_cached_on_second_call() {
        let kg = KnowledgeGraph::open_in_memory(ChronographConfig::default());
        kg.create_entities(vec![EntityInput { name: "alice".to_string(), entity_type: "person".to_string(), observations: vec!["likes tea".to_string()] }]).unwrap();

        let first = kg.search("alice", SearchOptions { limit: 10, ..Default::default() }).unwrap();
        assert_eq!(kg.cache_stats().misses, 1);

        let second = kg.search("alice", SearchOptions { limit: 10, ..Default::default() }).unwrap();
        assert_eq!(kg.cache_stats().hits, 1);
        assert_eq!(first.hits.len(), second.hits.len());
    }
}
