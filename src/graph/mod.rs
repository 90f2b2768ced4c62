//! Bitemporal graph store (C3): the versioning protocol on top of any
//! [`GraphBackend`].
//!
//! [`GraphBackend`] (C1) knows how to persist and query entity/relation
//! *rows*. It has no notion of "mutating" an entity — every write is a new
//! row. [`BitemporalGraphStore`] is the layer that turns "add an
//! observation" or "update this entity" into the close-old-row /
//! insert-new-row protocol described in `spec.md` §4.1, generically over any
//! backend. This mirrors the teacher's `GraphService<B: GraphBackend>`
//! wrapping pattern (`services/graph.rs`), but the versioning logic here is
//! new: the teacher's service mutated rows in place, this one never does.

use crate::models::graph::{EmbeddingRecord, Entity, EntitySearchQuery, Relation, VersionId};
use crate::models::PaginatedGraph;
use crate::models::temporal::{BitemporalPoint, TransactionTime, ValidTimeRange, current_timestamp};
use crate::storage::traits::graph::GraphBackend;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A full snapshot of current entities and relations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    /// Every currently-valid entity.
    pub entities: Vec<Entity>,
    /// Every currently-valid relation.
    pub relations: Vec<Relation>,
}

/// Input to [`BitemporalGraphStore::create_entities`].
#[derive(Debug, Clone)]
pub struct EntityInput {
    /// Entity name, unique among current entities.
    pub name: String,
    /// Short type label.
    pub entity_type: String,
    /// Initial observations (deduplicated on insert).
    pub observations: Vec<String>,
}

/// Input to [`BitemporalGraphStore::create_relations`].
#[derive(Debug, Clone, Default)]
pub struct RelationInput {
    /// Source entity name.
    pub from: String,
    /// Target entity name.
    pub to: String,
    /// Relation type label.
    pub relation_type: String,
    /// Optional strength in `[0, 1]`.
    pub strength: Option<f32>,
    /// Optional confidence in `[0, 1]`.
    pub confidence: Option<f32>,
    /// Extra metadata fields, coalesced onto an existing relation on merge.
    pub metadata: HashMap<String, JsonValue>,
}

/// An observation add/delete request for one entity.
#[derive(Debug, Clone)]
pub struct ObservationDelta {
    /// Entity name.
    pub name: String,
    /// Observations to add or remove.
    pub observations: Vec<String>,
}

/// Outcome of an [`BitemporalGraphStore::add_observations`] or
/// [`BitemporalGraphStore::delete_observations`] call for one entity.
#[derive(Debug, Clone)]
pub struct ObservationResult {
    /// Entity name.
    pub name: String,
    /// Observations actually added or removed; empty if the call was a no-op.
    pub changed: Vec<String>,
}

/// Partial update applied to an entity's current version.
#[derive(Debug, Clone, Default)]
pub struct EntityUpdate {
    /// New type label, if changing.
    pub entity_type: Option<String>,
    /// Full replacement observation list (deduplicated), if changing.
    pub observations: Option<Vec<String>>,
    /// New audit tag, if changing.
    pub changed_by: Option<String>,
}

/// Partial update applied to a relation's current version.
#[derive(Debug, Clone, Default)]
pub struct RelationUpdate {
    /// Source entity name.
    pub from: String,
    /// Target entity name.
    pub to: String,
    /// Relation type label.
    pub relation_type: String,
    /// New strength, if changing.
    pub strength: Option<f32>,
    /// New confidence, if changing.
    pub confidence: Option<f32>,
    /// Metadata fields to merge in, if any.
    pub metadata: Option<HashMap<String, JsonValue>>,
    /// New audit tag, if changing.
    pub changed_by: Option<String>,
}

/// Parameters for [`BitemporalGraphStore::get_decayed_graph`].
#[derive(Debug, Clone, Copy)]
pub struct DecayConfig {
    /// Half-life of relation confidence, in days.
    pub half_life_days: f64,
    /// Confidence floor; decay never drops below this.
    pub min_confidence: f32,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            half_life_days: 30.0,
            min_confidence: 0.1,
        }
    }
}

/// The bitemporal versioning service, generic over any [`GraphBackend`].
pub struct BitemporalGraphStore<B: GraphBackend> {
    backend: Arc<B>,
}

impl<B: GraphBackend> Clone for BitemporalGraphStore<B> {
    fn clone(&self) -> Self {
        Self { backend: Arc::clone(&self.backend) }
    }
}

impl<B: GraphBackend> BitemporalGraphStore<B> {
    /// Wraps a freshly constructed backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Wraps a backend already shared elsewhere (e.g. with the vector index's
    /// companion embedding job manager).
    #[must_use]
    pub fn with_shared_backend(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Loads every current entity and relation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable.
    pub fn load_graph(&self) -> Result<Graph> {
        let mut entities = Vec::new();
        for name in self.backend.list_entity_names()? {
            if let Some(entity) = self.backend.get_current_entity(&name)? {
                entities.push(entity);
            }
        }
        let relations = self.backend.all_current_relations()?;
        Ok(Graph { entities, relations })
    }

    /// Replaces the entire graph with `graph`. Used only by bootstrap/tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear or any insert fails.
    pub fn save_graph(&self, graph: &Graph) -> Result<()> {
        self.backend.clear()?;
        for entity in &graph.entities {
            self.backend.insert_entity_version(entity)?;
        }
        for relation in &graph.relations {
            self.backend.insert_relation_version(relation)?;
        }
        Ok(())
    }

    /// Creates entities, silently skipping any name that already has a
    /// current version. Idempotent under retries.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    pub fn create_entities(&self, inputs: Vec<EntityInput>) -> Result<Vec<Entity>> {
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            if self.backend.get_current_entity(&input.name)?.is_some() {
                tracing::debug!(name = %input.name, "create_entities: entity already current, skipping");
                continue;
            }
            let entity = Entity::new(input.name, input.entity_type).with_observations(input.observations);
            self.backend.insert_entity_version(&entity)?;
            created.push(entity);
        }
        Ok(created)
    }

    /// Creates or merges relations. Both endpoints must have a current entity
    /// row; relations whose endpoints are missing are skipped with a
    /// warning. Merging on an existing `(from, to, relation_type)` triple
    /// increments `version` and coalesces non-null fields, which makes this
    /// call idempotent (`spec.md` §8 property 5).
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    pub fn create_relations(&self, inputs: Vec<RelationInput>) -> Result<Vec<Relation>> {
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            if self.backend.get_current_entity(&input.from)?.is_none() || self.backend.get_current_entity(&input.to)?.is_none() {
                tracing::warn!(from = %input.from, to = %input.to, relation_type = %input.relation_type, "create_relations: missing endpoint, skipping");
                continue;
            }

            let merged = match self.backend.get_current_relation(&input.from, &input.to, &input.relation_type)? {
                Some(existing) => self.merge_relation(existing, input)?,
                None => {
                    let mut relation = Relation::new(input.from, input.to, input.relation_type);
                    relation.strength = input.strength;
                    relation.confidence = input.confidence;
                    relation.metadata = input.metadata;
                    self.backend.insert_relation_version(&relation)?;
                    relation
                }
            };
            created.push(merged);
        }
        Ok(created)
    }

    fn merge_relation(&self, existing: Relation, input: RelationInput) -> Result<Relation> {
        let now = current_timestamp();
        let mut next = existing.clone();
        next.id = VersionId::generate();
        next.version = existing.version + 1;
        next.updated_at = now;
        next.valid_time = ValidTimeRange::from(now);
        next.transaction_time = TransactionTime::now();
        if input.strength.is_some() {
            next.strength = input.strength;
        }
        if input.confidence.is_some() {
            next.confidence = input.confidence;
        }
        for (key, value) in input.metadata {
            next.metadata.insert(key, value);
        }

        self.backend.close_relation_valid_time(&existing.from, &existing.to, &existing.relation_type, now)?;
        self.backend.insert_relation_version(&next)?;
        Ok(next)
    }

    /// Adds observations to each listed entity, deduplicating against what is
    /// already present. An entity with nothing new to add is a no-op — no
    /// version is written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if a named entity has no current version,
    /// or another error if a storage operation fails.
    pub fn add_observations(&self, deltas: Vec<ObservationDelta>) -> Result<Vec<ObservationResult>> {
        let mut results = Vec::with_capacity(deltas.len());
        for delta in deltas {
            let current = self.require_current_entity(&delta.name)?;
            let mut merged = current.observations.clone();
            let mut added = Vec::new();
            for observation in delta.observations {
                if !merged.contains(&observation) {
                    merged.push(observation.clone());
                    added.push(observation);
                }
            }
            if added.is_empty() {
                results.push(ObservationResult { name: delta.name, changed: Vec::new() });
                continue;
            }
            let mut next = current.clone();
            next.observations = merged;
            self.commit_entity_revision(&current, next)?;
            results.push(ObservationResult { name: delta.name, changed: added });
        }
        Ok(results)
    }

    /// Removes observations from each listed entity. An entity with none of
    /// the named observations present is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if a named entity has no current version,
    /// or another error if a storage operation fails.
    pub fn delete_observations(&self, deltas: Vec<ObservationDelta>) -> Result<Vec<ObservationResult>> {
        let mut results = Vec::with_capacity(deltas.len());
        for delta in deltas {
            let current = self.require_current_entity(&delta.name)?;
            let to_remove: HashSet<&str> = delta.observations.iter().map(String::as_str).collect();
            let remaining: Vec<String> = current.observations.iter().filter(|o| !to_remove.contains(o.as_str())).cloned().collect();
            if remaining.len() == current.observations.len() {
                results.push(ObservationResult { name: delta.name, changed: Vec::new() });
                continue;
            }
            let removed: Vec<String> = current.observations.iter().filter(|o| to_remove.contains(o.as_str())).cloned().collect();
            let mut next = current.clone();
            next.observations = remaining;
            self.commit_entity_revision(&current, next)?;
            results.push(ObservationResult { name: delta.name, changed: removed });
        }
        Ok(results)
    }

    /// Merges `update` over the current version of `name` and commits a new
    /// version. A no-op update (nothing actually changes) still bumps the
    /// version, since the caller explicitly asked for an update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `name` has no current version.
    pub fn update_entity(&self, name: &str, update: EntityUpdate) -> Result<Entity> {
        let current = self.require_current_entity(name)?;
        let mut next = current.clone();
        if let Some(entity_type) = update.entity_type {
            next.entity_type = entity_type;
        }
        if let Some(observations) = update.observations {
            let mut deduped = Vec::with_capacity(observations.len());
            for observation in observations {
                if !deduped.contains(&observation) {
                    deduped.push(observation);
                }
            }
            next.observations = deduped;
        }
        if let Some(changed_by) = update.changed_by {
            next.changed_by = Some(changed_by);
        }
        self.commit_entity_revision(&current, next)
    }

    /// Closes the current version of a relation and inserts a new one with
    /// `update`'s fields merged in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the triple has no current version.
    pub fn update_relation(&self, update: RelationUpdate) -> Result<Relation> {
        let Some(current) = self.backend.get_current_relation(&update.from, &update.to, &update.relation_type)? else {
            return Err(Error::NotFound(format!("relation '{}' -[{}]-> '{}'", update.from, update.relation_type, update.to)));
        };
        let now = current_timestamp();
        let mut next = current.clone();
        next.id = VersionId::generate();
        next.version = current.version + 1;
        next.updated_at = now;
        next.valid_time = ValidTimeRange::from(now);
        next.transaction_time = TransactionTime::now();
        if update.strength.is_some() {
            next.strength = update.strength;
        }
        if update.confidence.is_some() {
            next.confidence = update.confidence;
        }
        if let Some(metadata) = update.metadata {
            for (key, value) in metadata {
                next.metadata.insert(key, value);
            }
        }
        if let Some(changed_by) = update.changed_by {
            next.changed_by = Some(changed_by);
        }

        self.backend.close_relation_valid_time(&update.from, &update.to, &update.relation_type, now)?;
        self.backend.insert_relation_version(&next)?;
        Ok(next)
    }

    /// Hard-deletes entities and every relation currently incident to them
    /// (`spec.md` §8 property 9, cascade-delete).
    ///
    /// Cascade coverage is limited to relations that are still current at
    /// the time of deletion: `GraphBackend` has no operation to enumerate a
    /// name's entire relation history independent of its current row, so an
    /// already-closed historical relation referencing a hard-deleted entity
    /// is not separately purged. In practice this only matters for
    /// historical audit queries over a name that both had a relation closed
    /// and was later deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    pub fn delete_entities(&self, names: &[String]) -> Result<usize> {
        let mut count = 0;
        for name in names {
            for relation in self.backend.relations_for_entity(name)? {
                self.backend.delete_relation(&relation.from, &relation.to, &relation.relation_type)?;
            }
            if self.backend.delete_entity(name)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Soft-deletes relations: sets `valid_time.end = now` on the current
    /// row, leaving history intact. Deleting a triple with no current
    /// version is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    pub fn delete_relations(&self, triples: &[(String, String, String)]) -> Result<usize> {
        let now = current_timestamp();
        let mut count = 0;
        for (from, to, relation_type) in triples {
            if self.backend.get_current_relation(from, to, relation_type)?.is_some() {
                self.backend.close_relation_valid_time(from, to, relation_type, now)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Returns the current version of an entity, or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub fn get_entity(&self, name: &str) -> Result<Option<Entity>> {
        self.backend.get_current_entity(name)
    }

    /// Returns the current version of a relation, or `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub fn get_relation(&self, from: &str, to: &str, relation_type: &str) -> Result<Option<Relation>> {
        self.backend.get_current_relation(from, to, relation_type)
    }

    /// Returns every version of an entity, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub fn get_entity_history(&self, name: &str) -> Result<Vec<Entity>> {
        self.backend.get_entity_history(name)
    }

    /// Returns every version of a relation, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub fn get_relation_history(&self, from: &str, to: &str, relation_type: &str) -> Result<Vec<Relation>> {
        self.backend.get_relation_history(from, to, relation_type)
    }

    /// Reconstructs the graph as it stood at `timestamp`.
    ///
    /// Entities are exact: every name still known to the backend is checked
    /// via [`GraphBackend::get_entity_at`], which consults full version
    /// history. Relations are approximated from each triple's *current*
    /// version only — a relation that was valid at `timestamp` but has since
    /// been superseded by a newer version of the same triple will not
    /// appear, since `GraphBackend` exposes no "all historical triples"
    /// enumeration. See `DESIGN.md`.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage operation fails.
    pub fn get_graph_at_time(&self, timestamp: i64) -> Result<Graph> {
        let point = BitemporalPoint::new(timestamp, current_timestamp());
        let mut entities = Vec::new();
        for name in self.backend.list_entity_names()? {
            if let Some(entity) = self.backend.get_entity_at(&name, &point)? {
                entities.push(entity);
            }
        }
        let names: HashSet<&str> = entities.iter().map(|e| e.name.as_str()).collect();
        let relations = self
            .backend
            .all_current_relations()?
            .into_iter()
            .filter(|r| r.is_valid_at(timestamp) && names.contains(r.from.as_str()) && names.contains(r.to.as_str()))
            .collect();
        Ok(Graph { entities, relations })
    }

    /// Returns the current graph with each relation's confidence decayed per
    /// `config` (`spec.md` §4.1 decay view). Entities are untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if loading the graph fails.
    pub fn get_decayed_graph(&self, config: &DecayConfig) -> Result<Graph> {
        let mut graph = self.load_graph()?;
        let now_ms = current_timestamp() * 1000;
        for relation in &mut graph.relations {
            if let Some(decayed) = relation.decayed_confidence(now_ms, config.half_life_days, config.min_confidence) {
                relation.confidence = Some(decayed);
            }
        }
        Ok(graph)
    }

    /// Searches current entities and returns a page plus the relations
    /// induced among the returned page (never a random slice of the whole
    /// graph).
    ///
    /// # Errors
    ///
    /// Returns an error if the query is malformed (e.g. bad regex) or a
    /// storage operation fails.
    pub fn search_nodes(&self, query: &EntitySearchQuery) -> Result<PaginatedGraph> {
        let started = std::time::Instant::now();
        let entities = self.backend.search_entities(query)?;
        let total = if query.include_total { Some(self.backend.count_entities(query)?) } else { None };

        let names: HashSet<&str> = entities.iter().map(|e| e.name.as_str()).collect();
        let relations = self
            .backend
            .all_current_relations()?
            .into_iter()
            .filter(|r| names.contains(r.from.as_str()) && names.contains(r.to.as_str()))
            .collect();

        let returned = entities.len();
        let has_more = match total {
            Some(total) => query.offset + returned < total,
            None => query.limit > 0 && returned == query.limit,
        };
        let (current_page, total_pages) = if query.limit > 0 {
            let page = query.offset / query.limit + 1;
            (Some(page), total.map(|t| t.div_ceil(query.limit)))
        } else {
            (None, None)
        };

        Ok(PaginatedGraph {
            entities,
            relations,
            offset: query.offset,
            limit: query.limit,
            returned,
            total,
            has_more,
            query_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            current_page,
            total_pages,
        })
    }

    /// Writes a freshly computed embedding onto an entity's current version.
    /// Bumps the version like any other write, but does not touch incident
    /// relations — an embedding refresh is not an identity or observation
    /// change (`spec.md` §4.3).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `name` has no current version.
    pub fn update_entity_embedding(&self, name: &str, embedding: EmbeddingRecord) -> Result<Entity> {
        let current = self.require_current_entity(name)?;
        let now = current_timestamp();
        let mut next = current.clone();
        next.id = VersionId::generate();
        next.version = current.version + 1;
        next.embedding = Some(embedding);
        next.updated_at = now;
        next.valid_time = ValidTimeRange::from(now);
        next.transaction_time = TransactionTime::now();

        self.backend.close_entity_valid_time(name, now)?;
        self.backend.insert_entity_version(&next)?;
        Ok(next)
    }

    /// Materializes full entity rows for a set of names, skipping any that
    /// no longer have a current version. Used by the vector search strategy
    /// (C6) after a similarity search returns bare keys.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails.
    pub fn open_nodes(&self, names: &[String]) -> Result<Vec<Entity>> {
        let mut entities = Vec::with_capacity(names.len());
        for name in names {
            if let Some(entity) = self.backend.get_current_entity(name)? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    fn require_current_entity(&self, name: &str) -> Result<Entity> {
        self.backend.get_current_entity(name)?.ok_or_else(|| Error::NotFound(format!("entity '{name}'")))
    }

    /// The shared close-old-row / insert-new-row / re-version-incident-relations
    /// protocol (`spec.md` §4.1). `next` should already carry the caller's
    /// intended field changes; this fills in the bookkeeping fields
    /// (`id`, `version`, timestamps) and performs the transaction.
    fn commit_entity_revision(&self, current: &Entity, mut next: Entity) -> Result<Entity> {
        let now = current_timestamp();
        next.id = VersionId::generate();
        next.name = current.name.clone();
        next.version = current.version + 1;
        next.created_at = current.created_at;
        next.updated_at = now;
        next.valid_time = ValidTimeRange::from(now);
        next.transaction_time = TransactionTime::now();

        let incident = self.backend.relations_for_entity(&current.name)?;

        self.backend.close_entity_valid_time(&current.name, now)?;
        self.backend.insert_entity_version(&next)?;

        for relation in incident {
            if !relation.is_current() {
                continue;
            }
            let mut bumped = relation.clone();
            bumped.id = VersionId::generate();
            bumped.version = relation.version + 1;
            bumped.updated_at = now;
            bumped.valid_time = ValidTimeRange::from(now);
            bumped.transaction_time = TransactionTime::now();
            self.backend.close_relation_valid_time(&relation.from, &relation.to, &relation.relation_type, now)?;
            self.backend.insert_relation_version(&bumped)?;
        }

        Ok(next)
    }
}
