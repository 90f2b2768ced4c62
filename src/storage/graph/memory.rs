//! In-memory graph backend for testing.
//!
//! Provides a fast, non-persistent implementation of [`GraphBackend`] for use
//! in unit tests and development scenarios. Every version row ever inserted
//! is retained so that history and point-in-time queries work the same way
//! as the `SQLite` backend.

// Allow collapsible_if for clearer nested conditional logic in query matching.
#![allow(clippy::collapsible_if)]
// Allow cognitive_complexity for graph traversal algorithms.
#![allow(clippy::cognitive_complexity)]

use crate::Error;
use crate::Result;
use crate::models::graph::{Entity, EntitySearchQuery, Relation};
use crate::models::temporal::BitemporalPoint;
use crate::storage::traits::graph::{GraphBackend, GraphStats};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::RwLock;

fn poisoned(operation: &str) -> Error {
    Error::BackendUnavailable(format!("{operation}: in-memory lock poisoned"))
}

fn triple_key(from: &str, to: &str, relation_type: &str) -> String {
    format!("{from}\u{0}{to}\u{0}{relation_type}")
}

fn entity_matches(entity: &Entity, query: &EntitySearchQuery) -> bool {
    if let Some(ref et) = query.entity_type {
        if entity.entity_type != *et {
            return false;
        }
    }
    if let Some(ref text) = query.text {
        let haystack = format!(
            "{}\n{}\n{}",
            entity.name,
            entity.entity_type,
            entity.observation_text()
        );
        if query.is_regex {
            let matched = RegexBuilder::new(text)
                .case_insensitive(!query.case_sensitive)
                .build()
                .map(|re| re.is_match(&haystack))
                .unwrap_or(false);
            if !matched {
                return false;
            }
        } else if query.case_sensitive {
            if !haystack.contains(text.as_str()) {
                return false;
            }
        } else if !haystack.to_lowercase().contains(&text.to_lowercase()) {
            return false;
        }
    }
    true
}

/// In-memory graph backend for testing.
///
/// Uses `RwLock` for thread-safe access with reader-writer semantics.
/// Data is not persisted between runs.
#[derive(Debug, Default)]
pub struct InMemoryGraphBackend {
    // All versions for a name, oldest first.
    entities: RwLock<HashMap<String, Vec<Entity>>>,
    // All versions for a (from, to, relation_type) triple, oldest first.
    relations: RwLock<HashMap<String, Vec<Relation>>>,
}

impl InMemoryGraphBackend {
    /// Creates a new empty in-memory graph backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of distinct entity names with at least one version.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns the number of distinct relation triples with at least one version.
    #[must_use]
    pub fn relation_count(&self) -> usize {
        self.relations.read().map(|r| r.len()).unwrap_or(0)
    }
}

impl GraphBackend for InMemoryGraphBackend {
    fn insert_entity_version(&self, entity: &Entity) -> Result<()> {
        let mut entities = self.entities.write().map_err(|_| poisoned("insert_entity_version"))?;
        entities.entry(entity.name.clone()).or_default().push(entity.clone());
        Ok(())
    }

    fn get_current_entity(&self, name: &str) -> Result<Option<Entity>> {
        let entities = self.entities.read().map_err(|_| poisoned("get_current_entity"))?;
        Ok(entities
            .get(name)
            .and_then(|versions| versions.iter().rev().find(|e| e.is_current()))
            .cloned())
    }

    fn get_entity_history(&self, name: &str) -> Result<Vec<Entity>> {
        let entities = self.entities.read().map_err(|_| poisoned("get_entity_history"))?;
        let mut history = entities.get(name).cloned().unwrap_or_default();
        history.reverse();
        Ok(history)
    }

    fn close_entity_valid_time(&self, name: &str, end_time: i64) -> Result<()> {
        let mut entities = self.entities.write().map_err(|_| poisoned("close_entity_valid_time"))?;
        if let Some(versions) = entities.get_mut(name) {
            if let Some(current) = versions.iter_mut().rev().find(|e| e.is_current()) {
                current.valid_time = current.valid_time.close_at(end_time);
            }
        }
        Ok(())
    }

    fn delete_entity(&self, name: &str) -> Result<bool> {
        let mut entities = self.entities.write().map_err(|_| poisoned("delete_entity"))?;
        Ok(entities.remove(name).is_some())
    }

    fn search_entities(&self, query: &EntitySearchQuery) -> Result<Vec<Entity>> {
        if let (Some(text), true) = (&query.text, query.is_regex) {
            Regex::new(text).map_err(|e| Error::InvalidArgument(format!("invalid regex: {e}")))?;
        }
        let entities = self.entities.read().map_err(|_| poisoned("search_entities"))?;
        let mut results: Vec<Entity> = entities
            .values()
            .filter_map(|versions| versions.iter().rev().find(|e| e.is_current()))
            .filter(|e| entity_matches(e, query))
            .cloned()
            .collect();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(results.into_iter().skip(query.offset).take(query.limit.max(1)).collect())
    }

    fn count_entities(&self, query: &EntitySearchQuery) -> Result<usize> {
        let entities = self.entities.read().map_err(|_| poisoned("count_entities"))?;
        Ok(entities
            .values()
            .filter_map(|versions| versions.iter().rev().find(|e| e.is_current()))
            .filter(|e| entity_matches(e, query))
            .count())
    }

    fn list_entity_names(&self) -> Result<Vec<String>> {
        let entities = self.entities.read().map_err(|_| poisoned("list_entity_names"))?;
        Ok(entities
            .iter()
            .filter(|(_, versions)| versions.iter().any(Entity::is_current))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn insert_relation_version(&self, relation: &Relation) -> Result<()> {
        let mut relations = self.relations.write().map_err(|_| poisoned("insert_relation_version"))?;
        let key = triple_key(&relation.from, &relation.to, &relation.relation_type);
        let versions = relations.entry(key).or_default();
        if relation.version == 1 && versions.iter().any(Relation::is_current) {
            return Err(Error::Conflict(format!(
                "relation ({}, {}, {}) already exists",
                relation.from, relation.to, relation.relation_type
            )));
        }
        versions.push(relation.clone());
        Ok(())
    }

    fn get_current_relation(&self, from: &str, to: &str, relation_type: &str) -> Result<Option<Relation>> {
        let relations = self.relations.read().map_err(|_| poisoned("get_current_relation"))?;
        Ok(relations
            .get(&triple_key(from, to, relation_type))
            .and_then(|versions| versions.iter().rev().find(|r| r.is_current()))
            .cloned())
    }

    fn get_relation_history(&self, from: &str, to: &str, relation_type: &str) -> Result<Vec<Relation>> {
        let relations = self.relations.read().map_err(|_| poisoned("get_relation_history"))?;
        let mut history = relations
            .get(&triple_key(from, to, relation_type))
            .cloned()
            .unwrap_or_default();
        history.reverse();
        Ok(history)
    }

    fn close_relation_valid_time(&self, from: &str, to: &str, relation_type: &str, end_time: i64) -> Result<()> {
        let mut relations = self.relations.write().map_err(|_| poisoned("close_relation_valid_time"))?;
        if let Some(versions) = relations.get_mut(&triple_key(from, to, relation_type)) {
            if let Some(current) = versions.iter_mut().rev().find(|r| r.is_current()) {
                current.valid_time = current.valid_time.close_at(end_time);
            }
        }
        Ok(())
    }

    fn delete_relation(&self, from: &str, to: &str, relation_type: &str) -> Result<bool> {
        let mut relations = self.relations.write().map_err(|_| poisoned("delete_relation"))?;
        Ok(relations.remove(&triple_key(from, to, relation_type)).is_some())
    }

    fn relations_for_entity(&self, name: &str) -> Result<Vec<Relation>> {
        let relations = self.relations.read().map_err(|_| poisoned("relations_for_entity"))?;
        Ok(relations
            .values()
            .filter_map(|versions| versions.iter().rev().find(|r| r.is_current()))
            .filter(|r| r.from == name || r.to == name)
            .cloned()
            .collect())
    }

    fn all_current_relations(&self) -> Result<Vec<Relation>> {
        let relations = self.relations.read().map_err(|_| poisoned("all_current_relations"))?;
        Ok(relations
            .values()
            .filter_map(|versions| versions.iter().rev().find(|r| r.is_current()))
            .cloned()
            .collect())
    }

    fn get_entity_at(&self, name: &str, point: &BitemporalPoint) -> Result<Option<Entity>> {
        let entities = self.entities.read().map_err(|_| poisoned("get_entity_at"))?;
        Ok(entities.get(name).and_then(|versions| {
            versions
                .iter()
                .rev()
                .find(|e| e.valid_time.contains(point.valid_at) && e.transaction_time.was_known_at(point.as_of))
                .cloned()
        }))
    }

    fn get_relation_at(&self, from: &str, to: &str, relation_type: &str, point: &BitemporalPoint) -> Result<Option<Relation>> {
        let relations = self.relations.read().map_err(|_| poisoned("get_relation_at"))?;
        Ok(relations.get(&triple_key(from, to, relation_type)).and_then(|versions| {
            versions
                .iter()
                .rev()
                .find(|r| r.valid_time.contains(point.valid_at) && r.transaction_time.was_known_at(point.as_of))
                .cloned()
        }))
    }

    fn get_stats(&self) -> Result<GraphStats> {
        let entities = self.entities.read().map_err(|_| poisoned("get_stats"))?;
        let relations = self.relations.read().map_err(|_| poisoned("get_stats"))?;

        let current_entities: Vec<&Entity> = entities
            .values()
            .filter_map(|versions| versions.iter().rev().find(|e| e.is_current()))
            .collect();
        let current_relations: Vec<&Relation> = relations
            .values()
            .filter_map(|versions| versions.iter().rev().find(|r| r.is_current()))
            .collect();

        let mut entities_by_type: HashMap<String, usize> = HashMap::new();
        for e in &current_entities {
            *entities_by_type.entry(e.entity_type.clone()).or_insert(0) += 1;
        }
        let mut relations_by_type: HashMap<String, usize> = HashMap::new();
        for r in &current_relations {
            *relations_by_type.entry(r.relation_type.clone()).or_insert(0) += 1;
        }

        let version_row_count: usize =
            entities.values().map(Vec::len).sum::<usize>() + relations.values().map(Vec::len).sum::<usize>();

        let entity_count = current_entities.len();
        let relation_count = current_relations.len();
        let avg_relations_per_entity = if entity_count > 0 {
            relation_count as f32 / entity_count as f32
        } else {
            0.0
        };

        Ok(GraphStats {
            entity_count,
            entities_by_type,
            relation_count,
            relations_by_type,
            version_row_count,
            avg_relations_per_entity,
        })
    }

    fn clear(&self) -> Result<()> {
        if let Ok(mut entities) = self.entities.write() {
            entities.clear();
        }
        if let Ok(mut relations) = self.relations.write() {
            relations.clear();
        }
        Ok(())
    }
}
