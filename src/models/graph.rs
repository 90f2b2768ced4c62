// Allow non-const functions that use f32::clamp (not const-stable yet).
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

//! Entity and relation types for the bitemporal knowledge graph.
//!
//! An [`Entity`] is identified by its `name`, which is unique among
//! currently-valid entities. A [`Relation`] is a directed, typed edge between
//! two entity names. Both carry the same bitemporal metadata — `version`,
//! `created_at`, `updated_at`, and a [`ValidTimeRange`] — so that every
//! mutation produces a new row while history remains queryable.
//!
//! # Example
//!
//! ```rust
//! use chronograph::models::graph::{Entity, Relation};
//!
//! let alice = Entity::new("alice", "person").with_observation("likes coffee");
//! let bob = Entity::new("bob", "person");
//! let rel = Relation::new("alice", "bob", "knows").with_confidence(0.9);
//!
//! assert_eq!(alice.name, "alice");
//! assert_eq!(rel.from, "alice");
//! assert_eq!(rel.to, "bob");
//! ```

use crate::models::temporal::{TransactionTime, ValidTimeRange};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

/// Opaque identifier for a specific version of an entity or relation row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionId(String);

impl VersionId {
    /// Wraps an existing version id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a new random version id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for VersionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Metadata describing the vector embedding attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// The dense embedding vector.
    pub vector: Vec<f32>,
    /// Name of the embedding provider that produced the vector.
    pub provider: String,
    /// Model identifier used by the provider.
    pub model: String,
    /// When the embedding was last (re)computed.
    pub updated_at: i64,
}

/// An entity in the knowledge graph, keyed by its unique `name`.
///
/// Entities are bitemporally versioned: mutating one closes the current row
/// (`valid_time.end = now`) and inserts a new row with `version + 1`. See
/// `graph::BitemporalGraphStore` for the versioning protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Opaque id of this specific version.
    pub id: VersionId,
    /// Caller-assigned name, unique among currently-valid entities.
    pub name: String,
    /// Short type label (e.g. `"person"`, `"technology"`).
    pub entity_type: String,
    /// Ordered, duplicate-free list of observation strings.
    pub observations: Vec<String>,
    /// Vector embedding, if one has been computed for this entity.
    pub embedding: Option<EmbeddingRecord>,
    /// Monotonically increasing version number for this `name`.
    pub version: u32,
    /// Timestamp of the first version sharing this `name`; constant across versions.
    pub created_at: i64,
    /// Timestamp this specific version was written.
    pub updated_at: i64,
    /// Real-world validity interval for this version.
    pub valid_time: ValidTimeRange,
    /// When this version was recorded in the system.
    pub transaction_time: TransactionTime,
    /// Free-form audit tag describing who/what made this change.
    pub changed_by: Option<String>,
}

impl Entity {
    /// Creates a new, first-version entity.
    #[must_use]
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        let now = crate::models::temporal::current_timestamp();
        Self {
            id: VersionId::generate(),
            name: name.into(),
            entity_type: entity_type.into(),
            observations: Vec::new(),
            embedding: None,
            version: 1,
            created_at: now,
            updated_at: now,
            valid_time: ValidTimeRange::from(now),
            transaction_time: TransactionTime::now(),
            changed_by: None,
        }
    }

    /// Adds a single observation, rejecting it silently if already present.
    #[must_use]
    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        let observation = observation.into();
        if !self.observations.contains(&observation) {
            self.observations.push(observation);
        }
        self
    }

    /// Adds multiple observations, skipping duplicates (including duplicates
    /// already present in `self.observations`).
    #[must_use]
    pub fn with_observations(mut self, observations: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for obs in observations {
            let obs = obs.into();
            if !self.observations.contains(&obs) {
                self.observations.push(obs);
            }
        }
        self
    }

    /// Sets the embedding record.
    #[must_use]
    pub fn with_embedding(mut self, embedding: EmbeddingRecord) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Sets the audit tag.
    #[must_use]
    pub fn with_changed_by(mut self, changed_by: impl Into<String>) -> Self {
        self.changed_by = Some(changed_by.into());
        self
    }

    /// Returns true if this version is valid at the given timestamp.
    #[must_use]
    pub fn is_valid_at(&self, timestamp: i64) -> bool {
        self.valid_time.contains(timestamp)
    }

    /// Returns true if this is the current version (`valid_time.end` unset).
    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.valid_time.end.is_none()
    }

    /// Concatenates observations with newline separators, as used for
    /// embedding-job input (`spec.md` §4.3).
    #[must_use]
    pub fn observation_text(&self) -> String {
        self.observations.join("\n")
    }
}

/// A directed, typed edge between two entity names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Opaque id of this specific version.
    pub id: VersionId,
    /// Source entity name.
    pub from: String,
    /// Target entity name.
    pub to: String,
    /// Open-ended relation type label (e.g. `"knows"`, `"uses"`).
    pub relation_type: String,
    /// Optional relation strength in `[0, 1]`.
    pub strength: Option<f32>,
    /// Optional confidence in `[0, 1]`.
    pub confidence: Option<f32>,
    /// Open property map (arbitrary JSON values).
    pub metadata: HashMap<String, JsonValue>,
    /// Monotonically increasing version number for this `(from, to, relation_type)` triple.
    pub version: u32,
    /// Timestamp of the first version sharing this triple; constant across versions.
    pub created_at: i64,
    /// Timestamp this specific version was written.
    pub updated_at: i64,
    /// Real-world validity interval for this version.
    pub valid_time: ValidTimeRange,
    /// When this version was recorded in the system.
    pub transaction_time: TransactionTime,
    /// Free-form audit tag.
    pub changed_by: Option<String>,
}

impl Relation {
    /// Creates a new, first-version relation.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>, relation_type: impl Into<String>) -> Self {
        let now = crate::models::temporal::current_timestamp();
        Self {
            id: VersionId::generate(),
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
            strength: None,
            confidence: None,
            metadata: HashMap::new(),
            version: 1,
            created_at: now,
            updated_at: now,
            valid_time: ValidTimeRange::from(now),
            transaction_time: TransactionTime::now(),
            changed_by: None,
        }
    }

    /// Sets the relation strength, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = Some(strength.clamp(0.0, 1.0));
        self
    }

    /// Sets the relation confidence, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// Inserts a metadata field.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets the audit tag.
    #[must_use]
    pub fn with_changed_by(mut self, changed_by: impl Into<String>) -> Self {
        self.changed_by = Some(changed_by.into());
        self
    }

    /// The `(from, to, relation_type)` triple used for merge-create uniqueness.
    #[must_use]
    pub fn triple(&self) -> (&str, &str, &str) {
        (&self.from, &self.to, &self.relation_type)
    }

    /// Returns true if this version is valid at the given timestamp.
    #[must_use]
    pub fn is_valid_at(&self, timestamp: i64) -> bool {
        self.valid_time.contains(timestamp)
    }

    /// Returns true if this is the current version.
    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.valid_time.end.is_none()
    }

    /// Applies exponential confidence decay relative to `now`, per the decay
    /// view formula: `c' = max(m, c * exp(ln(0.5) * age_ms / (H * 86_400_000))`.
    #[must_use]
    pub fn decayed_confidence(&self, now_ms: i64, half_life_days: f64, min_confidence: f32) -> Option<f32> {
        let c = self.confidence?;
        let valid_from_ms = self.valid_time.start.unwrap_or(self.created_at) * 1000;
        let age_ms = (now_ms - valid_from_ms).max(0) as f64;
        let half_life_ms = half_life_days * 86_400_000.0;
        let rate = -std::f64::consts::LN_2;
        let decayed = f64::from(c) * (rate * age_ms / half_life_ms).exp();
        Some((decayed as f32).max(min_confidence))
    }
}

/// Query parameters for [`crate::graph::BitemporalGraphStore::search_nodes`].
#[derive(Debug, Clone, Default)]
pub struct EntitySearchQuery {
    /// Substring or regex text to match against name/type/observations.
    pub text: Option<String>,
    /// Treat `text` as a regex instead of an escaped substring.
    pub is_regex: bool,
    /// Case-sensitive match (default false).
    pub case_sensitive: bool,
    /// Restrict to one entity type.
    pub entity_type: Option<String>,
    /// Pagination offset.
    pub offset: usize,
    /// Pagination limit.
    pub limit: usize,
    /// Whether to compute the total match count.
    pub include_total: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_rejects_duplicate_observations() {
        let e = Entity::new("alice", "person")
            .with_observation("likes coffee")
            .with_observation("likes coffee");
        assert_eq!(e.observations, vec!["likes coffee".to_string()]);
    }

    #[test]
    fn entity_observations_preserve_order() {
        let e = Entity::new("alice", "person").with_observations(["a", "b", "a", "c"]);
        assert_eq!(e.observations, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn entity_confidence_and_strength_clamp() {
        let r = Relation::new("a", "b", "knows").with_strength(2.0).with_confidence(-1.0);
        assert_eq!(r.strength, Some(1.0));
        assert_eq!(r.confidence, Some(0.0));
    }

    #[test]
    fn relation_triple() {
        let r = Relation::new("a", "b", "knows");
        assert_eq!(r.triple(), ("a", "b", "knows"));
    }

    #[test]
    fn decay_matches_scenario_f() {
        // confidence=1.0, valid_from = now - 60 days, half_life = 30 days, min = 0.1
        let now_s = 1_700_000_000_i64;
        let sixty_days_ago = now_s - 60 * 86_400;
        let r = Relation {
            valid_time: ValidTimeRange::from(sixty_days_ago),
            ..Relation::new("a", "b", "knows").with_confidence(1.0)
        };
        let decayed = r.decayed_confidence(now_s * 1000, 30.0, 0.1).unwrap();
        assert!((decayed - 0.25).abs() < 0.01, "expected ~0.25, got {decayed}");

        let year_ago = now_s - 365 * 86_400;
        let r2 = Relation {
            valid_time: ValidTimeRange::from(year_ago),
            ..Relation::new("a", "b", "knows").with_confidence(1.0)
        };
        let decayed2 = r2.decayed_confidence(now_s * 1000, 30.0, 0.1).unwrap();
        assert!((decayed2 - 0.1).abs() < 1e-6, "expected floor 0.1, got {decayed2}");
    }
}
