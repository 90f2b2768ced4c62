//! `SQLite` graph backend for knowledge-graph storage.
//!
//! Stores every entity/relation version as its own row; a partial unique
//! index on `valid_end IS NULL` enforces that at most one version per
//! name (or per relation triple) is current at a time, which is what lets
//! [`crate::graph::BitemporalGraphStore`] detect conflicts by letting the
//! `INSERT` fail rather than checking-then-inserting.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]

use crate::models::graph::{EmbeddingRecord, Entity, EntitySearchQuery, Relation, VersionId};
use crate::models::temporal::{BitemporalPoint, TransactionTime, ValidTimeRange};
use crate::storage::sqlite::{acquire_lock, configure_connection, record_operation_metrics};
use crate::storage::traits::graph::{GraphBackend, GraphStats};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

fn sql_err(operation: &'static str, e: rusqlite::Error) -> Error {
    if matches!(
        &e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    ) {
        Error::Conflict(format!("{operation}: uniqueness constraint violated"))
    } else {
        Error::BackendUnavailable(format!("{operation}: {e}"))
    }
}

/// `SQLite`-based graph backend.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access. WAL mode and
/// `busy_timeout` handle concurrent access gracefully.
pub struct SqliteGraphBackend {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteGraphBackend {
    /// Opens (creating if necessary) a `SQLite` graph backend at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path)
            .map_err(|e| Error::BackendUnavailable(format!("open_graph_sqlite: {e}")))?;
        let backend = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        backend.initialize()?;
        Ok(backend)
    }

    /// Creates an in-memory `SQLite` graph backend (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::BackendUnavailable(format!("open_graph_sqlite_memory: {e}")))?;
        let backend = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        backend.initialize()?;
        Ok(backend)
    }

    /// Returns the database path, `None` for an in-memory database.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS graph_entities (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                observations TEXT NOT NULL DEFAULT '[]',
                embedding TEXT,
                version INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                valid_start INTEGER,
                valid_end INTEGER,
                tx_time INTEGER NOT NULL,
                changed_by TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_graph_entities_name ON graph_entities(name);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_graph_entities_current
                ON graph_entities(name) WHERE valid_end IS NULL;

            CREATE TABLE IF NOT EXISTS graph_relations (
                id TEXT PRIMARY KEY,
                from_name TEXT NOT NULL,
                to_name TEXT NOT NULL,
                relation_type TEXT NOT NULL,
                strength REAL,
                confidence REAL,
                metadata TEXT NOT NULL DEFAULT '{}',
                version INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                valid_start INTEGER,
                valid_end INTEGER,
                tx_time INTEGER NOT NULL,
                changed_by TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_graph_relations_from ON graph_relations(from_name);
            CREATE INDEX IF NOT EXISTS idx_graph_relations_to ON graph_relations(to_name);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_graph_relations_current
                ON graph_relations(from_name, to_name, relation_type) WHERE valid_end IS NULL;",
        )
        .map_err(|e| sql_err("initialize", e))?;

        Ok(())
    }

    fn parse_entity_row(row: &Row<'_>) -> rusqlite::Result<Entity> {
        let id: String = row.get("id")?;
        let observations_json: String = row.get("observations")?;
        let embedding_json: Option<String> = row.get("embedding")?;
        let valid_start: Option<i64> = row.get("valid_start")?;
        let valid_end: Option<i64> = row.get("valid_end")?;
        let tx_time: i64 = row.get("tx_time")?;
        let version: i64 = row.get("version")?;

        Ok(Entity {
            id: VersionId::new(id),
            name: row.get("name")?,
            entity_type: row.get("entity_type")?,
            observations: match serde_json::from_str(&observations_json) {
                Ok(observations) => observations,
                Err(e) => {
                    tracing::warn!(error = %e, raw = %observations_json, "unparseable observations blob, preserving raw string");
                    vec![format!("_unparseable_observations:{observations_json}")]
                }
            },
            embedding: embedding_json.and_then(|s| serde_json::from_str::<EmbeddingRecord>(&s).ok()),
            version: version as u32,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            valid_time: ValidTimeRange {
                start: valid_start,
                end: valid_end,
            },
            transaction_time: TransactionTime::at(tx_time),
            changed_by: row.get("changed_by")?,
        })
    }

    fn parse_relation_row(row: &Row<'_>) -> rusqlite::Result<Relation> {
        let id: String = row.get("id")?;
        let metadata_json: String = row.get("metadata")?;
        let valid_start: Option<i64> = row.get("valid_start")?;
        let valid_end: Option<i64> = row.get("valid_end")?;
        let tx_time: i64 = row.get("tx_time")?;
        let version: i64 = row.get("version")?;

        Ok(Relation {
            id: VersionId::new(id),
            from: row.get("from_name")?,
            to: row.get("to_name")?,
            relation_type: row.get("relation_type")?,
            strength: row.get("strength")?,
            confidence: row.get("confidence")?,
            metadata: match serde_json::from_str(&metadata_json) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(error = %e, raw = %metadata_json, "unparseable metadata blob, preserving raw string");
                    let mut metadata = HashMap::new();
                    metadata.insert(
                        "_unparseable_metadata".to_string(),
                        serde_json::Value::String(metadata_json.clone()),
                    );
                    metadata
                }
            },
            version: version as u32,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            valid_time: ValidTimeRange {
                start: valid_start,
                end: valid_end,
            },
            transaction_time: TransactionTime::at(tx_time),
            changed_by: row.get("changed_by")?,
        })
    }

    fn build_entity_where(query: &EntitySearchQuery) -> Result<(String, Vec<Box<dyn rusqlite::ToSql>>)> {
        let mut conditions = vec!["valid_end IS NULL".to_string()];
        let mut sql_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref entity_type) = query.entity_type {
            conditions.push(format!("entity_type = ?{}", sql_params.len() + 1));
            sql_params.push(Box::new(entity_type.clone()));
        }

        if let Some(ref text) = query.text {
            if query.is_regex {
                // SQLite has no native regex engine and we don't register one;
                // regex mode is only precise on the in-memory backend, so make
                // the gap a typed error instead of silently degrading to substring
                // matching and returning results the caller didn't ask for.
                return Err(Error::InvalidArgument(
                    "regex text search is not supported on the sqlite graph backend".to_string(),
                ));
            }
            let idx = sql_params.len() + 1;
            if query.case_sensitive {
                conditions.push(format!(
                    "(instr(name, ?{idx}) > 0 OR instr(entity_type, ?{idx}) > 0 OR instr(observations, ?{idx}) > 0)"
                ));
                sql_params.push(Box::new(text.clone()));
            } else {
                conditions.push(format!(
                    "(instr(lower(name), ?{idx}) > 0 OR instr(lower(entity_type), ?{idx}) > 0 OR instr(lower(observations), ?{idx}) > 0)"
                ));
                sql_params.push(Box::new(text.to_lowercase()));
            }
        }

        Ok((format!("WHERE {}", conditions.join(" AND ")), sql_params))
    }
}

impl GraphBackend for SqliteGraphBackend {
    #[instrument(skip(self, entity), fields(name = %entity.name))]
    fn insert_entity_version(&self, entity: &Entity) -> Result<()> {
        let start = Instant::now();
        let conn = acquire_lock(&self.conn);
        let observations_json = serde_json::to_string(&entity.observations).unwrap_or_else(|_| "[]".to_string());
        let embedding_json = entity
            .embedding
            .as_ref()
            .and_then(|e| serde_json::to_string(e).ok());

        let result = conn.execute(
            "INSERT INTO graph_entities (
                id, name, entity_type, observations, embedding, version,
                created_at, updated_at, valid_start, valid_end, tx_time, changed_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                entity.id.as_str(),
                entity.name,
                entity.entity_type,
                observations_json,
                embedding_json,
                entity.version,
                entity.created_at,
                entity.updated_at,
                entity.valid_time.start,
                entity.valid_time.end,
                entity.transaction_time.timestamp(),
                entity.changed_by,
            ],
        );

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics("sqlite", "insert_entity_version", start, status);
        result.map(|_| ()).map_err(|e| sql_err("insert_entity_version", e))
    }

    #[instrument(skip(self))]
    fn get_current_entity(&self, name: &str) -> Result<Option<Entity>> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            "SELECT * FROM graph_entities WHERE name = ?1 AND valid_end IS NULL",
            params![name],
            Self::parse_entity_row,
        )
        .optional()
        .map_err(|e| sql_err("get_current_entity", e))
    }

    #[instrument(skip(self))]
    fn get_entity_history(&self, name: &str) -> Result<Vec<Entity>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare("SELECT * FROM graph_entities WHERE name = ?1 ORDER BY version DESC")
            .map_err(|e| sql_err("get_entity_history_prepare", e))?;
        let rows = stmt
            .query_map(params![name], Self::parse_entity_row)
            .map_err(|e| sql_err("get_entity_history", e))?
            .filter_map(Result::ok)
            .collect();
        Ok(rows)
    }

    #[instrument(skip(self))]
    fn close_entity_valid_time(&self, name: &str, end_time: i64) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "UPDATE graph_entities SET valid_end = ?1 WHERE name = ?2 AND valid_end IS NULL",
            params![end_time, name],
        )
        .map_err(|e| sql_err("close_entity_valid_time", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn delete_entity(&self, name: &str) -> Result<bool> {
        let conn = acquire_lock(&self.conn);
        let rows = conn
            .execute("DELETE FROM graph_entities WHERE name = ?1", params![name])
            .map_err(|e| sql_err("delete_entity", e))?;
        Ok(rows > 0)
    }

    #[instrument(skip(self, query))]
    fn search_entities(&self, query: &EntitySearchQuery) -> Result<Vec<Entity>> {
        let conn = acquire_lock(&self.conn);
        let (where_clause, sql_params) = Self::build_entity_where(query)?;
        let sql = format!(
            "SELECT * FROM graph_entities {where_clause} ORDER BY name LIMIT {} OFFSET {}",
            query.limit.max(1),
            query.offset
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| sql_err("search_entities_prepare", e))?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = sql_params.iter().map(AsRef::as_ref).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), Self::parse_entity_row)
            .map_err(|e| sql_err("search_entities", e))?
            .filter_map(Result::ok)
            .collect();
        Ok(rows)
    }

    #[instrument(skip(self, query))]
    fn count_entities(&self, query: &EntitySearchQuery) -> Result<usize> {
        let conn = acquire_lock(&self.conn);
        let (where_clause, sql_params) = Self::build_entity_where(query)?;
        let sql = format!("SELECT COUNT(*) FROM graph_entities {where_clause}");
        let param_refs: Vec<&dyn rusqlite::ToSql> = sql_params.iter().map(AsRef::as_ref).collect();
        let count: i64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| sql_err("count_entities", e))?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    fn list_entity_names(&self) -> Result<Vec<String>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare("SELECT name FROM graph_entities WHERE valid_end IS NULL")
            .map_err(|e| sql_err("list_entity_names_prepare", e))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| sql_err("list_entity_names", e))?
            .filter_map(Result::ok)
            .collect();
        Ok(rows)
    }

    #[instrument(skip(self, relation), fields(from = %relation.from, to = %relation.to))]
    fn insert_relation_version(&self, relation: &Relation) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        let metadata_json = serde_json::to_string(&relation.metadata).unwrap_or_else(|_| "{}".to_string());
        conn.execute(
            "INSERT INTO graph_relations (
                id, from_name, to_name, relation_type, strength, confidence, metadata, version,
                created_at, updated_at, valid_start, valid_end, tx_time, changed_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                relation.id.as_str(),
                relation.from,
                relation.to,
                relation.relation_type,
                relation.strength,
                relation.confidence,
                metadata_json,
                relation.version,
                relation.created_at,
                relation.updated_at,
                relation.valid_time.start,
                relation.valid_time.end,
                relation.transaction_time.timestamp(),
                relation.changed_by,
            ],
        )
        .map_err(|e| sql_err("insert_relation_version", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn get_current_relation(&self, from: &str, to: &str, relation_type: &str) -> Result<Option<Relation>> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            "SELECT * FROM graph_relations WHERE from_name = ?1 AND to_name = ?2 AND relation_type = ?3 AND valid_end IS NULL",
            params![from, to, relation_type],
            Self::parse_relation_row,
        )
        .optional()
        .map_err(|e| sql_err("get_current_relation", e))
    }

    #[instrument(skip(self))]
    fn get_relation_history(&self, from: &str, to: &str, relation_type: &str) -> Result<Vec<Relation>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT * FROM graph_relations WHERE from_name = ?1 AND to_name = ?2 AND relation_type = ?3 ORDER BY version DESC",
            )
            .map_err(|e| sql_err("get_relation_history_prepare", e))?;
        let rows = stmt
            .query_map(params![from, to, relation_type], Self::parse_relation_row)
            .map_err(|e| sql_err("get_relation_history", e))?
            .filter_map(Result::ok)
            .collect();
        Ok(rows)
    }

    #[instrument(skip(self))]
    fn close_relation_valid_time(&self, from: &str, to: &str, relation_type: &str, end_time: i64) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute(
            "UPDATE graph_relations SET valid_end = ?1
             WHERE from_name = ?2 AND to_name = ?3 AND relation_type = ?4 AND valid_end IS NULL",
            params![end_time, from, to, relation_type],
        )
        .map_err(|e| sql_err("close_relation_valid_time", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn delete_relation(&self, from: &str, to: &str, relation_type: &str) -> Result<bool> {
        let conn = acquire_lock(&self.conn);
        let rows = conn
            .execute(
                "DELETE FROM graph_relations WHERE from_name = ?1 AND to_name = ?2 AND relation_type = ?3",
                params![from, to, relation_type],
            )
            .map_err(|e| sql_err("delete_relation", e))?;
        Ok(rows > 0)
    }

    #[instrument(skip(self))]
    fn relations_for_entity(&self, name: &str) -> Result<Vec<Relation>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare(
                "SELECT * FROM graph_relations
                 WHERE (from_name = ?1 OR to_name = ?1) AND valid_end IS NULL",
            )
            .map_err(|e| sql_err("relations_for_entity_prepare", e))?;
        let rows = stmt
            .query_map(params![name], Self::parse_relation_row)
            .map_err(|e| sql_err("relations_for_entity", e))?
            .filter_map(Result::ok)
            .collect();
        Ok(rows)
    }

    #[instrument(skip(self))]
    fn all_current_relations(&self) -> Result<Vec<Relation>> {
        let conn = acquire_lock(&self.conn);
        let mut stmt = conn
            .prepare("SELECT * FROM graph_relations WHERE valid_end IS NULL")
            .map_err(|e| sql_err("all_current_relations_prepare", e))?;
        let rows = stmt
            .query_map([], Self::parse_relation_row)
            .map_err(|e| sql_err("all_current_relations", e))?
            .filter_map(Result::ok)
            .collect();
        Ok(rows)
    }

    #[instrument(skip(self, point))]
    fn get_entity_at(&self, name: &str, point: &BitemporalPoint) -> Result<Option<Entity>> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            "SELECT * FROM graph_entities
             WHERE name = ?1
               AND (valid_start IS NULL OR valid_start <= ?2)
               AND (valid_end IS NULL OR valid_end > ?2)
               AND tx_time <= ?3
             ORDER BY version DESC LIMIT 1",
            params![name, point.valid_at, point.as_of],
            Self::parse_entity_row,
        )
        .optional()
        .map_err(|e| sql_err("get_entity_at", e))
    }

    #[instrument(skip(self, point))]
    fn get_relation_at(&self, from: &str, to: &str, relation_type: &str, point: &BitemporalPoint) -> Result<Option<Relation>> {
        let conn = acquire_lock(&self.conn);
        conn.query_row(
            "SELECT * FROM graph_relations
             WHERE from_name = ?1 AND to_name = ?2 AND relation_type = ?3
               AND (valid_start IS NULL OR valid_start <= ?4)
               AND (valid_end IS NULL OR valid_end > ?4)
               AND tx_time <= ?5
             ORDER BY version DESC LIMIT 1",
            params![from, to, relation_type, point.valid_at, point.as_of],
            Self::parse_relation_row,
        )
        .optional()
        .map_err(|e| sql_err("get_relation_at", e))
    }

    #[instrument(skip(self))]
    fn get_stats(&self) -> Result<GraphStats> {
        let conn = acquire_lock(&self.conn);

        let entity_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM graph_entities WHERE valid_end IS NULL", [], |row| row.get(0))
            .unwrap_or(0);
        let relation_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM graph_relations WHERE valid_end IS NULL", [], |row| row.get(0))
            .unwrap_or(0);
        let version_row_count: i64 = conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM graph_entities) + (SELECT COUNT(*) FROM graph_relations)",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        let mut entities_by_type = HashMap::new();
        {
            let mut stmt = conn
                .prepare("SELECT entity_type, COUNT(*) FROM graph_entities WHERE valid_end IS NULL GROUP BY entity_type")
                .map_err(|e| sql_err("get_stats_entities_by_type", e))?;
            let counts = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .map_err(|e| sql_err("get_stats_entities_by_type_query", e))?;
            for row in counts.flatten() {
                entities_by_type.insert(row.0, row.1 as usize);
            }
        }

        let mut relations_by_type = HashMap::new();
        {
            let mut stmt = conn
                .prepare("SELECT relation_type, COUNT(*) FROM graph_relations WHERE valid_end IS NULL GROUP BY relation_type")
                .map_err(|e| sql_err("get_stats_relations_by_type", e))?;
            let counts = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .map_err(|e| sql_err("get_stats_relations_by_type_query", e))?;
            for row in counts.flatten() {
                relations_by_type.insert(row.0, row.1 as usize);
            }
        }

        let avg_relations_per_entity = if entity_count > 0 {
            relation_count as f32 / entity_count as f32
        } else {
            0.0
        };

        Ok(GraphStats {
            entity_count: entity_count as usize,
            entities_by_type,
            relation_count: relation_count as usize,
            relations_by_type,
            version_row_count: version_row_count as usize,
            avg_relations_per_entity,
        })
    }

    #[instrument(skip(self))]
    fn clear(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        conn.execute("DELETE FROM graph_relations", []).map_err(|e| sql_err("clear_relations", e))?;
        conn.execute("DELETE FROM graph_entities", []).map_err(|e| sql_err("clear_entities", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get_current() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        let entity = Entity::new("alice", "person").with_observation("likes coffee");
        backend.insert_entity_version(&entity).unwrap();

        let current = backend.get_current_entity("alice").unwrap().unwrap();
        assert_eq!(current.name, "alice");
        assert_eq!(current.observations, vec!["likes coffee".to_string()]);
    }

    #[test]
    fn test_current_uniqueness_enforced() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        let e1 = Entity::new("alice", "person");
        backend.insert_entity_version(&e1).unwrap();

        let e2 = Entity::new("alice", "person");
        let err = backend.insert_entity_version(&e2).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_close_then_reinsert_versions() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        let v1 = Entity::new("alice", "person");
        backend.insert_entity_version(&v1).unwrap();
        backend.close_entity_valid_time("alice", 500).unwrap();

        let v2 = Entity {
            version: 2,
            ..Entity::new("alice", "person")
        };
        backend.insert_entity_version(&v2).unwrap();

        let history = backend.get_entity_history("alice").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(backend.get_current_entity("alice").unwrap().unwrap().version, 2);
    }

    #[test]
    fn test_relation_triple_conflict() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        backend.insert_relation_version(&Relation::new("a", "b", "knows")).unwrap();
        let err = backend.insert_relation_version(&Relation::new("a", "b", "knows")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_search_entities_substring() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        backend
            .insert_entity_version(&Entity::new("alice", "person").with_observation("likes coffee"))
            .unwrap();
        backend.insert_entity_version(&Entity::new("bob", "person")).unwrap();

        let query = EntitySearchQuery {
            text: Some("coffee".to_string()),
            limit: 10,
            ..Default::default()
        };
        let results = backend.search_entities(&query).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "alice");
    }

    #[test]
    fn test_point_in_time_query() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        let entity = Entity {
            valid_time: ValidTimeRange::between(100, 200),
            ..Entity::new("alice", "person")
        };
        backend.insert_entity_version(&entity).unwrap();

        let inside = BitemporalPoint::new(150, i64::MAX);
        assert!(backend.get_entity_at("alice", &inside).unwrap().is_some());

        let before = BitemporalPoint::new(50, i64::MAX);
        assert!(backend.get_entity_at("alice", &before).unwrap().is_none());
    }

    #[test]
    fn test_search_entities_case_sensitive() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        backend.insert_entity_version(&Entity::new("Alice", "person")).unwrap();

        let insensitive = EntitySearchQuery {
            text: Some("alice".to_string()),
            limit: 10,
            ..Default::default()
        };
        assert_eq!(backend.search_entities(&insensitive).unwrap().len(), 1);

        let sensitive = EntitySearchQuery {
            text: Some("alice".to_string()),
            case_sensitive: true,
            limit: 10,
            ..Default::default()
        };
        assert_eq!(backend.search_entities(&sensitive).unwrap().len(), 0);
    }

    #[test]
    fn test_search_entities_regex_rejected() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        let query = EntitySearchQuery {
            text: Some("al.*e".to_string()),
            is_regex: true,
            limit: 10,
            ..Default::default()
        };
        let err = backend.search_entities(&query).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_clear() {
        let backend = SqliteGraphBackend::in_memory().unwrap();
        backend.insert_entity_version(&Entity::new("alice", "person")).unwrap();
        backend.clear().unwrap();
        assert_eq!(backend.list_entity_names().unwrap().len(), 0);
    }
}
