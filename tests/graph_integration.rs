//! Integration tests for the bitemporal graph store over the `SQLite` backend.
//!
//! Exercises the create → version → point-in-time-query roundtrip against a
//! real on-disk database, rather than the in-memory backend unit tests use.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chronograph::graph::{BitemporalGraphStore, EntityInput, EntityUpdate, RelationInput};
use chronograph::storage::SqliteGraphBackend;
use tempfile::TempDir;

fn test_store(temp_dir: &TempDir) -> BitemporalGraphStore<SqliteGraphBackend> {
    let db_path = temp_dir.path().join("test_graph.sqlite3");
    let backend = SqliteGraphBackend::new(&db_path).expect("failed to create sqlite backend");
    BitemporalGraphStore::new(backend)
}

#[test]
fn create_then_update_preserves_history() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let store = test_store(&temp_dir);

    store
        .create_entities(vec![EntityInput { name: "alice".to_string(), entity_type: "person".to_string(), observations: vec!["likes tea".to_string()] }])
        .expect("create should succeed");

    store
        .update_entity("alice", EntityUpdate { entity_type: None, observations: Some(vec!["likes coffee now".to_string()]), changed_by: Some("test".to_string()) })
        .expect("update should succeed");

    let history = store.get_entity_history("alice").expect("history lookup should succeed");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].observations, vec!["likes tea".to_string()]);
    assert_eq!(history[1].observations, vec!["likes coffee now".to_string()]);

    let current = store.get_entity("alice").expect("get should succeed").expect("entity should exist");
    assert_eq!(current.observations, vec!["likes coffee now".to_string()]);
}

#[test]
fn point_in_time_query_reflects_the_state_at_that_instant() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let store = test_store(&temp_dir);

    store
        .create_entities(vec![EntityInput { name: "alice".to_string(), entity_type: "person".to_string(), observations: vec!["v0".to_string()] }])
        .expect("create should succeed");

    let history = store.get_entity_history("alice").expect("history lookup should succeed");
    let created_at = history[0].valid_time.start.expect("a freshly created entity has a bounded valid-from");

    // `current_timestamp` is second-granularity; sleep past the tick so the
    // update lands strictly after `created_at`.
    std::thread::sleep(std::time::Duration::from_millis(1100));
    store
        .update_entity("alice", EntityUpdate { entity_type: None, observations: Some(vec!["v1".to_string()]), changed_by: None })
        .expect("update should succeed");

    let graph_before = store.get_graph_at_time(created_at).expect("point-in-time query should succeed");
    let alice_before = graph_before.entities.iter().find(|e| e.name == "alice").expect("alice should exist in the earlier snapshot");
    assert_eq!(alice_before.observations, vec!["v0".to_string()]);

    let graph_now = store.load_graph().expect("load should succeed");
    let alice_now = graph_now.entities.iter().find(|e| e.name == "alice").expect("alice should exist in the current snapshot");
    assert_eq!(alice_now.observations, vec!["v1".to_string()]);
}

#[test]
fn relations_round_trip_and_can_be_deleted() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let store = test_store(&temp_dir);

    store
        .create_entities(vec![
            EntityInput { name: "alice".to_string(), entity_type: "person".to_string(), observations: vec![] },
            EntityInput { name: "bob".to_string(), entity_type: "person".to_string(), observations: vec![] },
        ])
        .expect("create should succeed");

    store.create_relations(vec![RelationInput { from: "alice".to_string(), to: "bob".to_string(), relation_type: "KNOWS".to_string(), ..Default::default() }]).expect("relation create should succeed");

    let relation = store.get_relation("alice", "bob", "KNOWS").expect("lookup should succeed").expect("relation should exist");
    assert_eq!(relation.from, "alice");
    assert_eq!(relation.to, "bob");

    let deleted = store.delete_relations(&[("alice".to_string(), "bob".to_string(), "KNOWS".to_string())]).expect("delete should succeed");
    assert_eq!(deleted, 1);
    assert!(store.get_relation("alice", "bob", "KNOWS").expect("lookup should succeed").is_none());
}
