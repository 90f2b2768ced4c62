//! Benchmarks for bitemporal entity/relation versioning.
//!
//! Measures the cost of the write path (create, update, observation deltas)
//! and of point-in-time reconstruction as the version history grows.

#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use chronograph::graph::{BitemporalGraphStore, EntityInput, EntityUpdate};
use chronograph::storage::InMemoryGraphBackend;

fn bench_create_entities(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_entities");

    for count in &[10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("entities", count), count, |b, &count| {
            b.iter(|| {
                let store = BitemporalGraphStore::new(InMemoryGraphBackend::new());
                let inputs: Vec<EntityInput> = (0..count)
                    .map(|i| EntityInput { name: format!("entity-{i}"), entity_type: "note".to_string(), observations: vec!["seeded".to_string()] })
                    .collect();
                store.create_entities(inputs).expect("create should succeed");
            });
        });
    }

    group.finish();
}

fn bench_update_entity_versions(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_entity_versions");

    for versions in &[10usize, 100, 500] {
        let store = BitemporalGraphStore::new(InMemoryGraphBackend::new());
        store
            .create_entities(vec![EntityInput { name: "alice".to_string(), entity_type: "person".to_string(), observations: vec!["v0".to_string()] }])
            .expect("seed should succeed");
        for v in 0..*versions {
            store
                .update_entity("alice", EntityUpdate { entity_type: None, observations: Some(vec![format!("v{v}")]), changed_by: None })
                .expect("update should succeed");
        }

        group.bench_with_input(BenchmarkId::new("history_depth", versions), versions, |b, _| {
            b.iter(|| store.get_entity_history("alice").expect("history lookup should succeed"));
        });
    }

    group.finish();
}

fn bench_graph_at_time(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_at_time");

    let store = BitemporalGraphStore::new(InMemoryGraphBackend::new());
    let inputs: Vec<EntityInput> =
        (0..200).map(|i| EntityInput { name: format!("entity-{i}"), entity_type: "note".to_string(), observations: vec!["seeded".to_string()] }).collect();
    store.create_entities(inputs).expect("seed should succeed");
    let midpoint = chrono::Utc::now().timestamp_millis();

    group.bench_function("reconstruct_at_now", |b| {
        b.iter(|| store.get_graph_at_time(midpoint).expect("point-in-time query should succeed"));
    });

    group.finish();
}

criterion_group!(benches, bench_create_entities, bench_update_entity_versions, bench_graph_at_time);
criterion_main!(benches);
