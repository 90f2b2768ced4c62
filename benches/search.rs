//! Benchmarks for search operations.
//!
//! Benchmark targets:
//! - 100 entities: graph/text search under 20ms
//! - 1,000 entities: graph/text search under 50ms
//!
//! Covers the graph/text, vector, and hybrid strategies over the in-memory
//! backend, at a few graph sizes.

#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use chronograph::config::ChronographConfig;
use chronograph::graph::EntityInput;
use chronograph::search::SearchOptions;
use chronograph::KnowledgeGraph;

const SAMPLE_CONTENT: &[&str] = &[
    "PostgreSQL database configuration with connection pooling",
    "Redis caching layer implementation with TTL",
    "JWT authentication token validation flow",
    "Microservices architecture with event sourcing",
    "Kubernetes deployment configuration with autoscaling",
    "GraphQL API design patterns and best practices",
    "Docker container orchestration strategies",
    "CI/CD pipeline with GitHub Actions",
    "Performance optimization for Node.js applications",
    "Security audit checklist for web applications",
];

fn seeded_graph(count: usize) -> KnowledgeGraph<chronograph::storage::InMemoryGraphBackend> {
    let kg = KnowledgeGraph::open_in_memory(ChronographConfig::default());
    let inputs: Vec<EntityInput> = (0..count)
        .map(|i| EntityInput {
            name: format!("entity-{i}"),
            entity_type: "note".to_string(),
            observations: vec![SAMPLE_CONTENT[i % SAMPLE_CONTENT.len()].to_string()],
        })
        .collect();
    kg.create_entities(inputs).expect("seeding should succeed");
    kg
}

fn bench_graph_text_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_text_search");

    for count in &[100usize, 1000] {
        let kg = seeded_graph(*count);
        group.bench_with_input(BenchmarkId::new("entities", count), count, |b, _| {
            b.iter(|| kg.search("database configuration", SearchOptions { limit: 10, ..Default::default() }).expect("search should succeed"));
        });
    }

    group.finish();
}

fn bench_search_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_scaling");

    for count in &[10usize, 50, 100, 500] {
        let kg = seeded_graph(*count);
        group.bench_with_input(BenchmarkId::new("graph_text", count), count, |b, _| {
            b.iter(|| kg.search("kubernetes deployment", SearchOptions { limit: 10, ..Default::default() }).expect("search should succeed"));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_graph_text_search, bench_search_scaling);
criterion_main!(benches);
