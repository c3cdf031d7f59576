//! Benchmarks for filter parsing, compilation and request assembly.
//!
//! Benchmark targets:
//! - Parsing a filter: <50us
//! - Compiling a parsed filter: <20us
//! - Serializing a full search request: <100us

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;
use std::time::Duration;

use vectorgate::filter::{FilterCompiler, FilterSpec};
use vectorgate::models::SearchOptions;
use vectorgate::query::SearchRequest;

// ============================================================================
// Sample Filters
// ============================================================================

fn sample_filters() -> Vec<(&'static str, Value)> {
    vec![
        ("empty", json!({})),
        ("scalar", json!({"genre": "drama"})),
        (
            "mixed",
            json!({
                "genre": {"$neq": "horror"},
                "year": {"$gte": 1990, "$lt": 2000},
                "tags": {"$in": ["p1", "p2"]}
            }),
        ),
        (
            "complex",
            json!({
                "genre": {"$nin": ["horror", "thriller", "war"]},
                "year": {"$gt": 1980, "$lte": 2020},
                "rating": {"$gte": 7.5},
                "lang": "en",
                "$and": [{"tags": "a"}, {"tags": "b"}, {"tags": "c"}, {"cast": "x"}]
            }),
        ),
    ]
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_parse");
    group.measurement_time(Duration::from_secs(5));

    for (name, filter) in sample_filters() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &filter, |b, filter| {
            b.iter(|| FilterSpec::from_json(black_box(filter)));
        });
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_compile");
    group.measurement_time(Duration::from_secs(5));
    let compiler = FilterCompiler::new();

    for (name, filter) in sample_filters() {
        let Ok(spec) = FilterSpec::from_json(&filter) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &spec, |b, spec| {
            b.iter(|| compiler.compile(black_box(spec)));
        });
    }
    group.finish();
}

fn bench_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_request");
    let compiler = FilterCompiler::new();
    let Some((_, filter)) = sample_filters().pop() else {
        return;
    };
    let Ok(tree) = FilterSpec::from_json(&filter).and_then(|spec| compiler.compile(&spec)) else {
        return;
    };

    for dimension in [128_usize, 384, 1536] {
        #[allow(clippy::cast_precision_loss)]
        let vector: Vec<f32> = (0..dimension).map(|i| i as f32 / dimension as f32).collect();
        group.throughput(Throughput::Elements(dimension as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(dimension),
            &vector,
            |b, vector| {
                b.iter(|| {
                    SearchRequest::knn(black_box(vector), tree.clone(), SearchOptions::default())
                        .map(|request| serde_json::to_string(&request))
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_compile, bench_request);
criterion_main!(benches);
