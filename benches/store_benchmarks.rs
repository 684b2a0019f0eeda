// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for the JDB document store

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use tokio::runtime::Runtime;

use jdb_store::{Collection, Engine, Filter, FindOptions, JdbConfig, SortDirection, Update};

fn user(i: usize) -> Value {
    json!({
        "name": format!("user-{i}"),
        "age": 18 + (i * 7) % 60,
        "tags": ["bench", if i % 2 == 0 { "even" } else { "odd" }],
    })
}

fn seeded(rt: &Runtime, engine: &Engine, name: &str, size: usize) -> Collection {
    let collection = engine.collection(name).unwrap();
    rt.block_on(async {
        collection
            .insert_many((0..size).map(user).collect())
            .await
            .unwrap();
    });
    collection
}

// ============================================================================
// Insert Benchmarks
// ============================================================================

fn bench_insert(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("insert");

    group.bench_function("in_memory", |b| {
        let engine = Engine::new(JdbConfig::in_memory());
        let collection = engine.collection("users").unwrap();
        let mut i = 0;
        b.to_async(&rt).iter(|| {
            i += 1;
            let collection = collection.clone();
            let doc = user(i);
            async move { black_box(collection.insert(doc).await.unwrap()) }
        });
    });

    // Saves coalesce, so this mostly measures the in-memory path plus
    // the occasional snapshot.
    group.bench_function("on_disk", |b| {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::new(JdbConfig::new(dir.path()));
        let collection = engine.collection("users").unwrap();
        let mut i = 0;
        b.to_async(&rt).iter(|| {
            i += 1;
            let collection = collection.clone();
            let doc = user(i);
            async move { black_box(collection.insert(doc).await.unwrap()) }
        });
        rt.block_on(collection.flush()).unwrap();
    });

    group.finish();
}

// ============================================================================
// Query Benchmarks
// ============================================================================

fn bench_find(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engine = Engine::new(JdbConfig::in_memory());
    let mut group = c.benchmark_group("find");

    for size in [100usize, 1_000, 10_000] {
        let collection = seeded(&rt, &engine, &format!("users-{size}"), size);
        let filter = Filter::parse(&json!({
            "$or": [{"age": {"$lt": 25}}, {"tags": {"$in": ["odd"]}}],
            "name": {"$regex": "^user-"}
        }))
        .unwrap();
        let options = FindOptions::new()
            .sort_by("age", SortDirection::Descending)
            .skip(10)
            .limit(20);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("filter_sort_page", size), &size, |b, _| {
            b.to_async(&rt)
                .iter(|| async { black_box(collection.find(&filter, &options).await.unwrap()) });
        });
    }

    group.finish();
}

fn bench_filter_parse(c: &mut Criterion) {
    let raw = json!({
        "age": {"$gte": 18, "$lt": 65},
        "$or": [{"role": "admin"}, {"role": {"$in": ["owner", "editor"]}}],
        "email": {"$regex": "@example\\.com$"}
    });

    c.bench_function("filter_parse", |b| {
        b.iter(|| black_box(Filter::parse(black_box(&raw)).unwrap()))
    });
}

// ============================================================================
// Update Benchmarks
// ============================================================================

fn bench_update(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let engine = Engine::new(JdbConfig::in_memory());
    let collection = seeded(&rt, &engine, "users", 1_000);
    let filter = Filter::all();
    let update = Update::new().inc("visits", 1).set("seen", true);

    let mut group = c.benchmark_group("update");
    group.throughput(Throughput::Elements(1_000));
    group.bench_function("multi_1000", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(collection.update(&filter, &update, true).await.unwrap()) });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_find,
    bench_filter_parse,
    bench_update
);
criterion_main!(benches);
