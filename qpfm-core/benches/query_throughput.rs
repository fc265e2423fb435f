//! Query throughput across repository sizes and query types.
//!
//! Run with:
//! ```bash
//! cargo bench --bench query_throughput
//! ```

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use qpfm_core::{
    Coordinates, EngineConfig, HarmonicCategory, HarmonicSignature, InsightDelivery, MemoryContent,
    MemoryItem, MemoryQuery, QuantumMemoryEngine,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn populated_engine(size: usize, delivery: InsightDelivery) -> QuantumMemoryEngine {
    let engine = QuantumMemoryEngine::new(EngineConfig {
        seed: Some(7),
        insight_delivery: delivery,
        ..EngineConfig::default()
    })
    .unwrap();

    let mut rng = StdRng::seed_from_u64(size as u64);
    let items: Vec<MemoryItem> = (0..size)
        .map(|i| {
            let category = HarmonicCategory::ALL[i % HarmonicCategory::ALL.len()];
            let signature = HarmonicSignature::new(category, rng.gen_range(0.1..1.0), rng.gen_range(0.0..1.0));
            MemoryItem::new(
                format!("bench-{i}"),
                Coordinates::new(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)),
                MemoryContent::new(format!("pattern {i}"), signature).with_tags([category.as_str()]),
            )
        })
        .collect();
    engine.bulk_store(items).unwrap();
    engine
}

fn bench_query_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_by_type");
    let engine = populated_engine(500, InsightDelivery::Disabled);
    let signature = HarmonicSignature::new(HarmonicCategory::Wave, 0.8, 0.4);

    let queries = [
        ("precision", MemoryQuery::precision().with_signature(signature.clone())),
        ("discovery", MemoryQuery::discovery().with_signature(signature)),
        ("creative", MemoryQuery::creative().with_exploration(0.8)),
    ];
    for (name, query) in &queries {
        group.bench_function(*name, |b| {
            b.iter(|| black_box(engine.query(black_box(query)).unwrap()));
        });
    }
    group.finish();
}

fn bench_repository_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("discovery_by_size");
    for size in [100, 1_000, 5_000] {
        let engine = populated_engine(size, InsightDelivery::Disabled);
        let query = MemoryQuery::discovery().with_context(["bench-0"]);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &query, |b, query| {
            b.iter(|| black_box(engine.query(query).unwrap()));
        });
    }
    group.finish();
}

fn bench_inline_emergence(c: &mut Criterion) {
    let engine = populated_engine(1_000, InsightDelivery::Inline);
    let query = MemoryQuery::discovery().with_exploration(0.5);
    c.bench_function("discovery_with_inline_emergence", |b| {
        b.iter(|| black_box(engine.query(&query).unwrap()));
    });
}

criterion_group!(benches, bench_query_types, bench_repository_size, bench_inline_emergence);
criterion_main!(benches);
