//! Performance benchmarks for batch preparation and windowed dispatch

use catalyst::abstractions::MockGenerationClient;
use catalyst::batch::{diff, plan_windows, prepare_job, BatchOrchestrator, GenerationJob, OptimizationMode};
use catalyst::catalog::{normalize_languages, EntityKind, OptimizableEntity};
use catalyst::ledger::LedgerSnapshot;
use catalyst::plan::Entitlement;
use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Products with a rotating subset of languages already optimized
fn create_entities(count: usize) -> Vec<OptimizableEntity> {
    let covered = ["en", "de", "fr"];
    (0..count)
        .map(|i| {
            OptimizableEntity::new(format!("p{i}"), format!("Product {i}"), EntityKind::Product)
                .with_optimized(&covered[..i % covered.len()])
        })
        .collect()
}

fn bench_language_diff(c: &mut Criterion) {
    let entities = create_entities(1000);
    let requested = normalize_languages(["en", "de", "fr", "es", "it", "nl"]);

    c.bench_function("diff_1000_entities", |b| {
        b.iter(|| {
            entities
                .iter()
                .filter(|e| !diff(e, black_box(&requested), 6).is_skip())
                .count()
        })
    });
}

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare_job");
    let entitlement = Entitlement::for_plan("enterprise");
    let ledger = LedgerSnapshot::with_balance(1_000_000);

    for count in [100, 1000] {
        let job = GenerationJob::new(create_entities(count), ["en", "de", "es"])
            .with_mode(OptimizationMode::AiEnhanced);
        group.bench_with_input(BenchmarkId::from_parameter(count), &job, |b, job| {
            b.iter(|| prepare_job(black_box(job), &entitlement, &ledger, 1, Utc::now()).is_ok())
        });
    }
    group.finish();
}

fn bench_plan_windows(c: &mut Criterion) {
    c.bench_function("plan_windows_10k_by_5", |b| {
        b.iter(|| plan_windows(black_box(10_000), black_box(5)).len())
    });
}

fn bench_generate_phase(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("generate_phase");

    for window in [1, 5, 20] {
        group.bench_with_input(BenchmarkId::new("window", window), &window, |b, &window| {
            b.to_async(&rt).iter(|| async move {
                let orchestrator = BatchOrchestrator::new(Arc::new(MockGenerationClient::new()));
                let job = GenerationJob::new(create_entities(200), ["en", "de"])
                    .with_window_size(window);
                orchestrator
                    .run(job, &Entitlement::for_plan("enterprise"), LedgerSnapshot::default())
                    .await
                    .summary
                    .succeeded
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_language_diff,
    bench_prepare,
    bench_plan_windows,
    bench_generate_phase
);
criterion_main!(benches);
