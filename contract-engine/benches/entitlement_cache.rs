//! Benchmark suite for entitlement resolution and usage tracking.
//!
//! Measures:
//! - Raw evaluation of a selection against a pricing version
//! - Fingerprint computation
//! - Cache hits versus cold computations
//! - A full increment through the contract manager
//!
//! Run with: `cargo bench --bench entitlement_cache`

#![allow(clippy::let_underscore_must_use, reason = "Criterion benchmarks ignore results")]
#![allow(missing_docs, reason = "Benchmark functions are self-documenting")]

use std::{collections::BTreeMap, hint::black_box, num::NonZeroUsize, time::Duration};

use contract_engine::{
    ContractManager, EngineError,
    catalog::{InMemoryCatalog, PricingVersion, PricingVersionRef},
    config::EngineConfig,
    contract::{ContactInfo, CreateContractParams, InMemoryContractStore, UserId},
    entitlements::{EntitlementCache, Fingerprint, evaluate},
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

const PETCLINIC_2024: &str = include_str!("../tests/fixtures/petclinic-2024.json");

fn pricing() -> PricingVersion {
    serde_json::from_str(PETCLINIC_2024).expect("fixture should parse")
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread().enable_all().build().expect("runtime should build")
}

/// Benchmark evaluation with a growing add-on selection
fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let pricing = pricing();

    let selections: [(&str, &str, BTreeMap<String, u32>); 3] = [
        ("plan_only", "basic", BTreeMap::new()),
        ("one_add_on", "basic", BTreeMap::from([("extraCalls".to_owned(), 3)])),
        (
            "three_add_ons",
            "basic",
            BTreeMap::from([
                ("analytics".to_owned(), 1),
                ("callPacks".to_owned(), 4),
                ("extraCalls".to_owned(), 3),
            ]),
        ),
    ];

    for (name, plan, add_ons) in &selections {
        group.bench_with_input(BenchmarkId::from_parameter(name), add_ons, |b, add_ons| {
            b.iter(|| black_box(evaluate(black_box(&pricing), black_box(plan), black_box(add_ons))));
        });
    }

    group.finish();
}

/// Benchmark fingerprint computation
fn bench_fingerprint(c: &mut Criterion) {
    let pricing = PricingVersionRef::new("petclinic", "2024");
    let add_ons = BTreeMap::from([("callPacks".to_owned(), 4), ("extraCalls".to_owned(), 3)]);

    c.bench_function("fingerprint_compute", |b| {
        b.iter(|| {
            black_box(Fingerprint::compute(
                black_box(&pricing),
                black_box("basic"),
                black_box(&add_ons),
            ))
        });
    });
}

/// Benchmark cache hits against cold computations
fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("entitlement_cache");
    let runtime = runtime();
    let pricing = pricing();
    let reference = pricing.reference();
    let add_ons = BTreeMap::from([("extraCalls".to_owned(), 2)]);
    let fingerprint = Fingerprint::compute(&reference, "basic", &add_ons);

    let capacity = NonZeroUsize::new(128).expect("non-zero capacity");
    let warm = EntitlementCache::new(capacity, Duration::from_secs(5));
    let seeded = evaluate(&pricing, "basic", &add_ons).expect("selection should be valid");
    runtime
        .block_on(warm.get_or_compute(&fingerprint, &reference, || async move { Ok(seeded) }))
        .expect("seed should succeed");

    group.bench_function("hit", |b| {
        b.to_async(&runtime).iter(|| async {
            let set = warm
                .get_or_compute(&fingerprint, &reference, || {
                    std::future::ready(Err(EngineError::Internal("warm cache recomputed".into())))
                })
                .await;
            black_box(set)
        });
    });

    group.bench_function("miss", |b| {
        b.to_async(&runtime).iter(|| async {
            let cold = EntitlementCache::new(capacity, Duration::from_secs(5));
            let computed = evaluate(&pricing, "basic", &add_ons);
            let set = cold
                .get_or_compute(&fingerprint, &reference, || async move { computed })
                .await;
            black_box(set)
        });
    });

    group.finish();
}

/// Benchmark an increment through the manager, including the per-contract
/// lock, the cached entitlements and the store commit
fn bench_increment(c: &mut Criterion) {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::ERROR).try_init();

    let runtime = runtime();
    let catalog = InMemoryCatalog::new();
    catalog.publish_json(PETCLINIC_2024).expect("fixture should publish");
    let manager =
        ContractManager::new(InMemoryContractStore::new(), catalog, &EngineConfig::default())
            .expect("manager should build");

    let user = UserId::new("bench-user").expect("valid user id");
    runtime
        .block_on(manager.create_contract(
            CreateContractParams::new(
                user.clone(),
                ContactInfo::new("bench"),
                PricingVersionRef::new("petclinic", "2024"),
                "pro",
            )
            .with_add_on("unlimitedCalls", 1),
        ))
        .expect("contract should be created");

    c.bench_function("increment_usage", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(manager.increment_usage(&user, "apiCalls", Decimal::ONE).await)
        });
    });
}

criterion_group!(benches, bench_evaluate, bench_fingerprint, bench_cache, bench_increment);
criterion_main!(benches);
