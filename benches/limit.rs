use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keylimit::LimiterRegistry;

use std::time::Duration;

fn registry(rt: &tokio::runtime::Runtime) -> LimiterRegistry {
    // The sweeper is spawned onto the runtime the registry is built in.
    let _enter = rt.enter();
    LimiterRegistry::new(Duration::from_secs(60), 1_000_000.0, 1_000_000, Duration::from_secs(180))
        .unwrap()
}

fn limit_existing_key(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = registry(&rt);
    registry.limit("hot");

    c.bench_function("limit_existing_key", |b| {
        b.iter(|| black_box(registry.limit(black_box("hot"))));
    });
}

fn limit_new_keys(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = registry(&rt);
    let keys: Vec<String> = (0..100_000).map(|i| format!("client-{i}")).collect();
    let mut next = keys.iter().cycle();

    c.bench_function("limit_rotating_keys", |b| {
        b.iter(|| {
            let key = next.next().unwrap();
            black_box(registry.limit(black_box(key)))
        });
    });
}

fn limit_throttled_key(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _enter = rt.enter();
    let registry =
        LimiterRegistry::new(Duration::from_secs(60), 0.001, 1, Duration::from_secs(180)).unwrap();
    registry.limit("exhausted");

    c.bench_function("limit_throttled_key", |b| {
        b.iter(|| black_box(registry.limit(black_box("exhausted"))));
    });
}

criterion_group!(benches, limit_existing_key, limit_new_keys, limit_throttled_key);
criterion_main!(benches);
