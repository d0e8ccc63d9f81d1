use std::hint::black_box;
use std::time::Duration;

use brandpulse::services::{CacheStore, RequestCoalescer};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn filled_store(size: usize) -> CacheStore<String> {
    let mut store = CacheStore::new(size, Duration::from_secs(300));
    for i in 0..size {
        store.set(format!("narratives:{i}:window"), format!("value-{i}"), None);
    }
    store
}

fn bench_set_with_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_set");
    for size in [100usize, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut store = filled_store(size);
            let mut next = size;
            b.iter(|| {
                next += 1;
                store.set(format!("narratives:{next}:window"), "value".to_string(), None);
            });
        });
    }
    group.finish();
}

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_get");
    for size in [100usize, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut store = filled_store(size);
            let key = format!("narratives:{}:window", size / 2);
            b.iter(|| black_box(store.get(&key)));
        });
    }
    group.finish();
}

fn bench_coalesced_hit(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let coalescer = RequestCoalescer::new(filled_store(1000));

    c.bench_function("coalescer_cached_dedupe", |b| {
        b.to_async(&runtime).iter(|| async {
            let result = coalescer
                .dedupe("narratives:500:window", || async { Ok("fresh".to_string()) })
                .await;
            black_box(result.map(|coalesced| coalesced.value))
        });
    });
}

criterion_group!(benches, bench_set_with_eviction, bench_get_hit, bench_coalesced_hit);
criterion_main!(benches);
