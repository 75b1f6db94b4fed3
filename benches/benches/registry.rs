//! Registry lookup, listing and registration.
//!
//! Run with: `cargo bench --package ctxkit-benches --bench registry`

// Allow missing docs for criterion_group! macro generated functions
#![allow(missing_docs)]

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ctxkit_benches::{Fixed, populated_registry};
use ctxkit_server::ToolRegistry;

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_lookup");

    for size in [10, 100, 1000] {
        let registry = populated_registry(size);
        group.bench_with_input(BenchmarkId::new("hit", size), &registry, |b, registry| {
            b.iter(|| black_box(registry.lookup(black_box("echo"))));
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &registry, |b, registry| {
            b.iter(|| black_box(registry.lookup(black_box("nope"))));
        });
    }

    group.finish();
}

fn bench_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_list");

    for size in [10, 100, 1000] {
        let registry = populated_registry(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &registry, |b, registry| {
            b.iter(|| black_box(registry.list()));
        });
    }

    group.finish();
}

fn bench_register(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_register");

    group.bench_function("fresh_100", |b| {
        b.iter(|| {
            let registry = ToolRegistry::new();
            for n in 0..100 {
                let _ = registry.register(Arc::new(Fixed::new(format!("tool-{n}"))));
            }
            black_box(registry.len())
        });
    });

    group.bench_function("duplicate", |b| {
        let registry = populated_registry(100);
        b.iter(|| black_box(registry.register(Arc::new(Fixed::new("echo"))).is_err()));
    });

    group.finish();
}

criterion_group!(benches, bench_lookup, bench_list, bench_register);
criterion_main!(benches);
