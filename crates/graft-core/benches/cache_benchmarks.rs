//! Benchmarks for memoized lookups and cached plan retrieval
//!
//! Compares the two key comparison strategies of the memo cache and
//! measures the cost of fetching an already compiled plan.
//!
//! Copyright (c) 2025 Graft Team
//! Licensed under the Apache-2.0 license

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graft_core::{
    KeyComparison, Mapper, MemoCache, RuleSetKind, TypeDescriptor, TypeKey, TypeRegistry,
};
use std::sync::Arc;

fn create_registry() -> TypeRegistry {
    TypeRegistry::new()
        .with(TypeDescriptor::enumerable("List<Order>", "Order"))
        .with(TypeDescriptor::enumerable("List<OrderDto>", "OrderDto"))
        .with(
            TypeDescriptor::complex("Customer")
                .property("Id", "I32")
                .property("Name", "String")
                .property("Address", "Address")
                .property("Orders", "List<Order>")
                .build(),
        )
        .with(
            TypeDescriptor::complex("Address")
                .property("Line1", "String")
                .property("City", "String")
                .build(),
        )
        .with(TypeDescriptor::complex("Order").property("Sku", "String").build())
        .with(
            TypeDescriptor::complex("CustomerDto")
                .property("Id", "I64")
                .property("Name", "String")
                .property("AddressLine1", "String")
                .property("AddressCity", "String")
                .property("Orders", "List<OrderDto>")
                .build(),
        )
        .with(TypeDescriptor::complex("OrderDto").property("Sku", "String").build())
}

fn bench_cache_hits(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_hits");

    for comparison in [KeyComparison::Equality, KeyComparison::HashOrdered] {
        for size in [4usize, 32, 256] {
            let cache: MemoCache<String, usize> = MemoCache::new("bench", comparison);
            for i in 0..size {
                cache.get_or_add(format!("key-{i}"), |_| i);
            }
            // last inserted key is the worst case for a linear scan
            let last_key = format!("key-{}", size - 1);

            group.bench_with_input(
                BenchmarkId::new(comparison.to_string(), size),
                &last_key,
                |b, last_key| {
                    b.iter(|| {
                        let value = cache.get_or_add(black_box(last_key.clone()), |_| 0);
                        black_box(value)
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_plan_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_lookup");
    let registry = Arc::new(create_registry());
    let source = TypeKey::new("Customer");
    let target = TypeKey::new("CustomerDto");

    group.bench_function("compile", |b| {
        b.iter(|| {
            let mapper = Mapper::new(Arc::clone(&registry)).unwrap();
            let plan = mapper
                .plan_for(black_box(&source), black_box(&target), RuleSetKind::CreateNew)
                .unwrap();
            black_box(plan)
        })
    });

    group.bench_function("cached", |b| {
        let mapper = Mapper::new(Arc::clone(&registry)).unwrap();
        mapper
            .plan_for(&source, &target, RuleSetKind::CreateNew)
            .unwrap();
        b.iter(|| {
            let plan = mapper
                .plan_for(black_box(&source), black_box(&target), RuleSetKind::CreateNew)
                .unwrap();
            black_box(plan)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_cache_hits, bench_plan_lookup);
criterion_main!(benches);
