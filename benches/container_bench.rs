#![allow(clippy::unwrap_used)]
//! 值容器的性能基准测试

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures_util::future;
use holder::{CloseHandler, Container, ContainerSpec, Factory, Slot};
use tokio::runtime::Runtime;

#[derive(Clone)]
struct SimpleService {
    value: i32,
}

/// 单层容器，含 `count` 个缓存槽位 `s0..sN`
fn flat_spec(count: usize) -> Arc<ContainerSpec> {
    let mut builder = ContainerSpec::builder("Flat");
    for i in 0..count {
        builder = builder.slot(Slot::new(
            format!("s{i}"),
            Factory::sync(move |_, _| Ok(SimpleService { value: i as i32 })),
        ));
    }
    builder.build().unwrap()
}

/// 深度为 `depth` 的链：Level0 { inner: Level1 { inner: ... { leaf } } }
fn nested_spec(depth: usize) -> Arc<ContainerSpec> {
    let mut spec = ContainerSpec::builder("Leaf")
        .slot(Slot::new("leaf", Factory::value(SimpleService { value: 7 })).alias("leaf"))
        .build()
        .unwrap();
    for level in 0..depth {
        spec = ContainerSpec::builder(format!("Level{level}"))
            .child("inner", spec)
            .build()
            .unwrap();
    }
    spec
}

fn bench_cache_performance(c: &mut Criterion) {
    let spec = flat_spec(1);
    let mut group = c.benchmark_group("cache_performance");

    group.bench_function("cache_miss", |b| {
        b.iter(|| {
            let root = Container::new(&spec);
            let service = root.resolve_as::<SimpleService>("s0").unwrap();
            black_box(service.value)
        });
    });

    group.bench_function("cache_hit", |b| {
        let root = Container::new(&spec);
        let _ = root.resolve("s0").unwrap();
        b.iter(|| {
            let service = root.resolve_as::<SimpleService>("s0").unwrap();
            black_box(service.value)
        });
    });

    group.finish();
}

fn bench_tree_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_construction");

    for slot_count in [1, 10, 100].iter() {
        let spec = flat_spec(*slot_count);
        group.bench_with_input(BenchmarkId::new("flat", slot_count), slot_count, |b, _| {
            b.iter(|| black_box(Container::new(&spec)));
        });
    }

    for depth in [1, 8, 32].iter() {
        let spec = nested_spec(*depth);
        group.bench_with_input(BenchmarkId::new("nested", depth), depth, |b, _| {
            b.iter(|| black_box(Container::new(&spec)));
        });
    }

    group.finish();
}

fn bench_path_and_alias_lookup(c: &mut Criterion) {
    let depth = 16;
    let spec = nested_spec(depth);
    let root = Container::new(&spec);
    let path = format!("{}leaf", "inner.".repeat(depth));
    let _ = root.resolve(&path).unwrap();

    let mut group = c.benchmark_group("lookup");
    group.bench_function("dotted_path", |b| {
        b.iter(|| black_box(root.resolve(&path).unwrap()));
    });
    group.bench_function("alias", |b| {
        b.iter(|| black_box(root.lookup("leaf").unwrap()));
    });
    group.finish();
}

fn bench_close(c: &mut Criterion) {
    let mut group = c.benchmark_group("close");

    for handler_count in [10, 100, 1000].iter() {
        let spec = ContainerSpec::builder("Closing")
            .slot(
                Slot::new("n", Factory::value(0u64))
                    .no_cache()
                    .on_close(CloseHandler::sync(|_, _, _| Ok(()))),
            )
            .build()
            .unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(handler_count),
            handler_count,
            |b, &handler_count| {
                b.iter(|| {
                    let root = Container::new(&spec);
                    for _ in 0..handler_count {
                        let _ = root.resolve("n").unwrap();
                    }
                    root.close().unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_concurrent_resolution(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let spec = ContainerSpec::builder("Async")
        .slot(Slot::new(
            "svc",
            Factory::from_async(|_, _| async { Ok::<_, holder::BoxError>(SimpleService { value: 42 }) }),
        ))
        .build()
        .unwrap();

    let mut group = c.benchmark_group("concurrent_resolution");

    for concurrent_count in [10, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrent_count),
            concurrent_count,
            |b, &concurrent_count| {
                b.to_async(&runtime).iter(|| {
                    let root = Container::new(&spec);
                    async move {
                        let handles: Vec<_> = (0..concurrent_count)
                            .map(|_| {
                                let root = root.clone();
                                tokio::spawn(async move {
                                    root.resolve_as_async::<SimpleService>("svc").await.unwrap().value
                                })
                            })
                            .collect();
                        let results = future::join_all(handles).await;
                        black_box(results.len())
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_cache_performance,
    bench_tree_construction,
    bench_path_and_alias_lookup,
    bench_close,
    bench_concurrent_resolution
);
criterion_main!(benches);
