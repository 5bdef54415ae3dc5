//! Benchmarks for treekv node operations

use std::ops::ControlFlow;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tempfile::TempDir;
use treekv::{Config, Store};

fn setup_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .db_path(temp_dir.path().join("bench.redb"))
        .build();
    let store = Store::open(config).unwrap();
    (temp_dir, store)
}

fn fill(store: &Store, count: u64) {
    store
        .node(["bench"])
        .tx_update(|n| {
            for i in 0..count {
                n.set(&format!("{:08}", i), &i)?;
            }
            Ok(())
        })
        .unwrap();
}

fn store_benchmarks(c: &mut Criterion) {
    let (_temp, store) = setup_store();
    fill(&store, 1_000);
    let node = store.node(["bench"]);

    c.bench_function("set", |b| {
        let mut i = 0u64;
        b.iter(|| {
            node.set(&format!("w{:08}", i), &i).unwrap();
            i += 1;
        })
    });

    c.bench_function("get", |b| {
        b.iter(|| black_box(node.get::<u64>("00000500").unwrap()))
    });

    c.bench_function("set_batch_100", |b| {
        let mut round = 0u64;
        b.iter(|| {
            node.tx_update(|n| {
                for i in 0..100u64 {
                    n.set(&format!("b{:08}-{:03}", round, i), &i)?;
                }
                Ok(())
            })
            .unwrap();
            round += 1;
        })
    });

    c.bench_function("each_1000", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            node.each("0", |_, v: &u64, _| {
                sum += *v;
                Ok(ControlFlow::Continue(()))
            })
            .unwrap();
            black_box(sum)
        })
    });

    c.bench_function("drop_except_last_100", |b| {
        b.iter_batched(
            || {
                let (temp, store) = setup_store();
                fill(&store, 1_000);
                (temp, store)
            },
            |(_temp, store)| store.node(["bench"]).drop_except_last(100).unwrap(),
            BatchSize::PerIteration,
        )
    });
}

criterion_group!(benches, store_benchmarks);
criterion_main!(benches);
