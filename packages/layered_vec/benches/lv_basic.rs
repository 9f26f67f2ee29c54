//! Basic benchmarks for the `layered_vec` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::time::Instant;

use alloc_tracker::Allocator;
use criterion::{Criterion, criterion_group, criterion_main};
use layered_vec::Vector;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = u64;
const TEST_VALUE: TestItem = 1024;
const BATCH_SIZE: usize = 1000;

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("lv_basic");

    let allocs_op = allocs.operation("push_back_grow");
    group.bench_function("push_back_grow", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let mut vector = Vector::<TestItem>::new();

                for _ in 0..BATCH_SIZE {
                    vector.push_back(black_box(TEST_VALUE));
                }

                drop(black_box(vector));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("push_back_reserved");
    group.bench_function("push_back_reserved", |b| {
        b.iter_custom(|iters| {
            let mut vectors = iter::repeat_with(|| Vector::<TestItem>::with_capacity(BATCH_SIZE))
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for vector in &mut vectors {
                for _ in 0..BATCH_SIZE {
                    vector.push_back(black_box(TEST_VALUE));
                }
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("insert_front");
    group.bench_function("insert_front", |b| {
        b.iter_custom(|iters| {
            let mut vectors = iter::repeat_with(|| {
                let mut vector = Vector::<TestItem>::with_capacity(BATCH_SIZE + 1);
                vector.resize(BATCH_SIZE);
                vector
            })
            .take(usize::try_from(iters).unwrap())
            .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for vector in &mut vectors {
                vector.insert(0, black_box(TEST_VALUE));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("erase_front");
    group.bench_function("erase_front", |b| {
        b.iter_custom(|iters| {
            let mut vectors = iter::repeat_with(|| Vector::<TestItem>::with_len(BATCH_SIZE))
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for vector in &mut vectors {
                black_box(vector.erase(0));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("clone");
    group.bench_function("clone", |b| {
        b.iter_custom(|iters| {
            let original = Vector::<TestItem>::with_len(BATCH_SIZE);

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(original.clone()));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("clone_from_reuse");
    group.bench_function("clone_from_reuse", |b| {
        b.iter_custom(|iters| {
            let source = Vector::<TestItem>::with_len(BATCH_SIZE);
            let mut target = Vector::<TestItem>::with_len(BATCH_SIZE);

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                target.clone_from(black_box(&source));
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
