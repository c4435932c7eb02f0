//! Criterion micro-benchmarks for heap allocation, free and field access.

use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use criterion::{criterion_group, criterion_main, Criterion};
use crossbeam_channel::unbounded;
use rawmem_bench::{churn, churn_sizes};
use rawmem_heap::{Heap, Struct};
use rawmem_test_utils::{guarded, guarded_increment, heap_with_capacity, Bar};

/// Benchmark: allocate and free one 58-byte record in an empty 64KB heap.
fn bench_allocate_free(c: &mut Criterion) {
    let heap = heap_with_capacity(64 * 1024);
    c.bench_function("allocate_free_record", |b| {
        b.iter(|| {
            let bar = Bar::new_in(&heap).unwrap();
            black_box(bar.heap_offset());
            heap.free(&bar);
        });
    });
}

/// Benchmark: first-fit allocation behind 1K fragmented blocks.
fn bench_allocate_fragmented(c: &mut Criterion) {
    let heap = heap_with_capacity(64 * 1024);
    let sizes = churn_sizes(2_000, 24, 42);
    let _survivors = churn(&heap, &sizes).unwrap();
    c.bench_function("allocate_fragmented_64", |b| {
        b.iter(|| {
            let view = heap.allocate(64).unwrap();
            black_box(view.start());
            heap.free_view(&view);
        });
    });
}

/// Benchmark: write and read back every field of a record.
fn bench_field_access(c: &mut Criterion) {
    let heap = heap_with_capacity(1024);
    let bar = Bar::new_in(&heap).unwrap();
    c.bench_function("record_field_round_trip", |b| {
        b.iter(|| {
            bar.a().set(black_box(513));
            bar.b().set(black_box(70_000));
            bar.d().set(black_box(-12));
            bar.e().set(black_box("benchmark"));
            black_box((bar.a().get(), bar.b().get(), bar.d().get(), bar.e().get()));
        });
    });
}

/// Benchmark: uncontended lock, read-modify-write and release of an
/// arena-resident counter.
fn bench_lock_round_trip(c: &mut Criterion) {
    let heap = heap_with_capacity(1024);
    let counter = guarded(&heap);
    c.bench_function("guarded_increment", |b| {
        b.iter(|| guarded_increment(black_box(&counter)));
    });
}

/// Benchmark: four threads contending on one heap's lock.
fn bench_contended_allocate(c: &mut Criterion) {
    let heap: Arc<Heap> = heap_with_capacity(64 * 1024);
    c.bench_function("contended_allocate_4x100", |b| {
        b.iter(|| {
            let (tx, rx) = unbounded();
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let heap = Arc::clone(&heap);
                    let tx = tx.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            tx.send(heap.allocate(16).unwrap()).unwrap();
                        }
                    })
                })
                .collect();
            drop(tx);
            for handle in handles {
                handle.join().unwrap();
            }
            for view in rx.iter() {
                heap.free_view(&view);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_allocate_free,
    bench_allocate_fragmented,
    bench_field_access,
    bench_lock_round_trip,
    bench_contended_allocate
);
criterion_main!(benches);
