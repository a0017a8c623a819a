//! # Allocator Benchmark
//!
//! Measures the steady-state cost of pool and stack traffic against the
//! system allocator it replaces.
//!
//! Run with: `cargo bench --package tessera_memory`

// Benchmarks don't need docs and never read the pooled payload
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_memory::units::mib;
use tessera_memory::{MemoryManager, PoolAllocator, StackAllocator};

/// Per-frame object count.
const OBJECT_COUNT: usize = 10_000;

/// A particle-sized pooled object.
#[derive(Clone, Copy)]
struct Particle {
    position: [f32; 3],
    velocity: [f32; 3],
    life: f32,
}

impl Particle {
    fn new(i: usize) -> Self {
        let f = i as f32;
        Self {
            position: [f, f, f],
            velocity: [0.1, 0.2, 0.3],
            life: 1.0,
        }
    }
}

/// Benchmark: Create then delete a full frame of particles in a warm pool.
fn bench_pool_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_churn");

    for chunks in [64, 1024, OBJECT_COUNT] {
        let manager = MemoryManager::new(mib(64));
        let mut pool: PoolAllocator<Particle> =
            PoolAllocator::new(&manager, "Bench Particles", chunks).unwrap();
        let mut handles = Vec::with_capacity(OBJECT_COUNT);

        // Warm up so no growth happens inside the measurement
        for i in 0..OBJECT_COUNT {
            handles.push(pool.create(Particle::new(i)));
        }
        for handle in handles.drain(..) {
            pool.delete(handle);
        }

        group.bench_with_input(BenchmarkId::from_parameter(chunks), &chunks, |b, _| {
            b.iter(|| {
                for i in 0..OBJECT_COUNT {
                    handles.push(pool.create(Particle::new(i)));
                }
                for handle in handles.drain(..).rev() {
                    pool.delete(handle);
                }
                black_box(pool.used_size())
            });
        });
    }

    group.finish();
}

/// Baseline: The same churn through `Box`.
fn bench_box_churn(c: &mut Criterion) {
    c.bench_function("box_churn", |b| {
        let mut boxes = Vec::with_capacity(OBJECT_COUNT);
        b.iter(|| {
            for i in 0..OBJECT_COUNT {
                boxes.push(Box::new(Particle::new(i)));
            }
            let count = boxes.len();
            boxes.clear();
            black_box(count)
        });
    });
}

/// Benchmark: Push and pop scratch allocations of mixed alignment.
fn bench_stack_frame(c: &mut Criterion) {
    let manager = MemoryManager::new(mib(64));
    let mut stack = StackAllocator::new(&manager, "Bench Scratch", mib(4)).unwrap();
    let mut live = Vec::with_capacity(256);

    c.bench_function("stack_frame_256_allocations", |b| {
        b.iter(|| {
            for i in 0..256usize {
                let alignment = 1 << (i % 5);
                live.push(stack.allocate(64 + i, alignment).unwrap());
            }
            while let Some(allocation) = live.pop() {
                stack.deallocate(allocation);
            }
            black_box(stack.offset())
        });
    });
}

/// Benchmark: Typed scratch buffer filled through a Pod view.
fn bench_stack_pod_fill(c: &mut Criterion) {
    let manager = MemoryManager::new(mib(64));
    let mut stack = StackAllocator::new(&manager, "Bench Pod Scratch", mib(4)).unwrap();

    c.bench_function("stack_pod_fill_10k_f32", |b| {
        b.iter(|| {
            let allocation = stack.allocate_pod::<f32>(OBJECT_COUNT).unwrap();
            for (i, value) in stack
                .cast_slice_mut::<f32>(&allocation)
                .unwrap()
                .iter_mut()
                .enumerate()
            {
                *value = i as f32;
            }
            let sum: f32 = stack.cast_slice::<f32>(&allocation).unwrap().iter().sum();
            stack.deallocate(allocation);
            black_box(sum)
        });
    });
}

/// Benchmark: Registry snapshot with many live allocators.
fn bench_registry_report(c: &mut Criterion) {
    let manager = MemoryManager::new(mib(64));
    let pools: Vec<PoolAllocator<u64>> = (0..32)
        .map(|i| PoolAllocator::new(&manager, format!("Pool {i}"), 16).unwrap())
        .collect();

    c.bench_function("registry_report_32_allocators", |b| {
        b.iter(|| black_box(manager.report().used_size()));
    });

    drop(pools);
}

criterion_group!(
    benches,
    bench_pool_churn,
    bench_box_churn,
    bench_stack_frame,
    bench_stack_pod_fill,
    bench_registry_report,
);

criterion_main!(benches);
