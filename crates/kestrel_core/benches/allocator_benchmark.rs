//! Allocate/release churn benchmarks for the block pool.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kestrel_core::{BlockAllocator, RefCount, RefCounted};

struct Payload {
    refs: RefCount,
    data: [u64; 8],
}

impl Payload {
    fn new(seed: u64) -> Self {
        Self {
            refs: RefCount::new(),
            data: [seed; 8],
        }
    }
}

impl RefCounted for Payload {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

fn bench_allocate_churn(c: &mut Criterion) {
    c.bench_function("allocate_drop_gc_1000", |b| {
        let pool: BlockAllocator<Payload> = BlockAllocator::new(256);
        b.iter(|| {
            for i in 0..1000u64 {
                let handle = pool.allocate(Payload::new(i));
                black_box(&handle.data);
            }
            black_box(pool.gc());
        });
    });
}

fn bench_allocate_retained(c: &mut Criterion) {
    c.bench_function("allocate_retained_1000", |b| {
        b.iter(|| {
            let pool: BlockAllocator<Payload> = BlockAllocator::new(256);
            let handles: Vec<_> = (0..1000u64).map(|i| pool.allocate(Payload::new(i))).collect();
            black_box(handles.len());
            drop(handles);
            black_box(pool.gc());
        });
    });
}

fn bench_clone_traffic(c: &mut Criterion) {
    c.bench_function("handle_clone_drop_1000", |b| {
        let pool: BlockAllocator<Payload> = BlockAllocator::new(256);
        let handle = pool.allocate(Payload::new(0));
        b.iter(|| {
            for _ in 0..1000 {
                black_box(handle.clone());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_allocate_churn,
    bench_allocate_retained,
    bench_clone_traffic
);
criterion_main!(benches);
