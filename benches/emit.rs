//! Kernel generation latency.
//!
//! Measures:
//! 1. A long arithmetic chain (operator overloads, inference, memoized emit)
//! 2. Each built-in kernel end to end, including finalize and manifest

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sjit::kernels;
use sjit::{KernelBuilder, Resource, Ty};

/// `n` dependent multiply-adds on one thread's value.
fn arithmetic_chain(n: usize) -> String {
    let kb = KernelBuilder::new("chain");
    let out = kb.resource(&Resource::rw_buffer("g_out", Ty::f32()));
    let i = kb.thread_id().x();
    let mut acc = i.to_f32();
    for _ in 0..n {
        acc = &acc * 1.5f32 + 0.25f32;
    }
    out.write(&i, &acc);
    kb.text()
}

fn bench_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("arithmetic_chain");
    group.bench_function("100_ops", |b| b.iter(|| arithmetic_chain(black_box(100))));
    group.bench_function("1000_ops", |b| b.iter(|| arithmetic_chain(black_box(1000))));
    group.finish();
}

fn bench_catalog(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog");
    for def in kernels::catalog() {
        group.bench_function(def.name, |b| b.iter(|| def.build_default()));
    }
    group.finish();
}

criterion_group!(benches, bench_arithmetic, bench_catalog);
criterion_main!(benches);
