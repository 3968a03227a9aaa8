//! Benchmarks for MNA stamp operations.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use voltlab_core::NodeId;
use voltlab_core::mna::MnaSystem;

fn bench_stamp_resistor_chain(c: &mut Criterion) {
    c.bench_function("stamp_resistor_chain_10", |b| {
        let mut mna = MnaSystem::new(10, 0);
        b.iter(|| {
            mna.clear();
            for i in 1..10 {
                mna.stamp_resistor(NodeId::new(i), NodeId::new(i + 1), black_box(1000.0));
            }
        });
    });
}

fn bench_reset_to_fixed(c: &mut Criterion) {
    c.bench_function("reset_to_fixed_50", |b| {
        let mut mna = MnaSystem::new(50, 5);
        for i in 1..50 {
            mna.stamp_resistor(NodeId::new(i), NodeId::new(i + 1), 1000.0);
        }
        mna.snapshot_fixed();
        b.iter(|| {
            mna.stamp_conductance(NodeId::new(1), NodeId::GROUND, black_box(0.01));
            mna.reset_to_fixed();
        });
    });
}

criterion_group!(benches, bench_stamp_resistor_chain, bench_reset_to_fixed);
criterion_main!(benches);
