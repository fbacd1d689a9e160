use criterion::{black_box, criterion_group, Criterion};

use e2e_benchmarks::{garage, run};
use common::PlanHints;

const EQUI_JOIN: &str = "SELECT c.model, m.country FROM cars c JOIN makers m ON c.maker = m.name";
const CHILD_JOIN: &str = "SELECT c.model FROM makers m JOIN cars c ON ISCHILDNODE(c, m)";

fn nested_only() -> PlanHints {
    PlanHints {
        use_only_nested_join_algorithm: true,
        ..PlanHints::default()
    }
}

fn bench_join(c: &mut Criterion, name: &str, makers: usize, cars_per_maker: usize) {
    let engine = garage(makers, cars_per_maker);
    let merge = PlanHints::default();
    let nested = nested_only();
    c.bench_function(&format!("{}_merge", name), |b| {
        b.iter(|| run(&engine, &merge, black_box(EQUI_JOIN)))
    });
    c.bench_function(&format!("{}_nested", name), |b| {
        b.iter(|| run(&engine, &nested, black_box(EQUI_JOIN)))
    });
}

fn bench_join_tiny(c: &mut Criterion) {
    bench_join(c, "join_tiny", 5, 4);
}

fn bench_join_small(c: &mut Criterion) {
    bench_join(c, "join_small", 20, 25);
}

fn bench_join_large(c: &mut Criterion) {
    bench_join(c, "join_large", 50, 100);
}

fn bench_child_join(c: &mut Criterion) {
    let engine = garage(20, 25);
    let hints = PlanHints::default();
    c.bench_function("join_child_node", |b| {
        b.iter(|| run(&engine, &hints, black_box(CHILD_JOIN)))
    });
}

criterion_group! {
    name = joinbench;
    config = Criterion::default().sample_size(10);
    targets =
    bench_join_tiny,
    bench_join_small,
    bench_join_large,
    bench_child_join,
}
