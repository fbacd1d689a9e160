use criterion::{black_box, criterion_group, Criterion};

use e2e_benchmarks::{context, garage, run};
use common::PlanHints;

fn bench_plan_view_chain(c: &mut Criterion) {
    let engine = garage(1, 1);
    let context = context(PlanHints::default());
    let query = engine
        .parse("sql", "SELECT maker FROM A WHERE maker LIKE 'H%' ORDER BY maker")
        .unwrap();
    c.bench_function("plan_view_chain", |b| {
        b.iter(|| engine.plan(&context, black_box(&query)))
    });
}

fn bench_scan_sort_limit(c: &mut Criterion) {
    let engine = garage(50, 100);
    let hints = PlanHints::default();
    let sql = "SELECT model, year FROM cars WHERE year BETWEEN 1970 AND 2000 ORDER BY msrp DESC LIMIT 20";
    c.bench_function("scan_sort_limit", |b| {
        b.iter(|| run(&engine, &hints, black_box(sql)))
    });
}

fn bench_view_scan(c: &mut Criterion) {
    let engine = garage(50, 100);
    let hints = PlanHints::default();
    let sql = "SELECT v.carModel FROM car_models v WHERE v.maker = 'maker7'";
    c.bench_function("view_scan", |b| {
        b.iter(|| run(&engine, &hints, black_box(sql)))
    });
}

criterion_group! {
    name = querybench;
    config = Criterion::default().sample_size(10);
    targets =
    bench_plan_view_chain,
    bench_scan_sort_limit,
    bench_view_scan,
}
