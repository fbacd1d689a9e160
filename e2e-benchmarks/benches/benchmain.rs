use criterion::criterion_main;

mod benchmarks;

criterion_main! {
    benchmarks::joinbench::joinbench,
    benchmarks::querybench::querybench,
}
