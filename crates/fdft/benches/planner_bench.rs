use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fdft::{Planner, PlannerConfig, PlannerFlags, Problem};

fn estimate_planner() -> Planner {
    Planner::new(PlannerConfig::default().with_flags(PlannerFlags::ESTIMATE))
}

fn bench_estimate_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_estimate");
    for n in [64usize, 360, 997] {
        let problem = Problem::dft_1d(n, -1).expect("problem");
        group.bench_with_input(BenchmarkId::from_parameter(n), &problem, |b, problem| {
            b.iter(|| estimate_planner().plan(problem).expect("plan"));
        });
    }
    group.finish();
}

fn bench_wisdom_replay(c: &mut Criterion) {
    let problem = Problem::dft_1d(1024, -1).expect("problem");
    let mut planner = estimate_planner();
    planner.plan(&problem).expect("warm wisdom");
    c.bench_function("plan_from_wisdom_1024", |b| {
        b.iter(|| planner.plan(&problem).expect("replay"));
    });
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");
    for n in [256usize, 1024, 997] {
        let plan = estimate_planner()
            .plan(&Problem::dft_1d(n, -1).expect("problem"))
            .expect("plan");
        let mut input = (0..2 * n).map(|i| (i as f64 * 0.1).sin()).collect::<Vec<_>>();
        let mut output = vec![0.0; 2 * n];
        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            b.iter(|| plan.execute(&mut input, &mut output).expect("execute"));
        });
    }
    group.finish();
}

fn bench_wisdom_export_import(c: &mut Criterion) {
    let mut planner = estimate_planner();
    for n in [48usize, 64, 100, 128, 997] {
        planner
            .plan(&Problem::dft_1d(n, -1).expect("problem"))
            .expect("plan");
    }
    let text = planner.export_wisdom();
    c.bench_function("wisdom_export", |b| b.iter(|| planner.export_wisdom()));
    c.bench_function("wisdom_import", |b| {
        b.iter(|| estimate_planner().import_wisdom(&text).accepted);
    });
}

criterion_group!(
    benches,
    bench_estimate_planning,
    bench_wisdom_replay,
    bench_execute,
    bench_wisdom_export_import
);
criterion_main!(benches);
