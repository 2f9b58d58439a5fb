#![no_main]

use arbitrary::Arbitrary;
use fdft::{IoDim, Planner, PlannerConfig, PlannerFlags, Problem, ProblemKind};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct PlanInput {
    kind: u8,
    dims: Vec<(u8, bool)>,
    howmany: u8,
    in_place: bool,
    backward: bool,
    no_simd: bool,
    no_ugly: bool,
    samples: Vec<f64>,
}

fuzz_target!(|input: PlanInput| {
    let kind = ProblemKind::ALL[usize::from(input.kind) % ProblemKind::ALL.len()];
    let shape = input
        .dims
        .iter()
        .take(3)
        .map(|&(n, wide)| usize::from(n % if wide { 64 } else { 12 }))
        .collect::<Vec<_>>();
    let mut dims = Vec::with_capacity(shape.len());
    let mut stride = 1;
    for &n in shape.iter().rev() {
        dims.push(IoDim::new(n, stride, stride));
        stride *= n.max(1);
    }
    let howmany = usize::from(input.howmany % 4).max(1);
    let mut builder = Problem::builder(kind)
        .dims(&dims)
        .vector_dims(&[IoDim::new(howmany, stride, stride)])
        .in_place(input.in_place);
    if kind.is_complex() && input.backward {
        builder = builder.sign(1);
    }
    // Zero sizes and unsupported layouts are rejected here.
    let Ok(problem) = builder.build() else {
        return;
    };

    let mut flags = PlannerFlags::ESTIMATE;
    if input.no_simd {
        flags = flags | PlannerFlags::NO_SIMD;
    }
    if input.no_ugly {
        flags = flags | PlannerFlags::NO_UGLY;
    }
    let mut planner = Planner::new(PlannerConfig::default().with_flags(flags));
    let Ok(plan) = planner.plan(&problem) else {
        return;
    };

    let len = problem.element_width() * problem.extent();
    let mut data = (0..len)
        .map(|i| input.samples.get(i % input.samples.len().max(1)).copied().unwrap_or(0.5))
        .collect::<Vec<_>>();
    if input.in_place {
        let _ = plan.execute_in_place(&mut data);
    } else {
        let mut out = vec![0.0; len];
        let _ = plan.execute(&mut data, &mut out);
    }
});
