//! Planner and wisdom properties: determinism, memoization, negative
//! caching and plan-tree teardown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fdft::solvers::generic::DftGeneric;
use fdft::{
    Applicability, Buffers, Effort, IoDim, MeasureConfig, OpCount, Offsets, Plan, PlanContext,
    PlanPrinter, Planner, PlannerConfig, PlannerFlags, Problem, ProblemKind, RegistryBuilder, SolveFailure,
    Solver, Verdict, Wakefulness,
};
use fdft_runtime::{TestLogEntry, TestResult};

fn estimate_planner() -> Planner {
    Planner::new(PlannerConfig::default().with_flags(PlannerFlags::ESTIMATE))
}

fn log_pass(test_id: &str, detail: &str) {
    let entry = TestLogEntry::new(test_id, "fdft::planner_properties", detail)
        .with_result(TestResult::Pass);
    eprintln!("{}", entry.to_json_line());
}

fn sample_problems() -> Vec<Problem> {
    vec![
        Problem::dft_1d(64, -1).expect("n=64"),
        Problem::dft_1d(12, 1).expect("n=12"),
        Problem::dft_1d(97, -1).expect("n=97"),
        Problem::dft_rowmajor(&[8, 6], -1).expect("8x6"),
        Problem::r2r_1d(ProblemKind::R2hc, 40).expect("r2hc 40"),
    ]
}

#[test]
fn planning_with_empty_wisdom_is_idempotent() {
    for problem in sample_problems() {
        let first = estimate_planner().plan(&problem).expect("first plan");
        let second = estimate_planner().plan(&problem).expect("second plan");
        assert_eq!(first.describe(), second.describe(), "{problem}");
        assert_eq!(first.ops(), second.ops());
    }
    log_pass("planning_with_empty_wisdom_is_idempotent", "5 problems");
}

#[test]
fn wisdom_round_trip_preserves_every_lookup() {
    let mut source = estimate_planner();
    let problems = sample_problems();
    let plans = problems
        .iter()
        .map(|p| source.plan(p).expect("plan").describe())
        .collect::<Vec<_>>();
    let text = source.export_wisdom();

    let mut target = estimate_planner();
    let report = target.import_wisdom(&text);
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.accepted, source.wisdom().len());
    for (hash, id, _) in source.wisdom().iter() {
        assert_eq!(target.wisdom().lookup(hash, id), source.wisdom().lookup(hash, id));
    }
    assert_eq!(target.export_wisdom(), text);

    let wisdom_only = PlannerFlags::ESTIMATE | PlannerFlags::WISDOM_ONLY;
    for (problem, expected) in problems.iter().zip(&plans) {
        let replayed = target
            .plan_with_flags(problem, wisdom_only)
            .expect("wisdom answers the problem");
        assert!(replayed.wisdom_hit());
        assert_eq!(&replayed.describe(), expected);
    }
}

#[test]
fn exhaustive_estimate_never_costs_more() {
    for problem in sample_problems() {
        let plain = estimate_planner().plan(&problem).expect("estimate plan");
        let exhaustive = estimate_planner()
            .plan_with_flags(&problem, PlannerFlags::ESTIMATE | PlannerFlags::EXHAUSTIVE)
            .expect("exhaustive plan");
        assert!(
            exhaustive.ops().estimate_cost() <= plain.ops().estimate_cost(),
            "{problem}: {} > {}",
            exhaustive.ops().estimate_cost(),
            plain.ops().estimate_cost()
        );
    }
}

#[test]
fn estimate_wisdom_does_not_shortcut_a_patient_search() {
    let problem = Problem::dft_rowmajor(&[8, 6, 12], -1).expect("8x6x12");
    let patient = PlannerFlags::ESTIMATE | PlannerFlags::PATIENT;
    let fresh = estimate_planner()
        .plan_with_flags(&problem, patient)
        .expect("fresh patient plan");

    let mut warm = estimate_planner();
    warm.plan(&problem).expect("estimate plan");
    let after = warm
        .plan_with_flags(&problem, patient)
        .expect("patient plan after estimate");
    assert!(!after.wisdom_hit());
    assert_eq!(after.ops().estimate_cost(), fresh.ops().estimate_cost());
    assert_eq!(after.describe(), fresh.describe());

    // The patient winner in turn answers the plain estimate request.
    let again = warm.plan(&problem).expect("estimate replay");
    assert!(again.wisdom_hit());
    log_pass(
        "estimate_wisdom_does_not_shortcut_a_patient_search",
        &format!("cost={}", fresh.ops().estimate_cost()),
    );
}

#[test]
fn measured_wisdom_answers_estimate_requests() {
    let measure = MeasureConfig::default()
        .with_repeats(1)
        .with_min_sample(Duration::from_micros(1))
        .with_max_iterations(4);
    let mut planner = Planner::new(
        PlannerConfig::default()
            .with_flags(PlannerFlags::MEASURE)
            .with_measure(measure),
    );
    let problem = Problem::dft_1d(64, -1).expect("n=64");
    let measured = planner.plan(&problem).expect("measured plan");
    assert!(!measured.wisdom_hit());

    let estimated = planner
        .plan_with_flags(&problem, PlannerFlags::ESTIMATE)
        .expect("estimate plan");
    assert!(estimated.wisdom_hit());
    assert_eq!(estimated.describe(), measured.describe());
}

#[test]
fn permuted_dimensions_hash_equal() {
    let a = Problem::builder(ProblemKind::Dft)
        .dims(&[IoDim::new(4, 1, 1), IoDim::new(3, 4, 4)])
        .build()
        .expect("a");
    let b = Problem::builder(ProblemKind::Dft)
        .dims(&[IoDim::new(3, 4, 4), IoDim::new(4, 1, 1)])
        .build()
        .expect("b");
    assert_eq!(a, b);
    assert_eq!(a.structural_hash(1), b.structural_hash(1));
    assert_ne!(a.structural_hash(1), a.structural_hash(2));
}

struct ProbePlan {
    n: usize,
    child: Option<Box<dyn Plan>>,
    drops: Arc<Mutex<Vec<usize>>>,
}

impl Drop for ProbePlan {
    fn drop(&mut self) {
        if let Ok(mut drops) = self.drops.lock() {
            drops.push(self.n);
        }
    }
}

impl Plan for ProbePlan {
    fn apply(&self, _io: &mut Buffers<'_>, _at: Offsets) {}

    fn awake(&mut self, wakefulness: Wakefulness) {
        if let Some(child) = self.child.as_mut() {
            child.awake(wakefulness);
        }
    }

    fn print(&self, printer: &mut PlanPrinter) {
        match &self.child {
            Some(child) => printer.node(format_args!("probe-{}", self.n), &[child.as_ref()]),
            None => printer.leaf(format_args!("probe-{}", self.n)),
        }
    }

    fn ops(&self) -> OpCount {
        let own = OpCount::other(self.n as f64);
        self.child.as_ref().map_or(own, |c| own + c.ops())
    }
}

/// Halves the problem until it reaches one point.
struct Probe {
    drops: Arc<Mutex<Vec<usize>>>,
}

impl Solver for Probe {
    fn name(&self) -> &str {
        "probe"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        if problem.kind() == ProblemKind::Dft && problem.rank() <= 1 && problem.vector_rank() == 0 {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        let n = problem.sz().size();
        let child = if n > 1 {
            let sub = Problem::dft_1d(n / 2, -1).map_err(|_| SolveFailure::Unsolvable)?;
            Some(planner.mkplan(&sub)?)
        } else {
            None
        };
        Ok(Box::new(ProbePlan {
            n,
            child,
            drops: Arc::clone(&self.drops),
        }))
    }
}

#[test]
fn plan_tree_drops_each_node_once_parent_first() {
    let drops = Arc::new(Mutex::new(Vec::new()));
    let mut builder = RegistryBuilder::new();
    builder.register(Probe {
        drops: Arc::clone(&drops),
    });
    let mut planner = Planner::with_registry(
        builder.build(),
        PlannerConfig::default().with_flags(PlannerFlags::ESTIMATE),
    );

    let plan = planner.plan(&Problem::dft_1d(8, -1).expect("n=8")).expect("probe plan");
    assert_eq!(plan.describe(), "(probe-8\n  (probe-4\n    (probe-2\n      (probe-1))))");
    assert!(drops.lock().expect("drop log").is_empty());

    plan.destroy();
    assert_eq!(*drops.lock().expect("drop log"), vec![8, 4, 2, 1]);
}

/// Applicable to every 1-d complex problem, never produces a plan.
struct AlwaysFails {
    calls: Arc<AtomicUsize>,
}

impl Solver for AlwaysFails {
    fn name(&self) -> &str {
        "always-fails"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        if problem.kind() == ProblemKind::Dft && problem.rank() == 1 {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, _problem: &Problem, _planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SolveFailure::Unsolvable)
    }
}

#[test]
fn bad_solver_is_not_reinvoked_for_the_same_problem() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut builder = RegistryBuilder::new();
    let failing = builder.register(AlwaysFails {
        calls: Arc::clone(&calls),
    });
    builder.register(DftGeneric);
    let mut planner = Planner::with_registry(
        builder.build(),
        PlannerConfig::default().with_flags(PlannerFlags::ESTIMATE),
    );
    let problem = Problem::dft_1d(8, -1).expect("n=8");
    let hash = problem.structural_hash(1);

    planner.plan(&problem).expect("generic plans n=8");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(planner.wisdom().lookup(&hash, &failing), Verdict::Bad);

    // Drop the winner so the next call has to search again.
    let goods = planner
        .wisdom()
        .iter()
        .filter(|(_, _, e)| e.verdict == Verdict::Good)
        .map(|(h, id, e)| (*h, id.clone(), e.flags))
        .collect::<Vec<_>>();
    for (h, id, flags) in goods {
        planner.wisdom_mut().store(h, id, Verdict::Unknown, flags);
    }

    let plan = planner.plan(&problem).expect("second search");
    assert!(!plan.wisdom_hit());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(planner.stats().bad_skips >= 1);
}

#[test]
fn zero_timelimit_downgrades_the_stored_winner() {
    let config = PlannerConfig::default()
        .with_flags(PlannerFlags::MEASURE)
        .with_timelimit(Duration::ZERO);
    let mut planner = Planner::new(config);
    let problem = Problem::dft_1d(48, -1).expect("n=48");
    let hash = problem.structural_hash(1);

    let plan = planner.plan(&problem).expect("a plan despite the timeout");
    assert!(plan.is_awake());
    let root_entries = planner
        .wisdom()
        .iter()
        .filter(|(h, _, e)| **h == hash && e.verdict == Verdict::Good)
        .map(|(_, _, e)| e.flags)
        .collect::<Vec<_>>();
    assert_eq!(root_entries.len(), 1);
    assert_eq!(root_entries[0].effort(), Effort::Estimate);
}

#[test]
fn ledger_records_the_decisions_as_jsonl() {
    let mut planner = estimate_planner();
    let problem = Problem::dft_1d(30, -1).expect("n=30");
    planner.plan(&problem).expect("first");
    planner.plan(&problem).expect("second");
    let events = planner
        .ledger_jsonl()
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).expect("event json"))
        .collect::<Vec<_>>();
    assert!(events.iter().any(|e| e["event"] == "winner"));
    assert!(events.iter().any(|e| e["event"] == "wisdom_hit"));
    assert_eq!(planner.stats().problems_planned, 2);
}
