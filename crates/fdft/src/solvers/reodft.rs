//! DCT-II/III and DST-II/III: a quadratic direct form, and a reduction to
//! one real DFT of the same size.
//!
//! The reduction reorders a type-II input into halfcomplex order
//! (`x_0, x_2, x_4, ..` forward and the odd samples backward), takes its
//! R2HC transform and rotates each bin `k` by `e^(-iπk/2n)`. Type III runs
//! the same steps in reverse. The DST variants reverse the sequence and
//! flip the sign of every other sample, which turns them into the DCT.

use crate::buffers::{Buffers, Offsets};
use crate::flags::ProblemFlags;
use crate::ops::OpCount;
use crate::plan::{Plan, PlanPrinter, Wakefulness};
use crate::planner::Planner;
use crate::problem::{Alignment, Problem, ProblemKind};
use crate::solver::{Applicability, PlanContext, SolveFailure, Solver, ensure_applicable};
use crate::solvers::generic::GENERIC_CUTOFF;
use crate::solvers::{gather_first_inplace_ok, subproblem, vector_dim};
use crate::tensor::IoDim;
use crate::trig;

/// `(cos, sin)` of `2πm / 4n` for `m in 0..4n`.
fn quarter_table(n: usize) -> Vec<(f64, f64)> {
    (0..4 * n).map(|m| trig::cos_sin_2pi(m, 4 * n)).collect()
}

fn transform(kind: ProblemKind, x: &[f64], table: &[(f64, f64)], out: &mut [f64]) {
    let n = x.len();
    let period = 4 * n;
    let angle = |m: usize| table[m % period];
    for (k, slot) in out.iter_mut().enumerate().take(n) {
        *slot = match kind {
            ProblemKind::Redft10 => {
                2.0 * x
                    .iter()
                    .enumerate()
                    .map(|(j, &xj)| xj * angle((2 * j + 1) * k).0)
                    .sum::<f64>()
            }
            ProblemKind::Redft01 => {
                x[0] + 2.0
                    * x.iter()
                        .enumerate()
                        .skip(1)
                        .map(|(j, &xj)| xj * angle(j * (2 * k + 1)).0)
                        .sum::<f64>()
            }
            ProblemKind::Rodft10 => {
                2.0 * x
                    .iter()
                    .enumerate()
                    .map(|(j, &xj)| xj * angle((2 * j + 1) * (k + 1)).1)
                    .sum::<f64>()
            }
            ProblemKind::Rodft01 => {
                let last = if k % 2 == 0 { x[n - 1] } else { -x[n - 1] };
                last + 2.0
                    * x[..n - 1]
                        .iter()
                        .enumerate()
                        .map(|(j, &xj)| xj * angle((j + 1) * (2 * k + 1)).1)
                        .sum::<f64>()
            }
            _ => 0.0,
        };
    }
}

pub struct ReodftGeneric;

impl Solver for ReodftGeneric {
    fn name(&self) -> &str {
        "reodft-generic"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        if !problem.kind().is_trigonometric()
            || problem.rank() != 1
            || problem.vector_rank() > 1
            || !gather_first_inplace_ok(problem)
        {
            Applicability::No
        } else if problem.sz().dims()[0].n > GENERIC_CUTOFF {
            Applicability::Ugly
        } else {
            Applicability::Good
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let d = problem.sz().dims()[0];
        let v = vector_dim(problem);
        Ok(Box::new(ReodftPlan {
            kind: problem.kind(),
            n: d.n,
            is: d.is,
            os: d.os,
            vl: v.n,
            ivs: v.is,
            ovs: v.os,
            table: None,
        }))
    }
}

struct ReodftPlan {
    kind: ProblemKind,
    n: usize,
    is: usize,
    os: usize,
    vl: usize,
    ivs: usize,
    ovs: usize,
    table: Option<Vec<(f64, f64)>>,
}

impl Plan for ReodftPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        let Some(table) = self.table.as_deref() else {
            return;
        };
        let mut x = vec![0.0; self.n];
        let mut y = vec![0.0; self.n];
        for k in 0..self.vl {
            let ib = at.input + k * self.ivs;
            let ob = at.output + k * self.ovs;
            for (j, slot) in x.iter_mut().enumerate() {
                *slot = io.load(ib + j * self.is);
            }
            transform(self.kind, &x, table, &mut y);
            for (j, &value) in y.iter().enumerate() {
                io.store(ob + j * self.os, value);
            }
        }
    }

    fn awake(&mut self, wakefulness: Wakefulness) {
        match wakefulness {
            Wakefulness::Awake => {
                let n = self.n;
                self.table.get_or_insert_with(|| quarter_table(n));
            }
            Wakefulness::Asleep => self.table = None,
        }
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.leaf(format_args!("reodft-generic {}-{} vl={}", self.kind, self.n, self.vl));
    }

    fn ops(&self) -> OpCount {
        let n = self.n as f64;
        OpCount::new(n * n, n * (n + 1.0), 0.0, 0.0) * self.vl as f64
    }
}

/// `(cos, sin)` of `πi / 2n` for `i in 0..=n/2`.
fn rotation_table(n: usize) -> Vec<(f64, f64)> {
    (0..=n / 2).map(|i| trig::cos_sin_2pi(i, 4 * n)).collect()
}

/// Type-III input folded so that its R2HC transform holds the even and odd
/// outputs as sums and differences.
fn fold_type3(x: &[f64], sine: bool, w: &[(f64, f64)], buf: &mut [f64]) {
    let n = x.len();
    let get = |j: usize| if sine { x[n - 1 - j] } else { x[j] };
    buf[0] = get(0);
    for i in 1..n.div_ceil(2) {
        let (a, b) = (get(i), get(n - i));
        let (wa, wb) = w[i];
        buf[i] = wa * (a - b) + wb * (a + b);
        buf[n - i] = wa * (a + b) - wb * (a - b);
    }
    if n % 2 == 0 {
        let h = n / 2;
        buf[h] = 2.0 * get(h) * w[h].0;
    }
}

fn unfold_type3(hc: &[f64], sine: bool, y: &mut [f64]) {
    let n = hc.len();
    y[0] = hc[0];
    for i in 1..n.div_ceil(2) {
        let (a, b) = (hc[i], hc[n - i]);
        y[2 * i - 1] = if sine { b - a } else { a - b };
        y[2 * i] = a + b;
    }
    if n % 2 == 0 {
        y[n - 1] = if sine { -hc[n / 2] } else { hc[n / 2] };
    }
}

/// Even samples forward, odd samples backward.
fn fold_type2(x: &[f64], sine: bool, buf: &mut [f64]) {
    let n = x.len();
    let odd = |j: usize| if sine { -x[j] } else { x[j] };
    buf[0] = x[0];
    for i in 1..n.div_ceil(2) {
        buf[i] = x[2 * i];
        buf[n - i] = odd(2 * i - 1);
    }
    if n % 2 == 0 {
        buf[n / 2] = odd(n - 1);
    }
}

fn unfold_type2(hc: &[f64], sine: bool, w: &[(f64, f64)], y: &mut [f64]) {
    let n = hc.len();
    let slot = |k: usize| if sine { n - 1 - k } else { k };
    y[slot(0)] = 2.0 * hc[0];
    for i in 1..n.div_ceil(2) {
        let (a, b) = (2.0 * hc[i], 2.0 * hc[n - i]);
        let (wa, wb) = w[i];
        y[slot(i)] = wa * a + wb * b;
        y[slot(n - i)] = wb * a - wa * b;
    }
    if n % 2 == 0 {
        let h = n / 2;
        y[slot(h)] = 2.0 * hc[h] * w[h].0;
    }
}

/// Single transform of size `n >= 2` through a planned R2HC child.
pub struct ReodftR2hc;

impl Solver for ReodftR2hc {
    fn name(&self) -> &str {
        "reodft010e-r2hc"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        if problem.kind().is_trigonometric()
            && problem.rank() == 1
            && problem.vector_rank() == 0
            && problem.sz().dims()[0].n >= 2
        {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let d = problem.sz().dims()[0];
        planner.check_scratch(2 * d.n * size_of::<f64>())?;
        let child = subproblem(
            Problem::builder(ProblemKind::R2hc)
                .dims(&[IoDim::new(d.n, 1, 1)])
                .alignment(Alignment::Unaligned)
                .flags(ProblemFlags::DESTROY_INPUT),
        )?;
        let child = planner.mkplan(&child)?;
        Ok(Box::new(ReodftR2hcPlan {
            kind: problem.kind(),
            n: d.n,
            is: d.is,
            os: d.os,
            child,
            twiddles: None,
        }))
    }
}

struct ReodftR2hcPlan {
    kind: ProblemKind,
    n: usize,
    is: usize,
    os: usize,
    child: Box<dyn Plan>,
    twiddles: Option<Vec<(f64, f64)>>,
}

impl Plan for ReodftR2hcPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        debug_assert!(self.twiddles.is_some(), "reodft plan applied while asleep");
        let Some(w) = self.twiddles.as_deref() else {
            return;
        };
        let n = self.n;
        let x = (0..n)
            .map(|j| io.load(at.input + j * self.is))
            .collect::<Vec<_>>();
        let mut buf = vec![0.0; n];
        let mut hc = vec![0.0; n];
        let mut y = vec![0.0; n];
        let sine = matches!(self.kind, ProblemKind::Rodft10 | ProblemKind::Rodft01);
        if matches!(self.kind, ProblemKind::Redft01 | ProblemKind::Rodft01) {
            fold_type3(&x, sine, w, &mut buf);
            self.child
                .apply(&mut Buffers::out_of_place(&mut buf, &mut hc), Offsets::ZERO);
            unfold_type3(&hc, sine, &mut y);
        } else {
            fold_type2(&x, sine, &mut buf);
            self.child
                .apply(&mut Buffers::out_of_place(&mut buf, &mut hc), Offsets::ZERO);
            unfold_type2(&hc, sine, w, &mut y);
        }
        for (k, &value) in y.iter().enumerate() {
            io.store(at.output + k * self.os, value);
        }
    }

    fn awake(&mut self, wakefulness: Wakefulness) {
        self.child.awake(wakefulness);
        match wakefulness {
            Wakefulness::Awake => {
                let n = self.n;
                self.twiddles.get_or_insert_with(|| rotation_table(n));
            }
            Wakefulness::Asleep => self.twiddles = None,
        }
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.node(
            format_args!("reodft010e-r2hc {}-{}", self.kind, self.n),
            &[self.child.as_ref()],
        );
    }

    fn ops(&self) -> OpCount {
        let n = self.n as f64;
        self.child.ops() + OpCount::new(2.0 * n, 2.0 * n, 0.0, n)
    }
}

#[cfg(test)]
mod tests {
    use super::{ReodftR2hc, ReodftR2hcPlan, quarter_table, transform};
    use crate::buffers::{Buffers, Offsets};
    use crate::config::PlannerConfig;
    use crate::flags::PlannerFlags;
    use crate::plan::{Plan, Wakefulness};
    use crate::planner::Planner;
    use crate::problem::{Problem, ProblemKind};
    use crate::solver::Solver;

    fn run(kind: ProblemKind, x: &[f64]) -> Vec<f64> {
        let mut y = vec![0.0; x.len()];
        transform(kind, x, &quarter_table(x.len()), &mut y);
        y
    }

    #[test]
    fn dct2_of_a_constant_is_an_impulse() {
        let y = run(ProblemKind::Redft10, &[1.0; 6]);
        assert!((y[0] - 12.0).abs() < 1e-12);
        assert!(y[1..].iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn type_three_inverts_type_two_up_to_2n() {
        let x = [0.5, -1.0, 2.25, 3.0, -0.75];
        let scale = 2.0 * x.len() as f64;
        for (forward, backward) in [
            (ProblemKind::Redft10, ProblemKind::Redft01),
            (ProblemKind::Rodft10, ProblemKind::Rodft01),
        ] {
            let back = run(backward, &run(forward, &x));
            for (b, v) in back.iter().zip(&x) {
                assert!((b / scale - v).abs() < 1e-12, "{forward} then {backward}");
            }
        }
    }

    #[test]
    fn single_point_transforms() {
        assert!((run(ProblemKind::Redft10, &[3.0])[0] - 6.0).abs() < 1e-15);
        assert!((run(ProblemKind::Redft01, &[3.0])[0] - 3.0).abs() < 1e-15);
        assert!((run(ProblemKind::Rodft10, &[3.0])[0] - 6.0).abs() < 1e-15);
        assert!((run(ProblemKind::Rodft01, &[3.0])[0] - 3.0).abs() < 1e-15);
    }

    const KINDS: [ProblemKind; 4] = [
        ProblemKind::Redft10,
        ProblemKind::Redft01,
        ProblemKind::Rodft10,
        ProblemKind::Rodft01,
    ];

    #[test]
    fn r2hc_reduction_matches_the_direct_form() {
        let mut planner = Planner::new(PlannerConfig::default().with_flags(PlannerFlags::ESTIMATE));
        for kind in KINDS {
            for n in [2usize, 3, 4, 5, 8, 9, 12, 17, 40] {
                let problem = Problem::r2r_1d(kind, n).expect("problem");
                let mut plan = ReodftR2hc.mkplan(&problem, &mut planner).expect("plan");
                plan.awake(Wakefulness::Awake);
                let mut x = (0..n)
                    .map(|j| ((j as f64 + 0.5) * 0.73).sin() - 0.2 * j as f64 / n as f64)
                    .collect::<Vec<_>>();
                let mut expected = vec![0.0; n];
                transform(kind, &x, &quarter_table(n), &mut expected);
                let mut y = vec![0.0; n];
                plan.apply(&mut Buffers::out_of_place(&mut x, &mut y), Offsets::ZERO);
                for (got, want) in y.iter().zip(&expected) {
                    assert!((got - want).abs() < 1e-11, "{kind}-{n}: {got} vs {want}");
                }
            }
        }
    }

    #[test]
    fn single_points_are_left_to_the_direct_form() {
        let mut planner = Planner::new(PlannerConfig::default().with_flags(PlannerFlags::ESTIMATE));
        let problem = Problem::r2r_1d(ProblemKind::Redft10, 1).expect("problem");
        assert!(ReodftR2hc.mkplan(&problem, &mut planner).is_err());
    }

    #[test]
    fn awake_twice_keeps_the_rotations() {
        let mut planner = Planner::new(PlannerConfig::default().with_flags(PlannerFlags::ESTIMATE));
        let child = planner
            .mkplan(&Problem::r2r_1d(ProblemKind::R2hc, 8).expect("problem"))
            .expect("child");
        let mut plan = ReodftR2hcPlan {
            kind: ProblemKind::Redft10,
            n: 8,
            is: 1,
            os: 1,
            child,
            twiddles: None,
        };
        plan.awake(Wakefulness::Awake);
        let first = plan.twiddles.as_ref().map(Vec::as_ptr);
        assert!(first.is_some());
        plan.awake(Wakefulness::Awake);
        assert_eq!(plan.twiddles.as_ref().map(Vec::as_ptr), first);
        plan.awake(Wakefulness::Asleep);
        assert!(plan.twiddles.is_none());
    }
}
