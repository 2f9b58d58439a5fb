//! Real-input and real-output transforms in halfcomplex layout.
//!
//! A halfcomplex array of length `n` stores `r_0, r_1, ..., r_{n/2}`
//! followed by the imaginary parts in reverse, `i_k` at index `n - k`.
//! `R2hc` is the forward real DFT; `Hc2r` is its unnormalized inverse.

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

/// Real DFT of `x` in halfcomplex order, against a sign -1 roots table.
fn r2hc_naive(x: &[f64], roots: &[f64], out: &mut [f64]) {
    let n = x.len();
    for k in 0..=n / 2 {
        let (mut re, mut im) = (0.0, 0.0);
        for (j, &xj) in x.iter().enumerate() {
            let p = (j * k) % n;
            re += xj * roots[2 * p];
            im += xj * roots[2 * p + 1];
        }
        out[k] = re;
        if k > 0 && k < n - k {
            out[n - k] = im;
        }
    }
}

/// Inverse of [`r2hc_naive`] without the `1 / n` factor.
fn hc2r_naive(hc: &[f64], roots: &[f64], out: &mut [f64]) {
    let n = hc.len();
    for (j, slot) in out.iter_mut().enumerate().take(n) {
        let mut acc = hc[0];
        for k in 1..n.div_ceil(2) {
            let p = (j * k) % n;
            // roots hold (cos, -sin)
            acc += 2.0 * (hc[k] * roots[2 * p] + hc[n - k] * roots[2 * p + 1]);
        }
        if n % 2 == 0 {
            let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
            acc += sign * hc[n / 2];
        }
        *slot = acc;
    }
}

fn rdft_shape(problem: &Problem) -> bool {
    problem.kind().is_halfcomplex() && problem.rank() == 1
}

pub struct RdftGeneric;

impl Solver for RdftGeneric {
    fn name(&self) -> &str {
        "rdft-generic"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        if !rdft_shape(problem) || problem.vector_rank() > 1 || !gather_first_inplace_ok(problem) {
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
        Ok(Box::new(RdftGenericPlan {
            kind: problem.kind(),
            n: d.n,
            is: d.is,
            os: d.os,
            vl: v.n,
            ivs: v.is,
            ovs: v.os,
            roots: None,
        }))
    }
}

struct RdftGenericPlan {
    kind: ProblemKind,
    n: usize,
    is: usize,
    os: usize,
    vl: usize,
    ivs: usize,
    ovs: usize,
    roots: Option<Vec<f64>>,
}

impl Plan for RdftGenericPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        debug_assert!(self.roots.is_some(), "rdft-generic applied while asleep");
        let Some(roots) = self.roots.as_deref() else {
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
            if self.kind == ProblemKind::R2hc {
                r2hc_naive(&x, roots, &mut y);
            } else {
                hc2r_naive(&x, roots, &mut y);
            }
            for (j, &value) in y.iter().enumerate() {
                io.store(ob + j * self.os, value);
            }
        }
    }

    fn awake(&mut self, wakefulness: Wakefulness) {
        match wakefulness {
            Wakefulness::Awake => {
                let n = self.n;
                self.roots.get_or_insert_with(|| trig::roots_table(n, -1));
            }
            Wakefulness::Asleep => self.roots = None,
        }
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.leaf(format_args!("rdft-generic {}-{} vl={}", self.kind, self.n, self.vl));
    }

    fn ops(&self) -> OpCount {
        let n = self.n as f64;
        OpCount::new(n * n, n * n, 0.0, 0.0) * self.vl as f64
    }
}

/// Real transforms through a complex DFT child of the same size.
pub struct RdftDft;

impl Solver for RdftDft {
    fn name(&self) -> &str {
        "rdft-dft"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        if rdft_shape(problem) && problem.vector_rank() == 0 && problem.sz().dims()[0].n >= 2 {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let d = problem.sz().dims()[0];
        planner.check_scratch(2 * 2 * d.n * size_of::<f64>())?;
        let sign = if problem.kind() == ProblemKind::R2hc { -1 } else { 1 };
        let child = subproblem(
            Problem::builder(ProblemKind::Dft)
                .dims(&[IoDim::new(d.n, 1, 1)])
                .sign(sign)
                .alignment(Alignment::Unaligned)
                .flags(ProblemFlags::DESTROY_INPUT),
        )?;
        let child = planner.mkplan(&child)?;
        Ok(Box::new(RdftDftPlan {
            kind: problem.kind(),
            n: d.n,
            is: d.is,
            os: d.os,
            child,
        }))
    }
}

struct RdftDftPlan {
    kind: ProblemKind,
    n: usize,
    is: usize,
    os: usize,
    child: Box<dyn Plan>,
}

impl Plan for RdftDftPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        let n = self.n;
        let mut z = vec![0.0; 2 * n];
        let mut spectrum = vec![0.0; 2 * n];
        if self.kind == ProblemKind::R2hc {
            for j in 0..n {
                z[2 * j] = io.load(at.input + j * self.is);
            }
            self.child
                .apply(&mut Buffers::out_of_place(&mut z, &mut spectrum), Offsets::ZERO);
            for k in 0..=n / 2 {
                io.store(at.output + k * self.os, spectrum[2 * k]);
                if k > 0 && k < n - k {
                    io.store(at.output + (n - k) * self.os, spectrum[2 * k + 1]);
                }
            }
        } else {
            let hc = (0..n)
                .map(|j| io.load(at.input + j * self.is))
                .collect::<Vec<_>>();
            z[0] = hc[0];
            for k in 1..n.div_ceil(2) {
                let (re, im) = (hc[k], hc[n - k]);
                z[2 * k] = re;
                z[2 * k + 1] = im;
                z[2 * (n - k)] = re;
                z[2 * (n - k) + 1] = -im;
            }
            if n % 2 == 0 {
                z[n] = hc[n / 2];
            }
            self.child
                .apply(&mut Buffers::out_of_place(&mut z, &mut spectrum), Offsets::ZERO);
            for j in 0..n {
                io.store(at.output + j * self.os, spectrum[2 * j]);
            }
        }
    }

    fn awake(&mut self, wakefulness: Wakefulness) {
        self.child.awake(wakefulness);
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.node(format_args!("rdft-dft {}-{}", self.kind, self.n), &[self.child.as_ref()]);
    }

    fn ops(&self) -> OpCount {
        self.child.ops() + OpCount::other(4.0 * self.n as f64)
    }
}
