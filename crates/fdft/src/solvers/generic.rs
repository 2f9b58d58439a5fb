//! Quadratic-time DFT for any size. Cheap to plan, ugly beyond 32 points.

use crate::buffers::{Buffers, Offsets};
use crate::kernels::scalar::{Complex, dft_with_roots};
use crate::ops::OpCount;
use crate::plan::{Plan, PlanPrinter, Wakefulness};
use crate::planner::Planner;
use crate::problem::{Problem, ProblemKind};
use crate::solver::{Applicability, PlanContext, SolveFailure, Solver, ensure_applicable};
use crate::solvers::{gather_first_inplace_ok, vector_dim};
use crate::trig;

pub(crate) const GENERIC_CUTOFF: usize = 32;

pub struct DftGeneric;

impl Solver for DftGeneric {
    fn name(&self) -> &str {
        "dft-generic"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        if problem.kind() != ProblemKind::Dft
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
        Ok(Box::new(GenericPlan {
            n: d.n,
            is: d.is,
            os: d.os,
            vl: v.n,
            ivs: v.is,
            ovs: v.os,
            sign: problem.sign(),
            roots: None,
        }))
    }
}

struct GenericPlan {
    n: usize,
    is: usize,
    os: usize,
    vl: usize,
    ivs: usize,
    ovs: usize,
    sign: i32,
    roots: Option<Vec<f64>>,
}

impl Plan for GenericPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        debug_assert!(self.roots.is_some(), "dft-generic applied while asleep");
        let Some(roots) = self.roots.as_deref() else {
            return;
        };
        let mut x: Vec<Complex> = Vec::with_capacity(self.n);
        let mut y = vec![(0.0, 0.0); self.n];
        for k in 0..self.vl {
            let ib = at.input + k * self.ivs;
            let ob = at.output + k * self.ovs;
            x.clear();
            x.extend((0..self.n).map(|j| io.load_c(ib + j * self.is)));
            dft_with_roots(&x, roots, &mut y);
            for (m, &value) in y.iter().enumerate() {
                io.store_c(ob + m * self.os, value);
            }
        }
    }

    fn awake(&mut self, wakefulness: Wakefulness) {
        match wakefulness {
            Wakefulness::Awake => {
                let (n, sign) = (self.n, self.sign);
                self.roots.get_or_insert_with(|| trig::roots_table(n, sign));
            }
            Wakefulness::Asleep => self.roots = None,
        }
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.leaf(format_args!("dft-generic-{} vl={}", self.n, self.vl));
    }

    fn ops(&self) -> OpCount {
        let n = self.n as f64;
        let per = OpCount::new(4.0 * n * (n - 1.0), 4.0 * n * (n - 1.0), 0.0, 0.0);
        per * self.vl as f64
    }
}
