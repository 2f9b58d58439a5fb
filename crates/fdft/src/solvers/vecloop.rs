//! Loop over one vector dimension, solving the rest as a child problem.

use crate::buffers::{Buffers, Offsets};
use crate::flags::PlannerFlags;
use crate::ops::OpCount;
use crate::plan::{Plan, PlanPrinter, Wakefulness};
use crate::planner::Planner;
use crate::problem::Problem;
use crate::solver::{Applicability, PlanContext, SolveFailure, Solver, ensure_applicable};
use crate::solvers::subproblem;

/// Per-iteration bookkeeping charged on top of the child.
const LOOP_OVERHEAD: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDim {
    First,
    Last,
}

pub struct VrankGeq1 {
    dim: LoopDim,
}

impl VrankGeq1 {
    #[must_use]
    pub const fn new(dim: LoopDim) -> Self {
        Self { dim }
    }

    /// Index of the vector dimension this solver loops over. `Last`
    /// declines when it would pick the same dimension as `First`.
    fn pick(&self, problem: &Problem, ctx: &PlanContext) -> Option<usize> {
        let vrank = problem.vector_rank();
        if vrank == 0 {
            return None;
        }
        let index = match self.dim {
            LoopDim::First => 0,
            LoopDim::Last if vrank == 1 => return None,
            LoopDim::Last if ctx.flags.contains(PlannerFlags::NO_VRANK_SPLITS) => return None,
            LoopDim::Last => vrank - 1,
        };
        let d = problem.vecsz().dims()[index];
        if problem.is_in_place() && d.is != d.os {
            return None;
        }
        Some(index)
    }
}

impl Solver for VrankGeq1 {
    fn name(&self) -> &str {
        "vrank-geq1"
    }

    fn applicable(&self, problem: &Problem, ctx: &PlanContext) -> Applicability {
        // Rank-0 vector rank 1 is a copy; in-place rank 0 is a permutation.
        if problem.rank() == 0 && (problem.is_in_place() || problem.vector_rank() < 2) {
            return Applicability::No;
        }
        let Some(index) = self.pick(problem, ctx) else {
            return Applicability::No;
        };
        let d = problem.vecsz().dims()[index];
        if problem.rank() > 1 && d.is.min(d.os) < problem.sz().max_index() {
            Applicability::Ugly
        } else {
            Applicability::Good
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let index = self
            .pick(problem, &planner.context())
            .ok_or(SolveFailure::NotApplicable)?;
        let d = problem.vecsz().dims()[index];
        let child = subproblem(
            problem
                .derive()
                .tensors(problem.sz(), &problem.vecsz().copy_except(index)),
        )?;
        let child = planner.mkplan(&child)?;
        Ok(Box::new(VecLoopPlan {
            n: d.n,
            is: d.is,
            os: d.os,
            child,
        }))
    }
}

struct VecLoopPlan {
    n: usize,
    is: usize,
    os: usize,
    child: Box<dyn Plan>,
}

impl Plan for VecLoopPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        for k in 0..self.n {
            self.child
                .apply(io, at.advance(k * self.is, k * self.os));
        }
    }

    fn awake(&mut self, wakefulness: Wakefulness) {
        self.child.awake(wakefulness);
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.node(format_args!("vrank-geq1 x{}", self.n), &[self.child.as_ref()]);
    }

    fn ops(&self) -> OpCount {
        self.child
            .ops()
            .madd(self.n as f64, OpCount::other(LOOP_OVERHEAD))
    }
}

#[cfg(test)]
mod tests {
    use super::{LoopDim, VrankGeq1};
    use crate::flags::PlannerFlags;
    use crate::problem::{Problem, ProblemKind};
    use crate::solver::{Applicability, PlanContext, Solver};
    use crate::tensor::IoDim;

    fn ctx(flags: PlannerFlags) -> PlanContext {
        PlanContext { flags, nthreads: 1 }
    }

    fn two_vector_dims() -> Problem {
        Problem::builder(ProblemKind::Dft)
            .dims(&[IoDim::new(8, 1, 1)])
            .vector_dims(&[IoDim::new(3, 100, 100), IoDim::new(4, 8, 8)])
            .build()
            .expect("problem")
    }

    #[test]
    fn last_declines_when_it_duplicates_first() {
        let p = Problem::builder(ProblemKind::Dft)
            .dims(&[IoDim::new(8, 1, 1)])
            .vector_dims(&[IoDim::new(3, 8, 8)])
            .build()
            .expect("problem");
        let c = ctx(PlannerFlags::MEASURE);
        assert_eq!(VrankGeq1::new(LoopDim::First).applicable(&p, &c), Applicability::Good);
        assert_eq!(VrankGeq1::new(LoopDim::Last).applicable(&p, &c), Applicability::No);
    }

    #[test]
    fn no_vrank_splits_keeps_only_first() {
        let p = two_vector_dims();
        assert_eq!(p.vector_rank(), 2);
        let c = ctx(PlannerFlags::NO_VRANK_SPLITS);
        assert!(VrankGeq1::new(LoopDim::First).applicable(&p, &c).is_applicable());
        assert_eq!(VrankGeq1::new(LoopDim::Last).applicable(&p, &c), Applicability::No);
        let c = ctx(PlannerFlags::MEASURE);
        assert!(VrankGeq1::new(LoopDim::Last).applicable(&p, &c).is_applicable());
    }

    #[test]
    fn rank_zero_copies_are_left_to_rank0() {
        let p = Problem::builder(ProblemKind::Dft)
            .vector_dims(&[IoDim::new(3, 2, 1)])
            .build()
            .expect("problem");
        let c = ctx(PlannerFlags::MEASURE);
        assert_eq!(VrankGeq1::new(LoopDim::First).applicable(&p, &c), Applicability::No);
    }
}
