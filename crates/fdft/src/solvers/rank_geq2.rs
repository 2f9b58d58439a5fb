//! Split a multi-dimensional transform into two lower-rank passes.
//!
//! With `sz = sz1 ++ sz2`, the first child transforms along `sz2` for every
//! index of `sz1` (input to output); the second transforms along `sz1` in
//! place on the output.

use crate::buffers::{Buffers, Offsets};
use crate::flags::PlannerFlags;
use crate::ops::OpCount;
use crate::plan::{Plan, PlanPrinter, Wakefulness};
use crate::planner::Planner;
use crate::problem::Problem;
use crate::solver::{Applicability, PlanContext, SolveFailure, Solver, ensure_applicable};
use crate::solvers::subproblem;
use crate::tensor::Which;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAt {
    /// After the first dimension.
    First,
    /// Before the last dimension.
    Last,
}

pub struct RankGeq2 {
    split: SplitAt,
}

impl RankGeq2 {
    #[must_use]
    pub const fn new(split: SplitAt) -> Self {
        Self { split }
    }

    fn split_point(&self, problem: &Problem, ctx: &PlanContext) -> Option<usize> {
        let rank = problem.rank();
        if rank < 2 {
            return None;
        }
        match self.split {
            SplitAt::First => Some(1),
            SplitAt::Last if rank == 2 => None,
            SplitAt::Last if ctx.flags.contains(PlannerFlags::NO_RANK_SPLITS) => None,
            SplitAt::Last => Some(rank - 1),
        }
    }
}

impl Solver for RankGeq2 {
    fn name(&self) -> &str {
        "rank-geq2"
    }

    fn applicable(&self, problem: &Problem, ctx: &PlanContext) -> Applicability {
        if self.split_point(problem, ctx).is_none() {
            return Applicability::No;
        }
        if problem.is_in_place()
            && !(problem.sz().inplace_strides() && problem.vecsz().inplace_strides())
        {
            return Applicability::No;
        }
        if problem.vector_rank() > 0 && problem.vecsz().min_stride() > problem.sz().max_index() {
            Applicability::Ugly
        } else {
            Applicability::Good
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let at = self
            .split_point(problem, &planner.context())
            .ok_or(SolveFailure::NotApplicable)?;
        let (sz1, sz2) = problem.sz().split(at);

        let first = subproblem(
            problem
                .derive()
                .tensors(&sz2, &problem.vecsz().append(&sz1)),
        )?;
        let second = subproblem(
            problem
                .derive()
                .tensors(
                    &sz1.force_inplace(Which::Output),
                    &problem.vecsz().append(&sz2).force_inplace(Which::Output),
                )
                .in_place(true),
        )?;
        let first = planner.mkplan(&first)?;
        let second = planner.mkplan(&second)?;
        Ok(Box::new(RankSplitPlan {
            split: at,
            first,
            second,
        }))
    }
}

struct RankSplitPlan {
    split: usize,
    first: Box<dyn Plan>,
    second: Box<dyn Plan>,
}

impl Plan for RankSplitPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        self.first.apply(io, at);
        self.second.apply(&mut io.output_only(), at.on_output());
    }

    fn awake(&mut self, wakefulness: Wakefulness) {
        self.first.awake(wakefulness);
        self.second.awake(wakefulness);
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.node(
            format_args!("rank-geq2 split={}", self.split),
            &[self.first.as_ref(), self.second.as_ref()],
        );
    }

    fn ops(&self) -> OpCount {
        self.first.ops() + self.second.ops()
    }
}

#[cfg(test)]
mod tests {
    use super::{RankGeq2, SplitAt};
    use crate::flags::PlannerFlags;
    use crate::problem::Problem;
    use crate::solver::{Applicability, PlanContext, Solver};

    #[test]
    fn last_split_needs_rank_three_and_no_restriction() {
        let rank2 = Problem::dft_rowmajor(&[4, 6], -1).expect("problem");
        let rank3 = Problem::dft_rowmajor(&[4, 6, 2], -1).expect("problem");
        let free = PlanContext {
            flags: PlannerFlags::MEASURE,
            nthreads: 1,
        };
        let restricted = PlanContext {
            flags: PlannerFlags::NO_RANK_SPLITS,
            nthreads: 1,
        };
        let last = RankGeq2::new(SplitAt::Last);
        let first = RankGeq2::new(SplitAt::First);
        assert_eq!(last.applicable(&rank2, &free), Applicability::No);
        assert_eq!(last.applicable(&rank3, &free), Applicability::Good);
        assert_eq!(last.applicable(&rank3, &restricted), Applicability::No);
        assert_eq!(first.applicable(&rank2, &restricted), Applicability::Good);
    }
}
