//! Transforms split into a data-movement pass and an in-place pass.
//!
//! `indirect-before` copies the input into the output layout, then
//! transforms in place on the output. `indirect-after` transforms in place
//! in the input layout, then moves the result to the output layout.

use crate::buffers::{Buffers, Offsets};
use crate::flags::{PlannerFlags, ProblemFlags};
use crate::ops::OpCount;
use crate::plan::{Plan, PlanPrinter, Wakefulness};
use crate::planner::Planner;
use crate::problem::Problem;
use crate::solver::{Applicability, PlanContext, SolveFailure, Solver, ensure_applicable};
use crate::solvers::subproblem;
use crate::tensor::{Tensor, Which};

fn strides_match(problem: &Problem) -> bool {
    problem.sz().inplace_strides() && problem.vecsz().inplace_strides()
}

/// Rank-0 problem moving every element of `problem` from its input
/// position to its output position.
fn movement(problem: &Problem) -> Result<Problem, SolveFailure> {
    subproblem(
        problem
            .derive()
            .tensors(&Tensor::empty(), &problem.sz().append(problem.vecsz())),
    )
}

/// The transform itself, in place with strides taken from one side.
fn in_place_transform(problem: &Problem, which: Which) -> Result<Problem, SolveFailure> {
    subproblem(
        problem
            .derive()
            .tensors(
                &problem.sz().force_inplace(which),
                &problem.vecsz().force_inplace(which),
            )
            .in_place(true),
    )
}

pub struct IndirectBefore;

impl Solver for IndirectBefore {
    fn name(&self) -> &str {
        "indirect-before"
    }

    fn applicable(&self, problem: &Problem, ctx: &PlanContext) -> Applicability {
        if problem.rank() >= 1
            && !problem.is_in_place()
            && !ctx.flags.contains(PlannerFlags::NO_INDIRECT)
        {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let copy = planner.mkplan(&movement(problem)?)?;
        let transform = planner.mkplan(&in_place_transform(problem, Which::Output)?)?;
        Ok(Box::new(IndirectPlan {
            before: true,
            first: copy,
            second: transform,
        }))
    }
}

pub struct IndirectAfter;

impl Solver for IndirectAfter {
    fn name(&self) -> &str {
        "indirect-after"
    }

    fn applicable(&self, problem: &Problem, ctx: &PlanContext) -> Applicability {
        if problem.rank() == 0 || strides_match(problem) {
            return Applicability::No;
        }
        let destroys = !problem.is_in_place()
            && problem.flags().contains(ProblemFlags::DESTROY_INPUT)
            && !ctx.flags.contains(PlannerFlags::NO_INDIRECT);
        if problem.is_in_place() || destroys {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let transform = planner.mkplan(&in_place_transform(problem, Which::Input)?)?;
        let permute = planner.mkplan(&movement(problem)?)?;
        Ok(Box::new(IndirectPlan {
            before: false,
            first: transform,
            second: permute,
        }))
    }
}

struct IndirectPlan {
    before: bool,
    first: Box<dyn Plan>,
    second: Box<dyn Plan>,
}

impl Plan for IndirectPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        if self.before {
            self.first.apply(io, at);
            self.second.apply(&mut io.output_only(), at.on_output());
        } else {
            self.first.apply(&mut io.input_only(), at.on_input());
            self.second.apply(io, at);
        }
    }

    fn awake(&mut self, wakefulness: Wakefulness) {
        self.first.awake(wakefulness);
        self.second.awake(wakefulness);
    }

    fn print(&self, printer: &mut PlanPrinter) {
        let label = if self.before {
            "indirect-before"
        } else {
            "indirect-after"
        };
        printer.node(label, &[self.first.as_ref(), self.second.as_ref()]);
    }

    fn ops(&self) -> OpCount {
        self.first.ops() + self.second.ops()
    }
}

#[cfg(test)]
mod tests {
    use super::{IndirectAfter, IndirectBefore};
    use crate::flags::{PlannerFlags, ProblemFlags};
    use crate::problem::{Problem, ProblemKind};
    use crate::solver::{Applicability, PlanContext, Solver};
    use crate::tensor::IoDim;

    fn ctx(flags: PlannerFlags) -> PlanContext {
        PlanContext { flags, nthreads: 1 }
    }

    #[test]
    fn no_indirect_spares_in_place_after() {
        let strided_in_place = Problem::builder(ProblemKind::Dft)
            .dims(&[IoDim::new(8, 1, 2)])
            .in_place(true)
            .build()
            .expect("problem");
        let destroying = Problem::builder(ProblemKind::Dft)
            .dims(&[IoDim::new(8, 1, 2)])
            .flags(ProblemFlags::DESTROY_INPUT)
            .build()
            .expect("problem");
        let c = ctx(PlannerFlags::NO_INDIRECT);
        assert_eq!(IndirectAfter.applicable(&strided_in_place, &c), Applicability::Good);
        assert_eq!(IndirectAfter.applicable(&destroying, &c), Applicability::No);
        assert_eq!(
            IndirectAfter.applicable(&destroying, &ctx(PlannerFlags::MEASURE)),
            Applicability::Good
        );
        assert_eq!(IndirectBefore.applicable(&destroying, &c), Applicability::No);
    }
}
