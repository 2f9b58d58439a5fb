//! Problems with nothing to do: rank 0 in place with in-place strides.

use crate::buffers::{Buffers, Offsets};
use crate::ops::OpCount;
use crate::plan::{Plan, PlanPrinter};
use crate::planner::Planner;
use crate::problem::Problem;
use crate::solver::{Applicability, PlanContext, SolveFailure, Solver, ensure_applicable};

pub struct Nop;

impl Solver for Nop {
    fn name(&self) -> &str {
        "nop"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        if problem.rank() == 0 && problem.is_in_place() && problem.vecsz().inplace_strides() {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        Ok(Box::new(NopPlan))
    }
}

struct NopPlan;

impl Plan for NopPlan {
    fn apply(&self, _io: &mut Buffers<'_>, _at: Offsets) {}

    fn print(&self, printer: &mut PlanPrinter) {
        printer.leaf("nop");
    }

    fn ops(&self) -> OpCount {
        OpCount::ZERO
    }
}
