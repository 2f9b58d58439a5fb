//! Straight-line kernels for small transform sizes.

use crate::buffers::{Buffers, Offsets};
use crate::flags::PlannerFlags;
use crate::kernels::{DirectArgs, DirectKernelDesc, VECTOR_WIDTH};
use crate::ops::OpCount;
use crate::plan::{Plan, PlanPrinter};
use crate::planner::Planner;
use crate::problem::{Alignment, Problem, ProblemKind};
use crate::solver::{Applicability, PlanContext, SolveFailure, Solver, ensure_applicable};
use crate::solvers::{gather_first_inplace_ok, vector_dim};

/// One solver per registered kernel descriptor.
pub struct Direct {
    desc: &'static DirectKernelDesc,
    name: String,
}

impl Direct {
    #[must_use]
    pub fn new(desc: &'static DirectKernelDesc) -> Self {
        let family = if desc.simd { "direct-simd" } else { "direct" };
        Self {
            desc,
            name: format!("{family}/{}", desc.name),
        }
    }
}

impl Solver for Direct {
    fn name(&self) -> &str {
        &self.name
    }

    fn applicable(&self, problem: &Problem, ctx: &PlanContext) -> Applicability {
        let desc = self.desc;
        if problem.kind() != ProblemKind::Dft || problem.rank() != 1 || problem.vector_rank() > 1 {
            return Applicability::No;
        }
        let d = problem.sz().dims()[0];
        let v = vector_dim(problem);
        let fits = d.n == desc.n
            && desc.pinned_is.is_none_or(|s| s == d.is)
            && desc.pinned_os.is_none_or(|s| s == d.os)
            && v.n % desc.vl_multiple == 0
            && gather_first_inplace_ok(problem)
            && (desc.applicable)(problem);
        let simd_ok = !desc.simd
            || (!ctx.flags.contains(PlannerFlags::NO_SIMD)
                && problem.alignment() == Alignment::Aligned);
        if fits && simd_ok {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let d = problem.sz().dims()[0];
        let v = vector_dim(problem);
        Ok(Box::new(DirectPlan {
            desc: self.desc,
            args: DirectArgs {
                is: d.is,
                os: d.os,
                vl: v.n,
                ivs: v.is,
                ovs: v.os,
                sign: problem.sign(),
            },
        }))
    }
}

struct DirectPlan {
    desc: &'static DirectKernelDesc,
    args: DirectArgs,
}

impl Plan for DirectPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        (self.desc.func)(io, at, &self.args);
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.leaf(format_args!("{} vl={}", self.desc.name, self.args.vl));
    }

    fn ops(&self) -> OpCount {
        let calls = if self.desc.simd {
            self.args.vl.div_ceil(VECTOR_WIDTH)
        } else {
            self.args.vl
        };
        self.desc.ops * calls as f64
    }
}
