//! In-place rank-1 transforms through a contiguous scratch buffer.

use crate::buffers::{Buffers, Offsets};
use crate::flags::PlannerFlags;
use crate::ops::OpCount;
use crate::plan::{Plan, PlanPrinter, Wakefulness};
use crate::planner::Planner;
use crate::problem::Problem;
use crate::solver::{Applicability, PlanContext, SolveFailure, Solver, ensure_applicable};
use crate::solvers::{subproblem, vector_dim};
use crate::tensor::IoDim;

pub struct Buffered;

impl Solver for Buffered {
    fn name(&self) -> &str {
        "buffered"
    }

    fn applicable(&self, problem: &Problem, ctx: &PlanContext) -> Applicability {
        if problem.rank() == 1
            && problem.vector_rank() <= 1
            && problem.is_in_place()
            && !ctx.flags.contains(PlannerFlags::NO_BUFFERING)
        {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let d = problem.sz().dims()[0];
        let v = vector_dim(problem);
        let width = problem.element_width();
        let elements = d.n * v.n;
        planner.check_scratch(elements * width * size_of::<f64>())?;
        let child = subproblem(
            problem
                .derive()
                .dims(&[IoDim::new(d.n, d.is, 1)])
                .vector_dims(&[IoDim::new(v.n, v.is, d.n)])
                .in_place(false),
        )?;
        let child = planner.mkplan(&child)?;
        Ok(Box::new(BufferedPlan {
            n: d.n,
            os: d.os,
            vl: v.n,
            ovs: v.os,
            width,
            child,
        }))
    }
}

struct BufferedPlan {
    n: usize,
    os: usize,
    vl: usize,
    ovs: usize,
    width: usize,
    child: Box<dyn Plan>,
}

impl Plan for BufferedPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        let w = self.width;
        let mut scratch = vec![0.0; self.n * self.vl * w];
        self.child
            .apply(&mut io.redirect_output(&mut scratch), Offsets::new(at.input, 0));
        let output = io.output_mut();
        for k in 0..self.vl {
            for j in 0..self.n {
                let src = (k * self.n + j) * w;
                let dst = (at.output + j * self.os + k * self.ovs) * w;
                output[dst..dst + w].copy_from_slice(&scratch[src..src + w]);
            }
        }
    }

    fn awake(&mut self, wakefulness: Wakefulness) {
        self.child.awake(wakefulness);
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.node(format_args!("buffered {}x{}", self.n, self.vl), &[self.child.as_ref()]);
    }

    fn ops(&self) -> OpCount {
        self.child.ops() + OpCount::other((self.n * self.vl * self.width) as f64)
    }
}
