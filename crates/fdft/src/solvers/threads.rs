//! Vector loop split across a rayon pool.
//!
//! Applies when the outermost vector dimension partitions both arrays into
//! disjoint blocks, one child transform per block, so each worker gets
//! exclusive slices of its own.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::buffers::{Buffers, Offsets};
use crate::ops::OpCount;
use crate::plan::{Plan, PlanPrinter, Wakefulness};
use crate::planner::Planner;
use crate::problem::Problem;
use crate::solver::{Applicability, PlanContext, SolveFailure, Solver, ensure_applicable};
use crate::solvers::subproblem;

/// Charged per worker for dispatching onto the pool.
const DISPATCH_OVERHEAD: f64 = 64.0;

pub struct ThreadsVrankGeq1;

impl ThreadsVrankGeq1 {
    fn child_problem(problem: &Problem) -> Result<Problem, SolveFailure> {
        subproblem(
            problem
                .derive()
                .tensors(problem.sz(), &problem.vecsz().copy_except(0)),
        )
    }
}

impl Solver for ThreadsVrankGeq1 {
    fn name(&self) -> &str {
        "threads-vrank-geq1"
    }

    fn applicable(&self, problem: &Problem, ctx: &PlanContext) -> Applicability {
        if ctx.nthreads <= 1 || problem.rank() == 0 {
            return Applicability::No;
        }
        let Some(d) = problem.vecsz().dim(0).copied() else {
            return Applicability::No;
        };
        if d.n < 2 || (problem.is_in_place() && d.is != d.os) {
            return Applicability::No;
        }
        let Ok(child) = Self::child_problem(problem) else {
            return Applicability::No;
        };
        if child.input_extent() <= d.is && child.output_extent() <= d.os {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let nthreads = planner.context().nthreads;
        let d = problem.vecsz().dims()[0];
        let child = Self::child_problem(problem)?;
        let child = planner.mkplan_with_threads(&child, 1)?;
        Ok(Box::new(ThreadedLoopPlan {
            n: d.n,
            is: d.is,
            os: d.os,
            width: problem.element_width(),
            nthreads,
            child,
            pool: None,
        }))
    }
}

struct ThreadedLoopPlan {
    n: usize,
    is: usize,
    os: usize,
    width: usize,
    nthreads: usize,
    child: Box<dyn Plan>,
    pool: Option<ThreadPool>,
}

impl ThreadedLoopPlan {
    fn apply_serial(&self, io: &mut Buffers<'_>, at: Offsets) {
        for k in 0..self.n {
            self.child.apply(io, at.advance(k * self.is, k * self.os));
        }
    }
}

impl Plan for ThreadedLoopPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        let misplaced = io.is_in_place() && at.input != at.output;
        let Some(pool) = self.pool.as_ref().filter(|_| !misplaced) else {
            self.apply_serial(io, at);
            return;
        };
        let w = self.width;
        let child = self.child.as_ref();
        match io.split_mut() {
            (input, Some(output)) => {
                let input = &mut input[at.input * w..];
                let output = &mut output[at.output * w..];
                pool.install(|| {
                    input
                        .par_chunks_mut(self.is * w)
                        .zip(output.par_chunks_mut(self.os * w))
                        .take(self.n)
                        .for_each(|(block_in, block_out)| {
                            child.apply(&mut Buffers::out_of_place(block_in, block_out), Offsets::ZERO);
                        });
                });
            }
            (data, None) => {
                let data = &mut data[at.input * w..];
                pool.install(|| {
                    data.par_chunks_mut(self.is * w)
                        .take(self.n)
                        .for_each(|block| {
                            child.apply(&mut Buffers::in_place(block), Offsets::ZERO);
                        });
                });
            }
        }
    }

    fn awake(&mut self, wakefulness: Wakefulness) {
        self.child.awake(wakefulness);
        match wakefulness {
            Wakefulness::Awake => {
                if self.pool.is_none() {
                    self.pool = ThreadPoolBuilder::new().num_threads(self.nthreads).build().ok();
                }
            }
            Wakefulness::Asleep => self.pool = None,
        }
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.node(
            format_args!("threads-vrank-geq1 x{} threads={}", self.n, self.nthreads),
            &[self.child.as_ref()],
        );
    }

    fn ops(&self) -> OpCount {
        let rounds = self.n.div_ceil(self.nthreads) as f64;
        self.child
            .ops()
            .madd(rounds, OpCount::other(DISPATCH_OVERHEAD * self.nthreads as f64))
    }
}

#[cfg(test)]
mod tests {
    use rayon::ThreadPool;

    use super::{ThreadedLoopPlan, ThreadsVrankGeq1};
    use crate::config::PlannerConfig;
    use crate::flags::PlannerFlags;
    use crate::plan::{Plan, Wakefulness};
    use crate::planner::Planner;
    use crate::problem::{Problem, ProblemKind};
    use crate::solver::{Applicability, PlanContext, Solver};
    use crate::tensor::IoDim;

    #[test]
    fn needs_threads_and_disjoint_blocks() {
        let batched = Problem::builder(ProblemKind::Dft)
            .dims(&[IoDim::new(16, 1, 1)])
            .vector_dims(&[IoDim::new(8, 16, 16)])
            .build()
            .expect("problem");
        let interleaved = Problem::builder(ProblemKind::Dft)
            .dims(&[IoDim::new(16, 8, 8)])
            .vector_dims(&[IoDim::new(8, 1, 1)])
            .build()
            .expect("problem");
        let one = PlanContext {
            flags: PlannerFlags::MEASURE,
            nthreads: 1,
        };
        let four = PlanContext {
            flags: PlannerFlags::MEASURE,
            nthreads: 4,
        };
        assert_eq!(ThreadsVrankGeq1.applicable(&batched, &one), Applicability::No);
        assert_eq!(ThreadsVrankGeq1.applicable(&batched, &four), Applicability::Good);
        assert_eq!(ThreadsVrankGeq1.applicable(&interleaved, &four), Applicability::No);
    }

    #[test]
    fn awake_twice_keeps_the_pool() {
        let mut planner = Planner::new(PlannerConfig::default().with_flags(PlannerFlags::ESTIMATE));
        let child = planner
            .mkplan(&Problem::dft_1d(4, -1).expect("p"))
            .expect("child");
        let mut plan = ThreadedLoopPlan {
            n: 2,
            is: 4,
            os: 4,
            width: 2,
            nthreads: 2,
            child,
            pool: None,
        };
        let pool_ptr = |plan: &ThreadedLoopPlan| plan.pool.as_ref().map(|p| p as *const ThreadPool);
        plan.awake(Wakefulness::Awake);
        let first = pool_ptr(&plan);
        assert!(first.is_some());
        plan.awake(Wakefulness::Awake);
        assert_eq!(pool_ptr(&plan), first);
        plan.awake(Wakefulness::Asleep);
        assert!(pool_ptr(&plan).is_none());
    }
}
