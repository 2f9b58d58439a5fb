//! Rank-0 problems: pure data movement over the vector tensor.

use crate::buffers::{Buffers, Offsets};
use crate::ops::OpCount;
use crate::plan::{Plan, PlanPrinter};
use crate::planner::Planner;
use crate::problem::Problem;
use crate::solver::{Applicability, PlanContext, SolveFailure, Solver, ensure_applicable};
use crate::solvers::{for_each_offset, vector_dim};
use crate::tensor::Tensor;

/// Out-of-place strided copy, vector rank <= 1.
pub struct Rank0Copy;

impl Solver for Rank0Copy {
    fn name(&self) -> &str {
        "rank0-copy"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        if problem.rank() == 0 && !problem.is_in_place() && problem.vector_rank() <= 1 {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let v = vector_dim(problem);
        Ok(Box::new(CopyPlan {
            n: v.n,
            is: v.is,
            os: v.os,
            width: problem.element_width(),
        }))
    }
}

struct CopyPlan {
    n: usize,
    is: usize,
    os: usize,
    width: usize,
}

impl Plan for CopyPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        for k in 0..self.n {
            io.copy_element(at.input + k * self.is, at.output + k * self.os, self.width);
        }
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.leaf(format_args!("rank0-copy {}x{}", self.n, self.width));
    }

    fn ops(&self) -> OpCount {
        OpCount::other((self.n * self.width) as f64)
    }
}

/// In-place transpose of a square matrix whose output strides are the
/// input strides swapped.
pub struct Rank0Transpose;

impl Solver for Rank0Transpose {
    fn name(&self) -> &str {
        "rank0-transpose"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        let dims = problem.vecsz().dims();
        let square = match dims {
            [a, b] => a.n == b.n && a.is == b.os && a.os == b.is,
            _ => false,
        };
        if problem.rank() == 0 && problem.is_in_place() && square {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let dims = problem.vecsz().dims();
        Ok(Box::new(TransposePlan {
            n: dims[0].n,
            s0: dims[0].is,
            s1: dims[1].is,
            width: problem.element_width(),
        }))
    }
}

struct TransposePlan {
    n: usize,
    s0: usize,
    s1: usize,
    width: usize,
}

impl Plan for TransposePlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        debug_assert_eq!(at.input, at.output);
        let w = self.width;
        let data = io.output_mut();
        for i in 0..self.n {
            for j in i + 1..self.n {
                let a = at.output + i * self.s0 + j * self.s1;
                let b = at.output + j * self.s0 + i * self.s1;
                for c in 0..w {
                    data.swap(a * w + c, b * w + c);
                }
            }
        }
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.leaf(format_args!("rank0-transpose {}x{}", self.n, self.n));
    }

    fn ops(&self) -> OpCount {
        OpCount::other((self.n * (self.n - 1) * self.width) as f64)
    }
}

/// In-place permutation through a scratch buffer.
pub struct Rank0Permute;

impl Solver for Rank0Permute {
    fn name(&self) -> &str {
        "rank0-permute"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        if problem.rank() == 0
            && problem.is_in_place()
            && problem.vector_rank() >= 1
            && !problem.vecsz().inplace_strides()
        {
            Applicability::Good
        } else {
            Applicability::No
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let width = problem.element_width();
        let points = problem.vecsz().size();
        planner.check_scratch(points * width * size_of::<f64>())?;
        Ok(Box::new(PermutePlan {
            vecsz: problem.vecsz().clone(),
            width,
        }))
    }
}

struct PermutePlan {
    vecsz: Tensor,
    width: usize,
}

impl Plan for PermutePlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        let w = self.width;
        let mut scratch = Vec::with_capacity(self.vecsz.size() * w);
        let mut element = [0.0; 2];
        for_each_offset(&self.vecsz, |i, _| {
            io.gather(at.input + i, w, &mut element);
            scratch.extend_from_slice(&element[..w]);
        });
        let mut chunks = scratch.chunks_exact(w);
        for_each_offset(&self.vecsz, |_, o| {
            if let Some(value) = chunks.next() {
                io.scatter(at.output + o, w, value);
            }
        });
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.leaf(format_args!("rank0-permute {}", self.vecsz.size()));
    }

    fn ops(&self) -> OpCount {
        OpCount::other((2 * self.vecsz.size() * self.width) as f64)
    }
}

#[cfg(test)]
mod tests {
    use crate::buffers::{Buffers, Offsets};
    use crate::config::PlannerConfig;
    use crate::flags::PlannerFlags;
    use crate::planner::Planner;
    use crate::problem::{Problem, ProblemKind};
    use crate::solver::Solver;
    use crate::tensor::IoDim;

    use super::{Rank0Permute, Rank0Transpose};

    fn planner() -> Planner {
        Planner::new(PlannerConfig::default().with_flags(PlannerFlags::ESTIMATE))
    }

    #[test]
    fn square_transpose_in_place() {
        let problem = Problem::builder(ProblemKind::Dft)
            .vector_dims(&[IoDim::new(3, 3, 1), IoDim::new(3, 1, 3)])
            .in_place(true)
            .build()
            .expect("problem");
        let mut planner = planner();
        let plan = Rank0Transpose
            .mkplan(&problem, &mut planner)
            .expect("transpose applies");
        let mut data = (0..18).map(f64::from).collect::<Vec<_>>();
        plan.apply(&mut Buffers::in_place(&mut data), Offsets::ZERO);
        // element (i, j) moved to (j, i)
        assert_eq!(&data[2..4], &[6.0, 7.0]);
        assert_eq!(&data[6..8], &[2.0, 3.0]);
        assert_eq!(&data[8..10], &[8.0, 9.0]);
    }

    #[test]
    fn permute_moves_real_elements() {
        let problem = Problem::builder(ProblemKind::R2hc)
            .vector_dims(&[IoDim::new(2, 3, 1), IoDim::new(3, 1, 2)])
            .in_place(true)
            .build()
            .expect("problem");
        let mut planner = planner();
        let plan = Rank0Permute
            .mkplan(&problem, &mut planner)
            .expect("permute applies");
        let mut data = vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0];
        plan.apply(&mut Buffers::in_place(&mut data), Offsets::ZERO);
        assert_eq!(data, vec![0.0, 10.0, 1.0, 11.0, 2.0, 12.0]);
    }
}
