//! The standard solver library.
//!
//! | Module       | Solvers                                                  |
//! |--------------|----------------------------------------------------------|
//! | `nop`        | `nop`                                                    |
//! | `rank0`      | `rank0-copy`, `rank0-transpose`, `rank0-permute`         |
//! | `direct`     | `direct/<kernel>`, `direct-simd/<kernel>`                |
//! | `ct`         | `ct-dit/<kernel>`, `generic-dit`                         |
//! | `generic`    | `dft-generic`                                            |
//! | `rader`      | `rader`                                                  |
//! | `rdft`       | `rdft-generic`, `rdft-dft`                               |
//! | `reodft`     | `reodft-generic`, `reodft010e-r2hc`                      |
//! | `vecloop`    | `vrank-geq1` (first and last dimension)                  |
//! | `threads`    | `threads-vrank-geq1`                                     |
//! | `rank_geq2`  | `rank-geq2` (first and last split)                       |
//! | `buffered`   | `buffered`                                               |
//! | `indirect`   | `indirect-before`, `indirect-after`                      |

pub mod buffered;
pub mod ct;
pub mod direct;
pub mod generic;
pub mod indirect;
pub mod nop;
pub mod rader;
pub mod rank0;
pub mod rank_geq2;
pub mod rdft;
pub mod reodft;
pub mod threads;
pub mod vecloop;

use crate::kernels::{GENERIC_DIRECT, SIMD_DIRECT, TWIDDLE};
use crate::problem::{Problem, ProblemBuilder};
use crate::solver::{Backends, RegistryBuilder, SolveFailure};
use crate::tensor::{IoDim, Tensor};

/// Register the standard library. The order here is the planner's
/// tie-break order.
pub(crate) fn register_standard(builder: &mut RegistryBuilder, backends: &Backends) {
    builder.register(nop::Nop);
    builder.register(rank0::Rank0Copy);
    builder.register(rank0::Rank0Transpose);
    builder.register(rank0::Rank0Permute);
    if backends.generic {
        for desc in &GENERIC_DIRECT {
            builder.register(direct::Direct::new(desc));
        }
    }
    if backends.simd {
        for desc in &SIMD_DIRECT {
            builder.register(direct::Direct::new(desc));
        }
    }
    for desc in &TWIDDLE {
        builder.register(ct::CooleyTukey::new(desc));
    }
    builder.register(ct::GenericDit);
    builder.register(generic::DftGeneric);
    builder.register(rader::Rader);
    builder.register(rdft::RdftGeneric);
    builder.register(rdft::RdftDft);
    builder.register(reodft::ReodftGeneric);
    builder.register(reodft::ReodftR2hc);
    builder.register(vecloop::VrankGeq1::new(vecloop::LoopDim::First));
    builder.register(vecloop::VrankGeq1::new(vecloop::LoopDim::Last));
    builder.register(threads::ThreadsVrankGeq1);
    builder.register(rank_geq2::RankGeq2::new(rank_geq2::SplitAt::First));
    builder.register(rank_geq2::RankGeq2::new(rank_geq2::SplitAt::Last));
    builder.register(buffered::Buffered);
    builder.register(indirect::IndirectBefore);
    builder.register(indirect::IndirectAfter);
}

/// Build a sub-problem; a malformed one makes the parent unsolvable.
pub(crate) fn subproblem(builder: ProblemBuilder) -> Result<Problem, SolveFailure> {
    builder.build().map_err(|_| SolveFailure::Unsolvable)
}

/// The single vector dimension of a problem with vector rank <= 1.
pub(crate) fn vector_dim(problem: &Problem) -> IoDim {
    problem
        .vecsz()
        .dim(0)
        .copied()
        .unwrap_or(IoDim::new(1, 0, 0))
}

/// Whether a kernel that loads a whole transform before storing any of it
/// can run in place on this problem.
pub(crate) fn gather_first_inplace_ok(problem: &Problem) -> bool {
    if !problem.is_in_place() {
        return true;
    }
    let v = vector_dim(problem);
    v.n == 1 || (problem.sz().inplace_strides() && v.is == v.os)
}

/// Visit the (input, output) element offsets of every index of `tensor`
/// in row-major order.
pub(crate) fn for_each_offset(tensor: &Tensor, mut visit: impl FnMut(usize, usize)) {
    let dims = tensor.dims();
    let mut index = vec![0usize; dims.len()];
    let (mut i, mut o) = (0usize, 0usize);
    for _ in 0..tensor.size() {
        visit(i, o);
        for (k, d) in dims.iter().enumerate().rev() {
            index[k] += 1;
            i += d.is;
            o += d.os;
            if index[k] < d.n {
                break;
            }
            index[k] = 0;
            i -= d.is * d.n;
            o -= d.os * d.n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::for_each_offset;
    use crate::tensor::{IoDim, Tensor};

    #[test]
    fn offsets_walk_row_major() {
        let t = Tensor::new(vec![IoDim::new(2, 10, 1), IoDim::new(3, 1, 2)]);
        let mut seen = Vec::new();
        for_each_offset(&t, |i, o| seen.push((i, o)));
        assert_eq!(
            seen,
            vec![(0, 0), (1, 2), (2, 4), (10, 1), (11, 3), (12, 5)]
        );
    }

    #[test]
    fn rank_zero_visits_once() {
        let mut count = 0;
        for_each_offset(&Tensor::empty(), |_, _| count += 1);
        assert_eq!(count, 1);
    }
}
