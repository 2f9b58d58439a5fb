//! Strided index spaces.
//!
//! A [`Tensor`] is a list of [`IoDim`]s, each a length with an input and
//! an output stride counted in elements. Problems carry two tensors: the
//! transform dimensions and the vector ("howmany") dimensions.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Maximum rank accepted for either tensor of a problem.
pub const MAX_RANK: usize = 32;

/// One dimension: `n` points, input stride `is`, output stride `os`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IoDim {
    pub n: usize,
    pub is: usize,
    pub os: usize,
}

impl IoDim {
    #[must_use]
    pub const fn new(n: usize, is: usize, os: usize) -> Self {
        Self { n, is, os }
    }
}

/// Which stride to keep when forcing in-place strides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tensor {
    dims: Vec<IoDim>,
}

impl Tensor {
    #[must_use]
    pub fn new(dims: Vec<IoDim>) -> Self {
        Self { dims }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { dims: Vec::new() }
    }

    #[must_use]
    pub fn from_dim(dim: IoDim) -> Self {
        Self { dims: vec![dim] }
    }

    /// Row-major tensor over `n`, innermost strides `is` and `os`.
    #[must_use]
    pub fn rowmajor(n: &[usize], is: usize, os: usize) -> Self {
        let mut dims = vec![IoDim::new(0, 0, 0); n.len()];
        let (mut si, mut so) = (is, os);
        for (dim, &len) in dims.iter_mut().zip(n).rev() {
            *dim = IoDim::new(len, si, so);
            si = si.saturating_mul(len);
            so = so.saturating_mul(len);
        }
        Self { dims }
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    #[must_use]
    pub fn dims(&self) -> &[IoDim] {
        &self.dims
    }

    #[must_use]
    pub fn dim(&self, index: usize) -> Option<&IoDim> {
        self.dims.get(index)
    }

    /// Number of points, 1 for rank 0.
    #[must_use]
    pub fn size(&self) -> usize {
        self.dims.iter().map(|d| d.n).product()
    }

    /// `size()` with overflow detection.
    #[must_use]
    pub fn checked_size(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, d| acc.checked_mul(d.n))
    }

    /// Sum of `(n - 1) * max(is, os)`.
    #[must_use]
    pub fn max_index(&self) -> usize {
        self.dims.iter().map(|d| d.n.saturating_sub(1) * d.is.max(d.os)).sum()
    }

    /// Largest input offset reached, `None` on overflow.
    #[must_use]
    pub fn input_span(&self) -> Option<usize> {
        self.dims.iter().try_fold(0usize, |acc, d| {
            d.n.saturating_sub(1).checked_mul(d.is).and_then(|x| acc.checked_add(x))
        })
    }

    /// Largest output offset reached, `None` on overflow.
    #[must_use]
    pub fn output_span(&self) -> Option<usize> {
        self.dims.iter().try_fold(0usize, |acc, d| {
            d.n.saturating_sub(1).checked_mul(d.os).and_then(|x| acc.checked_add(x))
        })
    }

    /// Smallest stride over every dimension and direction; 0 for rank 0.
    #[must_use]
    pub fn min_stride(&self) -> usize {
        self.dims
            .iter()
            .map(|d| d.is.min(d.os))
            .min()
            .unwrap_or(0)
    }

    /// Whether every dimension has `is == os`.
    #[must_use]
    pub fn inplace_strides(&self) -> bool {
        self.dims.iter().all(|d| d.is == d.os)
    }

    #[must_use]
    pub fn copy_except(&self, index: usize) -> Self {
        let dims = self
            .dims
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != index)
            .map(|(_, d)| *d)
            .collect();
        Self { dims }
    }

    /// Split into the first `at` dimensions and the rest.
    #[must_use]
    pub fn split(&self, at: usize) -> (Self, Self) {
        let at = at.min(self.dims.len());
        (
            Self::new(self.dims[..at].to_vec()),
            Self::new(self.dims[at..].to_vec()),
        )
    }

    #[must_use]
    pub fn append(&self, other: &Self) -> Self {
        let mut dims = self.dims.clone();
        dims.extend_from_slice(&other.dims);
        Self { dims }
    }

    /// Copy with `os = is` (`Which::Input`) or `is = os` (`Which::Output`).
    #[must_use]
    pub fn force_inplace(&self, which: Which) -> Self {
        let dims = self
            .dims
            .iter()
            .map(|d| match which {
                Which::Input => IoDim::new(d.n, d.is, d.is),
                Which::Output => IoDim::new(d.n, d.os, d.os),
            })
            .collect();
        Self { dims }
    }

    /// Sort by (is desc, os desc, n asc), keeping every dimension.
    #[must_use]
    pub fn sorted(&self) -> Self {
        let mut dims = self.dims.clone();
        dims.sort_by(dimcmp);
        Self { dims }
    }

    /// Drop `n == 1` dimensions and sort by (is desc, os desc, n asc).
    #[must_use]
    pub fn compress(&self) -> Self {
        let mut dims = self
            .dims
            .iter()
            .filter(|d| d.n != 1)
            .copied()
            .collect::<Vec<_>>();
        dims.sort_by(dimcmp);
        Self { dims }
    }

    /// [`Tensor::compress`], then merge neighbours that form a single
    /// contiguous strided run.
    #[must_use]
    pub fn compress_contiguous(&self) -> Self {
        let sorted = self.compress();
        let mut dims: Vec<IoDim> = Vec::with_capacity(sorted.rank());
        for d in sorted.dims {
            match dims.last_mut() {
                Some(outer) if strides_contiguous(outer, &d) => {
                    *outer = IoDim::new(outer.n * d.n, d.is, d.os);
                }
                _ => dims.push(d),
            }
        }
        Self { dims }
    }
}

fn dimcmp(a: &IoDim, b: &IoDim) -> Ordering {
    b.is.cmp(&a.is)
        .then_with(|| b.os.cmp(&a.os))
        .then_with(|| a.n.cmp(&b.n))
}

fn strides_contiguous(outer: &IoDim, inner: &IoDim) -> bool {
    outer.is == inner.n.wrapping_mul(inner.is) && outer.os == inner.n.wrapping_mul(inner.os)
}

#[cfg(test)]
mod tests {
    use super::{IoDim, Tensor, Which};

    #[test]
    fn rowmajor_strides_grow_outward() {
        let t = Tensor::rowmajor(&[4, 3, 2], 1, 1);
        assert_eq!(
            t.dims(),
            &[IoDim::new(4, 6, 6), IoDim::new(3, 2, 2), IoDim::new(2, 1, 1)]
        );
        assert_eq!(t.size(), 24);
        assert_eq!(t.input_span(), Some(23));
    }

    #[test]
    fn compress_drops_unit_dims_and_sorts() {
        let t = Tensor::new(vec![
            IoDim::new(3, 1, 1),
            IoDim::new(1, 100, 100),
            IoDim::new(5, 3, 3),
        ]);
        let c = t.compress();
        assert_eq!(c.dims(), &[IoDim::new(5, 3, 3), IoDim::new(3, 1, 1)]);
    }

    #[test]
    fn compress_contiguous_merges_rowmajor_runs() {
        let t = Tensor::rowmajor(&[4, 3, 2], 2, 2);
        let c = t.compress_contiguous();
        assert_eq!(c.dims(), &[IoDim::new(24, 2, 2)]);
    }

    #[test]
    fn compress_contiguous_keeps_gapped_dims() {
        let t = Tensor::new(vec![IoDim::new(4, 10, 10), IoDim::new(3, 1, 1)]);
        assert_eq!(t.compress_contiguous().rank(), 2);
    }

    #[test]
    fn permuted_dims_compress_identically() {
        let a = Tensor::new(vec![IoDim::new(4, 8, 1), IoDim::new(8, 1, 4)]);
        let b = Tensor::new(vec![IoDim::new(8, 1, 4), IoDim::new(4, 8, 1)]);
        assert_eq!(a.compress(), b.compress());
    }

    #[test]
    fn split_append_and_copy_except() {
        let t = Tensor::rowmajor(&[2, 3, 4], 1, 1);
        let (head, tail) = t.split(1);
        assert_eq!(head.rank(), 1);
        assert_eq!(tail.rank(), 2);
        assert_eq!(head.append(&tail), t);
        assert_eq!(t.copy_except(1).dims(), &[IoDim::new(2, 12, 12), IoDim::new(4, 1, 1)]);
    }

    #[test]
    fn stride_queries() {
        let t = Tensor::new(vec![IoDim::new(4, 8, 2), IoDim::new(2, 1, 3)]);
        assert_eq!(t.max_index(), 3 * 8 + 3);
        assert_eq!(t.min_stride(), 1);
        assert!(!t.inplace_strides());
        assert!(t.force_inplace(Which::Output).inplace_strides());
        assert_eq!(t.force_inplace(Which::Input).dims()[0], IoDim::new(4, 8, 8));
        assert_eq!(Tensor::empty().min_stride(), 0);
    }
}
