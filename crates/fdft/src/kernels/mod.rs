//! Kernel descriptors and reference kernel bodies.
//!
//! Solvers see kernels only through their descriptors: a size, the strides
//! they are pinned to (if any), vector-length divisibility, an operation
//! count, an extra applicability predicate and a function pointer. The
//! bodies in [`scalar`] and [`simd`] are straightforward reference
//! implementations; any body with the same signature can be swapped in.

pub mod scalar;
pub mod simd;

use std::fmt;

use crate::buffers::{Buffers, Offsets};
use crate::ops::OpCount;
use crate::problem::Problem;

/// Complex lanes processed together by the vectorized kernels.
pub const VECTOR_WIDTH: usize = 2;

/// Loop parameters of one direct-kernel invocation (strides in elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectArgs {
    pub is: usize,
    pub os: usize,
    pub vl: usize,
    pub ivs: usize,
    pub ovs: usize,
    pub sign: i32,
}

pub type DirectKernelFn = fn(&mut Buffers<'_>, Offsets, &DirectArgs);

/// Parameters of one twiddle pass over `m` radix-`r` butterflies stored
/// at `base + (j * m + k) * os`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwiddleArgs {
    pub base: usize,
    pub os: usize,
    pub m: usize,
    pub sign: i32,
}

pub type TwiddleKernelFn = fn(&mut [f64], &TwiddleArgs, &[f64]);

/// Straight-line transform of one fixed size.
#[derive(Clone, Copy)]
pub struct DirectKernelDesc {
    pub name: &'static str,
    pub n: usize,
    pub pinned_is: Option<usize>,
    pub pinned_os: Option<usize>,
    /// The vector length must be a multiple of this.
    pub vl_multiple: usize,
    pub simd: bool,
    /// Cost of one transform.
    pub ops: OpCount,
    pub applicable: fn(&Problem) -> bool,
    pub func: DirectKernelFn,
}

impl fmt::Debug for DirectKernelDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectKernelDesc")
            .field("name", &self.name)
            .field("n", &self.n)
            .field("vl_multiple", &self.vl_multiple)
            .field("simd", &self.simd)
            .finish_non_exhaustive()
    }
}

/// Radix-`radix` decimation-in-time butterfly pass.
#[derive(Clone, Copy)]
pub struct TwiddleKernelDesc {
    pub name: &'static str,
    pub radix: usize,
    /// Cost of one butterfly.
    pub ops: OpCount,
    pub func: TwiddleKernelFn,
}

impl fmt::Debug for TwiddleKernelDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwiddleKernelDesc")
            .field("name", &self.name)
            .field("radix", &self.radix)
            .finish_non_exhaustive()
    }
}

fn any_problem(_: &Problem) -> bool {
    true
}

const fn generic(name: &'static str, n: usize, add: f64, mul: f64, func: DirectKernelFn) -> DirectKernelDesc {
    DirectKernelDesc {
        name,
        n,
        pinned_is: None,
        pinned_os: None,
        vl_multiple: 1,
        simd: false,
        ops: OpCount::new(add, mul, 0.0, 0.0),
        applicable: any_problem,
        func,
    }
}

const fn vectorized(name: &'static str, n: usize, add: f64, mul: f64, func: DirectKernelFn) -> DirectKernelDesc {
    DirectKernelDesc {
        name,
        n,
        pinned_is: None,
        pinned_os: None,
        vl_multiple: VECTOR_WIDTH,
        simd: true,
        ops: OpCount::new(add, mul, 0.0, 0.0),
        applicable: any_problem,
        func,
    }
}

const fn twiddle(name: &'static str, radix: usize, add: f64, mul: f64, func: TwiddleKernelFn) -> TwiddleKernelDesc {
    TwiddleKernelDesc {
        name,
        radix,
        ops: OpCount::new(add, mul, 0.0, 0.0),
        func,
    }
}

/// Scalar direct kernels of the generic backend.
pub static GENERIC_DIRECT: [DirectKernelDesc; 8] = [
    generic("n1_2", 2, 4.0, 0.0, scalar::direct_dft::<2>),
    generic("n1_3", 3, 12.0, 4.0, scalar::direct_dft::<3>),
    generic("n1_4", 4, 16.0, 0.0, scalar::direct_dft::<4>),
    generic("n1_5", 5, 32.0, 12.0, scalar::direct_dft::<5>),
    generic("n1_6", 6, 36.0, 8.0, scalar::direct_dft::<6>),
    generic("n1_7", 7, 60.0, 36.0, scalar::direct_dft::<7>),
    generic("n1_8", 8, 52.0, 4.0, scalar::direct_dft::<8>),
    generic("n1_16", 16, 144.0, 24.0, scalar::direct_dft::<16>),
];

/// Vectorized direct kernels of the simd backend.
pub static SIMD_DIRECT: [DirectKernelDesc; 4] = [
    vectorized("n1fv_2", 2, 4.0, 0.0, simd::direct_dft_vec::<2>),
    vectorized("n1fv_4", 4, 16.0, 0.0, simd::direct_dft_vec::<4>),
    vectorized("n1fv_8", 8, 52.0, 4.0, simd::direct_dft_vec::<8>),
    vectorized("n1fv_16", 16, 144.0, 24.0, simd::direct_dft_vec::<16>),
];

/// Twiddle kernels used by the Cooley-Tukey solvers.
pub static TWIDDLE: [TwiddleKernelDesc; 6] = [
    twiddle("t1_2", 2, 6.0, 4.0, scalar::twiddle_dit::<2>),
    twiddle("t1_3", 3, 18.0, 12.0, scalar::twiddle_dit::<3>),
    twiddle("t1_4", 4, 22.0, 12.0, scalar::twiddle_dit::<4>),
    twiddle("t1_5", 5, 40.0, 28.0, scalar::twiddle_dit::<5>),
    twiddle("t1_8", 8, 66.0, 32.0, scalar::twiddle_dit::<8>),
    twiddle("t1_16", 16, 174.0, 84.0, scalar::twiddle_dit::<16>),
];

/// Twiddle table for a radix-`r` pass over `n = r * m` points:
/// entry `(j - 1) * m + k` holds `ω_n^(j·k)` for `j in 1..r`.
#[must_use]
pub fn twiddle_table(r: usize, m: usize, sign: i32) -> Vec<f64> {
    let n = r * m;
    let mut table = Vec::with_capacity(2 * (r - 1) * m);
    for j in 1..r {
        for k in 0..m {
            let (re, im) = crate::trig::root(j * k, n, sign);
            table.push(re);
            table.push(im);
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::{DirectArgs, GENERIC_DIRECT, SIMD_DIRECT, TWIDDLE, TwiddleArgs, twiddle_table};
    use crate::buffers::{Buffers, Offsets};
    use crate::kernels::scalar::naive_dft;

    fn signal(n: usize, seed: f64) -> Vec<f64> {
        (0..2 * n)
            .map(|i| ((i as f64 + 1.0) * seed).sin())
            .collect()
    }

    #[test]
    fn generic_kernels_match_naive_dft() {
        for desc in &GENERIC_DIRECT {
            for sign in [-1, 1] {
                let mut input = signal(desc.n, 0.37);
                let mut output = vec![0.0; 2 * desc.n];
                let args = DirectArgs {
                    is: 1,
                    os: 1,
                    vl: 1,
                    ivs: 0,
                    ovs: 0,
                    sign,
                };
                (desc.func)(
                    &mut Buffers::out_of_place(&mut input, &mut output),
                    Offsets::ZERO,
                    &args,
                );
                let expected = naive_dft(&input, sign);
                for (a, e) in output.iter().zip(&expected) {
                    assert!((a - e).abs() < 1e-12, "{} sign {sign}", desc.name);
                }
            }
        }
    }

    #[test]
    fn vectorized_kernels_match_scalar_lane_by_lane() {
        for desc in &SIMD_DIRECT {
            let n = desc.n;
            let vl = 4;
            let mut input = signal(n * vl, 0.11);
            let mut output = vec![0.0; 2 * n * vl];
            let args = DirectArgs {
                is: vl,
                os: vl,
                vl,
                ivs: 1,
                ovs: 1,
                sign: -1,
            };
            (desc.func)(
                &mut Buffers::out_of_place(&mut input, &mut output),
                Offsets::ZERO,
                &args,
            );
            for lane in 0..vl {
                let column = (0..n)
                    .flat_map(|j| {
                        let e = j * vl + lane;
                        [input[2 * e], input[2 * e + 1]]
                    })
                    .collect::<Vec<_>>();
                let expected = naive_dft(&column, -1);
                for k in 0..n {
                    let e = k * vl + lane;
                    assert!((output[2 * e] - expected[2 * k]).abs() < 1e-12);
                    assert!((output[2 * e + 1] - expected[2 * k + 1]).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn twiddle_pass_completes_a_split_transform() {
        for desc in &TWIDDLE {
            let r = desc.radix;
            let m = 3;
            let n = r * m;
            let input = signal(n, 0.23);
            let mut data = vec![0.0; 2 * n];
            for j in 0..r {
                let column = (0..m)
                    .flat_map(|l| {
                        let e = l * r + j;
                        [input[2 * e], input[2 * e + 1]]
                    })
                    .collect::<Vec<_>>();
                let y = naive_dft(&column, -1);
                data[2 * j * m..2 * (j + 1) * m].copy_from_slice(&y);
            }
            let table = twiddle_table(r, m, -1);
            let args = TwiddleArgs {
                base: 0,
                os: 1,
                m,
                sign: -1,
            };
            (desc.func)(&mut data, &args, &table);
            let expected = naive_dft(&input, -1);
            for (a, e) in data.iter().zip(&expected) {
                assert!((a - e).abs() < 1e-11, "{}", desc.name);
            }
        }
    }
}
