//! Scalar kernel bodies.
//!
//! Fixed-size bodies are const-generic so the compiler fully unrolls the
//! inner loops; the runtime-size helpers back the generic solvers.

use crate::buffers::{Buffers, Offsets};
use crate::kernels::{DirectArgs, TwiddleArgs};
use crate::trig;

pub(crate) type Complex = (f64, f64);

#[inline]
pub(crate) fn cadd(a: Complex, b: Complex) -> Complex {
    (a.0 + b.0, a.1 + b.1)
}

#[inline]
pub(crate) fn cmul(a: Complex, b: Complex) -> Complex {
    (a.0 * b.0 - a.1 * b.1, a.0 * b.1 + a.1 * b.0)
}

#[inline]
pub(crate) fn conj(a: Complex) -> Complex {
    (a.0, -a.1)
}

pub(crate) fn fixed_roots<const N: usize>(sign: i32) -> [Complex; N] {
    let mut w = [(0.0, 0.0); N];
    for (k, slot) in w.iter_mut().enumerate() {
        *slot = trig::root(k, N, sign);
    }
    w
}

#[inline]
fn dft_fixed<const N: usize>(x: &[Complex; N], w: &[Complex; N]) -> [Complex; N] {
    let mut y = [(0.0, 0.0); N];
    for (m, out) in y.iter_mut().enumerate() {
        let mut acc = x[0];
        for (j, &xj) in x.iter().enumerate().skip(1) {
            acc = cadd(acc, cmul(xj, w[(j * m) % N]));
        }
        *out = acc;
    }
    y
}

/// `vl` transforms of size `N`. All inputs of a transform are loaded
/// before any output is stored, so aliased in-place calls are safe.
pub fn direct_dft<const N: usize>(io: &mut Buffers<'_>, at: Offsets, args: &DirectArgs) {
    let w = fixed_roots::<N>(args.sign);
    for v in 0..args.vl {
        let ib = at.input + v * args.ivs;
        let ob = at.output + v * args.ovs;
        let mut x = [(0.0, 0.0); N];
        for (j, slot) in x.iter_mut().enumerate() {
            *slot = io.load_c(ib + j * args.is);
        }
        for (k, &y) in dft_fixed(&x, &w).iter().enumerate() {
            io.store_c(ob + k * args.os, y);
        }
    }
}

/// In-place radix-`R` decimation-in-time pass over `m` butterflies.
pub fn twiddle_dit<const R: usize>(data: &mut [f64], args: &TwiddleArgs, twiddles: &[f64]) {
    let w = fixed_roots::<R>(args.sign);
    for k in 0..args.m {
        let mut x = [(0.0, 0.0); R];
        for (j, slot) in x.iter_mut().enumerate() {
            let e = args.base + (j * args.m + k) * args.os;
            let v = (data[2 * e], data[2 * e + 1]);
            *slot = if j == 0 {
                v
            } else {
                let t = (j - 1) * args.m + k;
                cmul(v, (twiddles[2 * t], twiddles[2 * t + 1]))
            };
        }
        for (q, &y) in dft_fixed(&x, &w).iter().enumerate() {
            let e = args.base + (q * args.m + k) * args.os;
            data[2 * e] = y.0;
            data[2 * e + 1] = y.1;
        }
    }
}

/// Runtime-radix version of [`twiddle_dit`]; `roots` holds the `r`-th
/// roots of unity of the pass direction, interleaved.
pub fn twiddle_dit_dyn(
    data: &mut [f64],
    args: &TwiddleArgs,
    r: usize,
    twiddles: &[f64],
    roots: &[f64],
    scratch: &mut Vec<Complex>,
) {
    for k in 0..args.m {
        scratch.clear();
        for j in 0..r {
            let e = args.base + (j * args.m + k) * args.os;
            let v = (data[2 * e], data[2 * e + 1]);
            scratch.push(if j == 0 {
                v
            } else {
                let t = (j - 1) * args.m + k;
                cmul(v, (twiddles[2 * t], twiddles[2 * t + 1]))
            });
        }
        for q in 0..r {
            let mut acc = scratch[0];
            for (j, &xj) in scratch.iter().enumerate().skip(1) {
                let p = (j * q) % r;
                acc = cadd(acc, cmul(xj, (roots[2 * p], roots[2 * p + 1])));
            }
            let e = args.base + (q * args.m + k) * args.os;
            data[2 * e] = acc.0;
            data[2 * e + 1] = acc.1;
        }
    }
}

/// O(n²) DFT of interleaved `x` against a precomputed roots table.
pub(crate) fn dft_with_roots(x: &[Complex], roots: &[f64], out: &mut [Complex]) {
    let n = x.len();
    for (k, slot) in out.iter_mut().enumerate().take(n) {
        let mut acc = (0.0, 0.0);
        for (j, &xj) in x.iter().enumerate() {
            let p = (j * k) % n;
            acc = cadd(acc, cmul(xj, (roots[2 * p], roots[2 * p + 1])));
        }
        *slot = acc;
    }
}

/// Unplanned O(n²) DFT of an interleaved complex array.
#[must_use]
pub fn naive_dft(input: &[f64], sign: i32) -> Vec<f64> {
    let n = input.len() / 2;
    let x = (0..n)
        .map(|j| (input[2 * j], input[2 * j + 1]))
        .collect::<Vec<_>>();
    let roots = trig::roots_table(n, sign);
    let mut out = vec![(0.0, 0.0); n];
    dft_with_roots(&x, &roots, &mut out);
    out.into_iter().flat_map(|(re, im)| [re, im]).collect()
}

#[cfg(test)]
mod tests {
    use super::{Complex, cmul, conj, naive_dft, twiddle_dit_dyn};
    use crate::kernels::{TwiddleArgs, twiddle_table};
    use crate::trig;

    #[test]
    fn conj_negates_imaginary() {
        let a: Complex = (1.5, -2.0);
        let p = cmul(a, conj(a));
        assert!((p.0 - 6.25).abs() < 1e-15);
        assert!(p.1.abs() < 1e-15);
    }

    #[test]
    fn naive_dft_of_impulse_is_flat() {
        let mut x = vec![0.0; 10];
        x[0] = 1.0;
        let y = naive_dft(&x, -1);
        for k in 0..5 {
            assert!((y[2 * k] - 1.0).abs() < 1e-15);
            assert!(y[2 * k + 1].abs() < 1e-15);
        }
    }

    #[test]
    fn runtime_radix_pass_matches_fixed_semantics() {
        let r = 11;
        let m = 2;
        let n = r * m;
        let input = (0..2 * n).map(|i| (i as f64 * 0.3).cos()).collect::<Vec<_>>();
        let mut data = vec![0.0; 2 * n];
        for j in 0..r {
            let column = (0..m)
                .flat_map(|l| {
                    let e = l * r + j;
                    [input[2 * e], input[2 * e + 1]]
                })
                .collect::<Vec<_>>();
            data[2 * j * m..2 * (j + 1) * m].copy_from_slice(&naive_dft(&column, 1));
        }
        let args = TwiddleArgs {
            base: 0,
            os: 1,
            m,
            sign: 1,
        };
        let mut scratch = Vec::new();
        twiddle_dit_dyn(
            &mut data,
            &args,
            r,
            &twiddle_table(r, m, 1),
            &trig::roots_table(r, 1),
            &mut scratch,
        );
        let expected = naive_dft(&input, 1);
        for (a, e) in data.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-11);
        }
    }
}
