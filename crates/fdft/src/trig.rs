//! Accurate roots of unity.
//!
//! Angles are reduced to the first octant before calling `cos`/`sin`, so
//! `root(m, n)` stays accurate for large `n` and exact symmetries hold
//! (`root(n/4, n)` is exactly `(0, ±1)`).

use std::f64::consts::PI;

/// `(cos(2πm/n), sin(2πm/n))` with octant reduction.
#[must_use]
pub fn cos_sin_2pi(m: usize, n: usize) -> (f64, f64) {
    debug_assert!(n > 0);
    let m = (m % n) as u128;
    let quarter = n as u128;
    let full = quarter * 4;
    let mut m = m * 4;
    let mut octant = 0u8;

    if m > full - m {
        m = full - m;
        octant |= 4;
    }
    if m > quarter {
        m -= quarter;
        octant |= 2;
    }
    if m > quarter - m {
        m = quarter - m;
        octant |= 1;
    }

    let theta = 2.0 * PI * (m as f64) / (full as f64);
    let (mut c, mut s) = (theta.cos(), theta.sin());

    if octant & 1 != 0 {
        std::mem::swap(&mut c, &mut s);
    }
    if octant & 2 != 0 {
        let t = c;
        c = -s;
        s = t;
    }
    if octant & 4 != 0 {
        s = -s;
    }
    (c, s)
}

/// `exp(sign · 2πi · m / n)` as `(re, im)`.
#[must_use]
pub fn root(m: usize, n: usize, sign: i32) -> (f64, f64) {
    let (c, s) = cos_sin_2pi(m, n);
    if sign < 0 { (c, -s) } else { (c, s) }
}

/// Interleaved table of `root(k, n, sign)` for `k in 0..n`.
#[must_use]
pub fn roots_table(n: usize, sign: i32) -> Vec<f64> {
    let mut table = Vec::with_capacity(2 * n);
    for k in 0..n {
        let (re, im) = root(k, n, sign);
        table.push(re);
        table.push(im);
    }
    table
}
