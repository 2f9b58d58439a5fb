//! Quadratic-time reference transforms, written straight from the
//! defining sums with `f64::sin_cos` and no shared tables.

use std::f64::consts::PI;

use fdft::ProblemKind;

/// Reference for one contiguous rank-1 transform. Complex kinds take and
/// return interleaved `(re, im)` pairs; real kinds take `n` reals.
#[must_use]
pub fn reference(kind: ProblemKind, sign: i32, input: &[f64]) -> Vec<f64> {
    match kind {
        ProblemKind::Dft => dft(input, sign),
        ProblemKind::R2hc => r2hc(input),
        ProblemKind::Hc2r => hc2r(input),
        ProblemKind::Redft10 => redft10(input),
        ProblemKind::Redft01 => redft01(input),
        ProblemKind::Rodft10 => rodft10(input),
        ProblemKind::Rodft01 => rodft01(input),
    }
}

#[must_use]
pub fn dft(input: &[f64], sign: i32) -> Vec<f64> {
    let n = input.len() / 2;
    let mut out = vec![0.0; 2 * n];
    for k in 0..n {
        let (mut re, mut im) = (0.0, 0.0);
        for j in 0..n {
            let theta = f64::from(sign) * 2.0 * PI * ((j * k) % n) as f64 / n as f64;
            let (s, c) = theta.sin_cos();
            let (xr, xi) = (input[2 * j], input[2 * j + 1]);
            re += xr * c - xi * s;
            im += xr * s + xi * c;
        }
        out[2 * k] = re;
        out[2 * k + 1] = im;
    }
    out
}

/// Forward real DFT in halfcomplex order.
#[must_use]
pub fn r2hc(input: &[f64]) -> Vec<f64> {
    let n = input.len();
    let complex = input.iter().flat_map(|&x| [x, 0.0]).collect::<Vec<_>>();
    let spectrum = dft(&complex, -1);
    let mut out = vec![0.0; n];
    for k in 0..=n / 2 {
        out[k] = spectrum[2 * k];
        if k > 0 && k < n - k {
            out[n - k] = spectrum[2 * k + 1];
        }
    }
    out
}

/// Unnormalized inverse of [`r2hc`].
#[must_use]
pub fn hc2r(input: &[f64]) -> Vec<f64> {
    let n = input.len();
    let mut full = vec![0.0; 2 * n];
    full[0] = input[0];
    for k in 1..n.div_ceil(2) {
        full[2 * k] = input[k];
        full[2 * k + 1] = input[n - k];
        full[2 * (n - k)] = input[k];
        full[2 * (n - k) + 1] = -input[n - k];
    }
    if n % 2 == 0 {
        full[n] = input[n / 2];
    }
    dft(&full, 1).chunks_exact(2).map(|c| c[0]).collect()
}

fn angle(num: usize, n: usize) -> f64 {
    PI * num as f64 / (2 * n) as f64
}

/// DCT-II: `Y_k = 2 Σ X_j cos(π (2j+1) k / 2n)`.
#[must_use]
pub fn redft10(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    (0..n)
        .map(|k| 2.0 * (0..n).map(|j| x[j] * angle((2 * j + 1) * k, n).cos()).sum::<f64>())
        .collect()
}

/// DCT-III: `Y_k = X_0 + 2 Σ_{j≥1} X_j cos(π j (2k+1) / 2n)`.
#[must_use]
pub fn redft01(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    (0..n)
        .map(|k| {
            x[0] + 2.0 * (1..n).map(|j| x[j] * angle(j * (2 * k + 1), n).cos()).sum::<f64>()
        })
        .collect()
}

/// DST-II: `Y_k = 2 Σ X_j sin(π (2j+1)(k+1) / 2n)`.
#[must_use]
pub fn rodft10(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    (0..n)
        .map(|k| {
            2.0 * (0..n)
                .map(|j| x[j] * angle((2 * j + 1) * (k + 1), n).sin())
                .sum::<f64>()
        })
        .collect()
}

/// DST-III: `Y_k = (-1)^k X_{n-1} + 2 Σ_{j<n-1} X_j sin(π (j+1)(2k+1) / 2n)`.
#[must_use]
pub fn rodft01(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    (0..n)
        .map(|k| {
            let last = if k % 2 == 0 { x[n - 1] } else { -x[n - 1] };
            last + 2.0
                * (0..n - 1)
                    .map(|j| x[j] * angle((j + 1) * (2 * k + 1), n).sin())
                    .sum::<f64>()
        })
        .collect()
}
