//! Vector-width kernel bodies.
//!
//! [`Vc`] emulates a register of [`VECTOR_WIDTH`] complex lanes in
//! portable code. The bodies process that many transforms of the vector
//! loop in lockstep, which is why their descriptors require the vector
//! length to be a multiple of the width.

use crate::buffers::{Buffers, Offsets};
use crate::kernels::scalar::{Complex, cadd, cmul, fixed_roots};
use crate::kernels::{DirectArgs, VECTOR_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Vc([Complex; VECTOR_WIDTH]);

impl Vc {
    const ZERO: Self = Self([(0.0, 0.0); VECTOR_WIDTH]);

    #[inline]
    fn add(self, rhs: Self) -> Self {
        let mut out = self;
        for (o, r) in out.0.iter_mut().zip(rhs.0) {
            *o = cadd(*o, r);
        }
        out
    }

    /// Multiply every lane by the same complex scalar.
    #[inline]
    fn scale(self, w: Complex) -> Self {
        let mut out = self;
        for o in &mut out.0 {
            *o = cmul(*o, w);
        }
        out
    }
}

pub fn direct_dft_vec<const N: usize>(io: &mut Buffers<'_>, at: Offsets, args: &DirectArgs) {
    debug_assert_eq!(args.vl % VECTOR_WIDTH, 0);
    let w = fixed_roots::<N>(args.sign);
    for v0 in (0..args.vl).step_by(VECTOR_WIDTH) {
        let mut x = [Vc::ZERO; N];
        for (j, slot) in x.iter_mut().enumerate() {
            for (lane, value) in slot.0.iter_mut().enumerate() {
                *value = io.load_c(at.input + (v0 + lane) * args.ivs + j * args.is);
            }
        }
        let mut y = [Vc::ZERO; N];
        for (k, out) in y.iter_mut().enumerate() {
            let mut acc = x[0];
            for (j, xj) in x.iter().enumerate().skip(1) {
                acc = acc.add(xj.scale(w[(j * k) % N]));
            }
            *out = acc;
        }
        for (k, value) in y.iter().enumerate() {
            for (lane, &c) in value.0.iter().enumerate() {
                io.store_c(at.output + (v0 + lane) * args.ovs + k * args.os, c);
            }
        }
    }
}
