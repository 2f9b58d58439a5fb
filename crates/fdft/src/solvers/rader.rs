//! Rader's algorithm: a prime-size DFT as a cyclic convolution of size
//! `n - 1`, evaluated with a planned forward DFT child.
//!
//! With `g` a primitive root mod `n`, input `a_p = x[g^p]` and kernel
//! `b_q = ω^(g^-q)`, the outputs are `X[g^-q] = x_0 + (a ⊛ b)_q` and
//! `X_0 = Σ x`. The inverse of the child is taken by conjugation, so only
//! a forward plan is needed.

use crate::buffers::{Buffers, Offsets};
use crate::flags::ProblemFlags;
use crate::kernels::scalar::{Complex, cmul, conj};
use crate::ops::OpCount;
use crate::plan::{Plan, PlanPrinter, Wakefulness};
use crate::planner::Planner;
use crate::problem::{Alignment, Problem, ProblemKind};
use crate::solver::{Applicability, PlanContext, SolveFailure, Solver, ensure_applicable};
use crate::solvers::subproblem;
use crate::tensor::IoDim;
use crate::trig;

const RADER_MIN_GOOD: usize = 32;

pub struct Rader;

fn is_prime(n: usize) -> bool {
    n >= 2 && (2..).take_while(|d| d * d <= n).all(|d| n % d != 0)
}

fn mulmod(a: usize, b: usize, n: usize) -> usize {
    ((a as u128 * b as u128) % n as u128) as usize
}

fn powmod(mut base: usize, mut exp: usize, n: usize) -> usize {
    let mut acc = 1 % n;
    base %= n;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mulmod(acc, base, n);
        }
        base = mulmod(base, base, n);
        exp >>= 1;
    }
    acc
}

fn prime_factors(mut n: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            factors.push(d);
            while n % d == 0 {
                n /= d;
            }
        }
        d += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Smallest generator of the multiplicative group mod prime `n`.
pub(crate) fn primitive_root(n: usize) -> usize {
    let order = n - 1;
    let factors = prime_factors(order);
    (2..n)
        .find(|&g| factors.iter().all(|&f| powmod(g, order / f, n) != 1))
        .unwrap_or(1)
}

impl Solver for Rader {
    fn name(&self) -> &str {
        "rader"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        if problem.kind() != ProblemKind::Dft || problem.rank() != 1 || problem.vector_rank() != 0 {
            return Applicability::No;
        }
        let n = problem.sz().dims()[0].n;
        if n < 3 || !is_prime(n) {
            Applicability::No
        } else if n < RADER_MIN_GOOD {
            Applicability::Ugly
        } else {
            Applicability::Good
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let d = problem.sz().dims()[0];
        let n = d.n;
        planner.check_scratch(2 * 2 * (n - 1) * size_of::<f64>())?;
        let child = subproblem(
            Problem::builder(ProblemKind::Dft)
                .dims(&[IoDim::new(n - 1, 1, 1)])
                .sign(-1)
                .alignment(Alignment::Unaligned)
                .flags(ProblemFlags::DESTROY_INPUT),
        )?;
        let child = planner.mkplan(&child)?;
        let g = primitive_root(n);
        Ok(Box::new(RaderPlan {
            n,
            is: d.is,
            os: d.os,
            sign: problem.sign(),
            g,
            ginv: powmod(g, n - 2, n),
            child,
            omega: None,
        }))
    }
}

struct RaderPlan {
    n: usize,
    is: usize,
    os: usize,
    sign: i32,
    g: usize,
    ginv: usize,
    child: Box<dyn Plan>,
    /// DFT of the kernel, pre-scaled by `1 / (n - 1)`.
    omega: Option<Vec<Complex>>,
}

fn to_interleaved(values: &[Complex], out: &mut [f64]) {
    for (pair, &(re, im)) in out.chunks_exact_mut(2).zip(values) {
        pair[0] = re;
        pair[1] = im;
    }
}

fn from_interleaved(values: &[f64]) -> Vec<Complex> {
    values.chunks_exact(2).map(|p| (p[0], p[1])).collect()
}

impl RaderPlan {
    fn compute_omega(&self) -> Vec<Complex> {
        let m = self.n - 1;
        let mut b = vec![0.0; 2 * m];
        let mut exponent = 1usize;
        for pair in b.chunks_exact_mut(2) {
            let (re, im) = trig::root(exponent, self.n, self.sign);
            pair[0] = re;
            pair[1] = im;
            exponent = mulmod(exponent, self.ginv, self.n);
        }
        let mut spectrum = vec![0.0; 2 * m];
        self.child
            .apply(&mut Buffers::out_of_place(&mut b, &mut spectrum), Offsets::ZERO);
        let scale = 1.0 / m as f64;
        from_interleaved(&spectrum)
            .into_iter()
            .map(|(re, im)| (re * scale, im * scale))
            .collect()
    }
}

impl Plan for RaderPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        debug_assert!(self.omega.is_some(), "rader applied while asleep");
        let Some(omega) = self.omega.as_deref() else {
            return;
        };
        let m = self.n - 1;
        let x0 = io.load_c(at.input);
        let mut total = x0;
        let mut a = vec![0.0; 2 * m];
        let mut index = 1usize;
        for pair in a.chunks_exact_mut(2) {
            let (re, im) = io.load_c(at.input + index * self.is);
            total = (total.0 + re, total.1 + im);
            pair[0] = re;
            pair[1] = im;
            index = mulmod(index, self.g, self.n);
        }

        let mut spectrum = vec![0.0; 2 * m];
        self.child
            .apply(&mut Buffers::out_of_place(&mut a, &mut spectrum), Offsets::ZERO);
        let product = from_interleaved(&spectrum)
            .into_iter()
            .zip(omega)
            .map(|(s, &w)| conj(cmul(s, w)))
            .collect::<Vec<_>>();
        to_interleaved(&product, &mut a);
        self.child
            .apply(&mut Buffers::out_of_place(&mut a, &mut spectrum), Offsets::ZERO);

        io.store_c(at.output, total);
        let mut index = 1usize;
        for pair in spectrum.chunks_exact(2) {
            let c = conj((pair[0], pair[1]));
            io.store_c(at.output + index * self.os, (x0.0 + c.0, x0.1 + c.1));
            index = mulmod(index, self.ginv, self.n);
        }
    }

    fn awake(&mut self, wakefulness: Wakefulness) {
        self.child.awake(wakefulness);
        match wakefulness {
            Wakefulness::Awake => {
                if self.omega.is_none() {
                    self.omega = Some(self.compute_omega());
                }
            }
            Wakefulness::Asleep => self.omega = None,
        }
    }

    fn print(&self, printer: &mut PlanPrinter) {
        printer.node(format_args!("rader-{} g={}", self.n, self.g), &[self.child.as_ref()]);
    }

    fn ops(&self) -> OpCount {
        let m = (self.n - 1) as f64;
        let child = self.child.ops();
        child + child + OpCount::new(2.0 * m + 2.0 * m, 4.0 * m, 0.0, 2.0 * m)
    }
}
