//! Cooley-Tukey decimation in time.
//!
//! For `n = r * m` the child computes `r` transforms of size `m` over the
//! input decimated by `r`, writing them contiguously into the output; a
//! twiddle pass then combines them in place with `m` radix-`r` butterflies.

use crate::buffers::{Buffers, Offsets};
use crate::kernels::scalar::{Complex, twiddle_dit_dyn};
use crate::kernels::{TwiddleArgs, TwiddleKernelDesc, twiddle_table};
use crate::ops::OpCount;
use crate::plan::{Plan, PlanPrinter, Wakefulness};
use crate::planner::Planner;
use crate::problem::{Problem, ProblemKind};
use crate::solver::{Applicability, PlanContext, SolveFailure, Solver, ensure_applicable};
use crate::solvers::subproblem;
use crate::tensor::IoDim;
use crate::trig;

/// Shape test shared by both solvers: rank-1 out-of-place complex DFT
/// without a vector loop.
fn splittable(problem: &Problem) -> Option<IoDim> {
    if problem.kind() == ProblemKind::Dft
        && problem.rank() == 1
        && problem.vector_rank() == 0
        && !problem.is_in_place()
    {
        Some(problem.sz().dims()[0])
    } else {
        None
    }
}

fn child_problem(problem: &Problem, d: IoDim, r: usize) -> Result<Problem, SolveFailure> {
    let m = d.n / r;
    subproblem(
        problem
            .derive()
            .dims(&[IoDim::new(m, r * d.is, d.os)])
            .vector_dims(&[IoDim::new(r, d.is, m * d.os)]),
    )
}

/// Radix fixed by a twiddle kernel descriptor.
pub struct CooleyTukey {
    desc: &'static TwiddleKernelDesc,
    name: String,
}

impl CooleyTukey {
    #[must_use]
    pub fn new(desc: &'static TwiddleKernelDesc) -> Self {
        Self {
            desc,
            name: format!("ct-dit/{}", desc.name),
        }
    }
}

impl Solver for CooleyTukey {
    fn name(&self) -> &str {
        &self.name
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        match splittable(problem) {
            Some(d) if d.n > self.desc.radix && d.n % self.desc.radix == 0 => Applicability::Good,
            _ => Applicability::No,
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let d = problem.sz().dims()[0];
        let r = self.desc.radix;
        let child = planner.mkplan(&child_problem(problem, d, r)?)?;
        Ok(Box::new(CtPlan {
            r,
            m: d.n / r,
            os: d.os,
            sign: problem.sign(),
            butterfly: Butterfly::Kernel(self.desc),
            child,
            twiddles: None,
        }))
    }
}

/// Radix chosen at plan time: the smallest divisor of a composite size.
pub struct GenericDit;

fn smallest_divisor(n: usize) -> usize {
    (2..)
        .take_while(|d| d * d <= n)
        .find(|d| n % d == 0)
        .unwrap_or(n)
}

impl Solver for GenericDit {
    fn name(&self) -> &str {
        "generic-dit"
    }

    fn applicable(&self, problem: &Problem, _ctx: &PlanContext) -> Applicability {
        match splittable(problem) {
            Some(d) if smallest_divisor(d.n) < d.n => Applicability::Ugly,
            _ => Applicability::No,
        }
    }

    fn mkplan(&self, problem: &Problem, planner: &mut Planner) -> Result<Box<dyn Plan>, SolveFailure> {
        ensure_applicable(self, problem, planner)?;
        let d = problem.sz().dims()[0];
        let r = smallest_divisor(d.n);
        let child = planner.mkplan(&child_problem(problem, d, r)?)?;
        Ok(Box::new(CtPlan {
            r,
            m: d.n / r,
            os: d.os,
            sign: problem.sign(),
            butterfly: Butterfly::Runtime { roots: None },
            child,
            twiddles: None,
        }))
    }
}

enum Butterfly {
    Kernel(&'static TwiddleKernelDesc),
    Runtime { roots: Option<Vec<f64>> },
}

struct CtPlan {
    r: usize,
    m: usize,
    os: usize,
    sign: i32,
    butterfly: Butterfly,
    child: Box<dyn Plan>,
    twiddles: Option<Vec<f64>>,
}

impl Plan for CtPlan {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets) {
        debug_assert!(self.twiddles.is_some(), "ct plan applied while asleep");
        self.child.apply(io, at);
        let Some(twiddles) = self.twiddles.as_deref() else {
            return;
        };
        let args = TwiddleArgs {
            base: at.output,
            os: self.os,
            m: self.m,
            sign: self.sign,
        };
        let data = io.output_mut();
        match &self.butterfly {
            Butterfly::Kernel(desc) => (desc.func)(data, &args, twiddles),
            Butterfly::Runtime { roots: Some(roots) } => {
                let mut scratch: Vec<Complex> = Vec::with_capacity(self.r);
                twiddle_dit_dyn(data, &args, self.r, twiddles, roots, &mut scratch);
            }
            Butterfly::Runtime { roots: None } => {}
        }
    }

    fn awake(&mut self, wakefulness: Wakefulness) {
        self.child.awake(wakefulness);
        let (r, m, sign) = (self.r, self.m, self.sign);
        match wakefulness {
            Wakefulness::Awake => {
                self.twiddles.get_or_insert_with(|| twiddle_table(r, m, sign));
                if let Butterfly::Runtime { roots } = &mut self.butterfly {
                    roots.get_or_insert_with(|| trig::roots_table(r, sign));
                }
            }
            Wakefulness::Asleep => {
                self.twiddles = None;
                if let Butterfly::Runtime { roots } = &mut self.butterfly {
                    *roots = None;
                }
            }
        }
    }

    fn print(&self, printer: &mut PlanPrinter) {
        let label = match &self.butterfly {
            Butterfly::Kernel(desc) => format!("ct-dit {}", desc.name),
            Butterfly::Runtime { .. } => format!("generic-dit r={}", self.r),
        };
        printer.node(label, &[self.child.as_ref()]);
    }

    fn ops(&self) -> OpCount {
        let m = self.m as f64;
        let pass = match &self.butterfly {
            Butterfly::Kernel(desc) => desc.ops * m,
            Butterfly::Runtime { .. } => {
                let r = self.r as f64;
                // twiddle multiplies plus a quadratic butterfly
                OpCount::new(4.0 * r * r, 4.0 * r * r + 6.0 * (r - 1.0), 0.0, 0.0) * m
            }
        };
        self.child.ops() + pass
    }
}

#[cfg(test)]
mod tests {
    use super::{Butterfly, CooleyTukey, CtPlan, GenericDit, smallest_divisor};
    use crate::config::PlannerConfig;
    use crate::flags::PlannerFlags;
    use crate::kernels::TWIDDLE;
    use crate::plan::{Plan, Wakefulness};
    use crate::planner::Planner;
    use crate::problem::{Problem, ProblemKind};
    use crate::solver::{Applicability, PlanContext, Solver};
    use crate::tensor::IoDim;

    #[test]
    fn divisors() {
        assert_eq!(smallest_divisor(15), 3);
        assert_eq!(smallest_divisor(49), 7);
        assert_eq!(smallest_divisor(13), 13);
    }

    #[test]
    fn radix_must_divide_and_be_smaller() {
        let c = PlanContext {
            flags: PlannerFlags::MEASURE,
            nthreads: 1,
        };
        let radix4 = CooleyTukey::new(&TWIDDLE[2]);
        assert_eq!(radix4.applicable(&Problem::dft_1d(16, -1).expect("p"), &c), Applicability::Good);
        assert_eq!(radix4.applicable(&Problem::dft_1d(4, -1).expect("p"), &c), Applicability::No);
        assert_eq!(radix4.applicable(&Problem::dft_1d(18, -1).expect("p"), &c), Applicability::No);
        let in_place = Problem::builder(ProblemKind::Dft)
            .dims(&[IoDim::new(16, 1, 1)])
            .in_place(true)
            .build()
            .expect("p");
        assert_eq!(radix4.applicable(&in_place, &c), Applicability::No);
        assert_eq!(GenericDit.applicable(&Problem::dft_1d(77, -1).expect("p"), &c), Applicability::Ugly);
        assert_eq!(GenericDit.applicable(&Problem::dft_1d(79, -1).expect("p"), &c), Applicability::No);
    }

    fn runtime_roots(plan: &CtPlan) -> Option<*const f64> {
        match &plan.butterfly {
            Butterfly::Runtime { roots } => roots.as_ref().map(Vec::as_ptr),
            Butterfly::Kernel(_) => None,
        }
    }

    #[test]
    fn awake_twice_keeps_the_tables() {
        let mut planner = Planner::new(PlannerConfig::default().with_flags(PlannerFlags::ESTIMATE));
        let child = planner
            .mkplan(&Problem::dft_1d(5, -1).expect("p"))
            .expect("child");
        let mut plan = CtPlan {
            r: 3,
            m: 5,
            os: 1,
            sign: -1,
            butterfly: Butterfly::Runtime { roots: None },
            child,
            twiddles: None,
        };
        plan.awake(Wakefulness::Awake);
        let twiddles = plan.twiddles.as_ref().map(Vec::as_ptr);
        let roots = runtime_roots(&plan);
        assert!(twiddles.is_some() && roots.is_some());
        plan.awake(Wakefulness::Awake);
        assert_eq!(plan.twiddles.as_ref().map(Vec::as_ptr), twiddles);
        assert_eq!(runtime_roots(&plan), roots);
        plan.awake(Wakefulness::Asleep);
        assert!(plan.twiddles.is_none());
        assert!(runtime_roots(&plan).is_none());
    }
}
