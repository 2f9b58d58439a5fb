//! Plan trees and the public plan handle.
//!
//! A plan is a node produced by a solver for one problem. It owns its
//! children exclusively; dropping a node drops its own state first and
//! then its children in field order, so a whole tree is torn down depth
//! first, each node exactly once.

use std::fmt::{self, Write as _};

use crate::buffers::{Buffers, Offsets};
use crate::error::FftError;
use crate::ops::OpCount;
use crate::problem::{Alignment, Problem};

/// Transient-state level of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wakefulness {
    /// Tables freed; the plan can be woken again.
    Asleep,
    /// Twiddles, Rader tables and thread pools are live.
    Awake,
}

/// A node of an execution plan.
///
/// `apply` must only run while awake and must not touch elements outside
/// the extents implied by the problem the plan was built for.
pub trait Plan: Send + Sync {
    fn apply(&self, io: &mut Buffers<'_>, at: Offsets);

    fn awake(&mut self, _wakefulness: Wakefulness) {}

    fn print(&self, printer: &mut PlanPrinter);

    fn ops(&self) -> OpCount;
}

/// Renders a plan tree as a nested s-expression.
#[derive(Debug, Default)]
pub struct PlanPrinter {
    out: String,
    depth: usize,
}

impl PlanPrinter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(&mut self, label: impl fmt::Display) {
        let _ = write!(self.out, "({label})");
    }

    pub fn node(&mut self, label: impl fmt::Display, children: &[&dyn Plan]) {
        let _ = write!(self.out, "({label}");
        self.depth += 1;
        for child in children {
            self.out.push('\n');
            for _ in 0..self.depth {
                self.out.push_str("  ");
            }
            child.print(self);
        }
        self.depth -= 1;
        self.out.push(')');
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }
}

/// Render `plan` with a fresh printer.
#[must_use]
pub fn describe(plan: &dyn Plan) -> String {
    let mut printer = PlanPrinter::new();
    plan.print(&mut printer);
    printer.finish()
}

/// Executable plan handle returned by the planner.
///
/// Owns the root of the plan tree and the problem it solves. Dropping the
/// handle (or calling [`FftPlan::destroy`]) tears the tree down.
pub struct FftPlan {
    root: Box<dyn Plan>,
    problem: Problem,
    awake: bool,
    wisdom_hit: bool,
}

impl fmt::Debug for FftPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftPlan")
            .field("problem", &self.problem.to_string())
            .field("awake", &self.awake)
            .field("wisdom_hit", &self.wisdom_hit)
            .field("plan", &describe(self.root.as_ref()))
            .finish()
    }
}

impl FftPlan {
    /// Wrap an already awake plan tree.
    pub(crate) fn new(root: Box<dyn Plan>, problem: Problem, wisdom_hit: bool) -> Self {
        Self {
            root,
            problem,
            awake: true,
            wisdom_hit,
        }
    }

    #[must_use]
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    #[must_use]
    pub fn ops(&self) -> OpCount {
        self.root.ops()
    }

    /// Whether the root came straight from wisdom.
    #[must_use]
    pub fn wisdom_hit(&self) -> bool {
        self.wisdom_hit
    }

    #[must_use]
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    /// S-expression rendering of the plan tree; equal trees render equal.
    #[must_use]
    pub fn describe(&self) -> String {
        describe(self.root.as_ref())
    }

    /// Free transient tables. Idempotent.
    pub fn sleep(&mut self) {
        if self.awake {
            self.root.awake(Wakefulness::Asleep);
            self.awake = false;
        }
    }

    /// Rebuild transient tables. Idempotent.
    pub fn wake(&mut self) {
        if !self.awake {
            self.root.awake(Wakefulness::Awake);
            self.awake = true;
        }
    }

    /// Out-of-place execution. The input is left untouched unless the
    /// problem carries `DESTROY_INPUT`.
    pub fn execute(&self, input: &mut [f64], output: &mut [f64]) -> Result<(), FftError> {
        self.ensure_awake()?;
        if self.problem.is_in_place() {
            return Err(FftError::BufferMismatch {
                detail: "plan was built for in-place execution",
            });
        }
        let width = self.problem.element_width();
        check_len(input, width * self.problem.input_extent())?;
        check_len(output, width * self.problem.output_extent())?;
        self.check_alignment(input)?;
        self.check_alignment(output)?;
        self.root
            .apply(&mut Buffers::out_of_place(input, output), Offsets::ZERO);
        Ok(())
    }

    /// In-place execution on `data`.
    pub fn execute_in_place(&self, data: &mut [f64]) -> Result<(), FftError> {
        self.ensure_awake()?;
        if !self.problem.is_in_place() {
            return Err(FftError::BufferMismatch {
                detail: "plan was built for out-of-place execution",
            });
        }
        check_len(data, self.problem.element_width() * self.problem.extent())?;
        self.check_alignment(data)?;
        self.root.apply(&mut Buffers::in_place(data), Offsets::ZERO);
        Ok(())
    }

    /// Tear the plan tree down.
    pub fn destroy(self) {
        drop(self);
    }

    fn ensure_awake(&self) -> Result<(), FftError> {
        if self.awake {
            Ok(())
        } else {
            Err(FftError::PlanAsleep)
        }
    }

    fn check_alignment(&self, buffer: &[f64]) -> Result<(), FftError> {
        if self.problem.alignment() == Alignment::Aligned
            && Alignment::of(buffer) != Alignment::Aligned
        {
            return Err(FftError::BufferMismatch {
                detail: "aligned plan executed on a misaligned buffer",
            });
        }
        Ok(())
    }
}

fn check_len(buffer: &[f64], expected: usize) -> Result<(), FftError> {
    if buffer.len() < expected {
        return Err(FftError::LengthMismatch {
            expected,
            actual: buffer.len(),
        });
    }
    Ok(())
}
