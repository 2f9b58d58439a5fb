//! Solver trait and the immutable solver registry.
//!
//! A solver is a stateless factory: given a problem it either declines or
//! builds a plan, recursing into the planner for sub-problems. Solvers are
//! registered once into a [`Registry`] snapshot; the registration order is
//! the planner's tie-break order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::flags::PlannerFlags;
use crate::plan::Plan;
use crate::planner::Planner;
use crate::problem::Problem;

/// Stable identity of a registered solver: its registration name plus the
/// sequence number among solvers registered under that name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolverId {
    pub name: String,
    pub reg_id: u32,
}

impl SolverId {
    #[must_use]
    pub fn new(name: impl Into<String>, reg_id: u32) -> Self {
        Self {
            name: name.into(),
            reg_id,
        }
    }
}

impl Ord for SolverId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.reg_id.cmp(&other.reg_id))
    }
}

impl PartialOrd for SolverId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SolverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.reg_id)
    }
}

/// Verdict of a solver's cheap applicability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Applicability {
    No,
    /// Applicable, but rarely the fastest; skipped under `NO_UGLY`.
    Ugly,
    Good,
}

impl Applicability {
    #[must_use]
    pub const fn is_applicable(self) -> bool {
        !matches!(self, Self::No)
    }
}

/// Why a solver produced no plan. Internal control flow of the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum SolveFailure {
    NotApplicable,
    /// A required sub-problem had no plan.
    Unsolvable,
    /// A scratch allocation would exceed the working-set limit.
    Exhausted { requested_bytes: usize },
}

/// Planner state visible to `applicable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanContext {
    pub flags: PlannerFlags,
    pub nthreads: usize,
}

pub trait Solver: Send + Sync {
    fn name(&self) -> &str;

    /// Pure and cheap; never allocates sub-plans.
    fn applicable(&self, problem: &Problem, ctx: &PlanContext) -> Applicability;

    fn mkplan(&self, problem: &Problem, planner: &mut Planner)
    -> Result<Box<dyn Plan>, SolveFailure>;
}

/// Re-run `applicable` at the top of `mkplan`.
pub(crate) fn ensure_applicable(
    solver: &dyn Solver,
    problem: &Problem,
    planner: &Planner,
) -> Result<(), SolveFailure> {
    if solver
        .applicable(problem, &planner.context())
        .is_applicable()
    {
        Ok(())
    } else {
        Err(SolveFailure::NotApplicable)
    }
}

pub struct RegisteredSolver {
    id: SolverId,
    solver: Box<dyn Solver>,
}

impl RegisteredSolver {
    #[must_use]
    pub fn id(&self) -> &SolverId {
        &self.id
    }

    #[must_use]
    pub fn solver(&self) -> &dyn Solver {
        self.solver.as_ref()
    }
}

/// Immutable snapshot of registered solvers, in registration order.
pub struct Registry {
    entries: Vec<RegisteredSolver>,
    index: BTreeMap<SolverId, usize>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.id.to_string()))
            .finish()
    }
}

impl Registry {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredSolver> {
        self.entries.iter()
    }

    #[must_use]
    pub fn find(&self, id: &SolverId) -> Option<&dyn Solver> {
        self.index.get(id).map(|&i| self.entries[i].solver.as_ref())
    }

    #[must_use]
    pub fn contains(&self, id: &SolverId) -> bool {
        self.index.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &SolverId> {
        self.entries.iter().map(|e| &e.id)
    }
}

/// Collects solvers, assigning each its per-name sequence number.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<RegisteredSolver>,
    counts: BTreeMap<String, u32>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `solver` and return the id it was given.
    pub fn register(&mut self, solver: impl Solver + 'static) -> SolverId {
        let name = solver.name().to_owned();
        let count = self.counts.entry(name.clone()).or_insert(0);
        let id = SolverId::new(name, *count);
        *count += 1;
        self.entries.push(RegisteredSolver {
            id: id.clone(),
            solver: Box::new(solver),
        });
        id
    }

    #[must_use]
    pub fn build(self) -> Arc<Registry> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        Arc::new(Registry {
            entries: self.entries,
            index,
        })
    }
}

/// Kernel backends whose solvers get registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backends {
    pub generic: bool,
    pub simd: bool,
}

impl Default for Backends {
    fn default() -> Self {
        Self {
            generic: true,
            simd: true,
        }
    }
}

impl Backends {
    #[must_use]
    pub const fn generic_only() -> Self {
        Self {
            generic: true,
            simd: false,
        }
    }
}

/// The standard solver library over the selected backends.
#[must_use]
pub fn build_registry(backends: &Backends) -> Arc<Registry> {
    let mut builder = RegistryBuilder::new();
    crate::solvers::register_standard(&mut builder, backends);
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::{Backends, SolverId, build_registry};

    #[test]
    fn reg_ids_count_within_a_name() {
        let registry = build_registry(&Backends::default());
        assert!(registry.contains(&SolverId::new("vrank-geq1", 0)));
        assert!(registry.contains(&SolverId::new("vrank-geq1", 1)));
        assert!(registry.contains(&SolverId::new("rank-geq2", 1)));
        assert!(registry.contains(&SolverId::new("direct/n1_4", 0)));
        assert!(!registry.contains(&SolverId::new("direct/n1_4", 1)));
        assert!(registry.find(&SolverId::new("no-such-solver", 0)).is_none());
    }

    #[test]
    fn registration_order_starts_with_copies() {
        let registry = build_registry(&Backends::default());
        let names = registry.ids().map(|id| id.name.as_str()).collect::<Vec<_>>();
        assert_eq!(&names[..4], &["nop", "rank0-copy", "rank0-transpose", "rank0-permute"]);
        let first_direct = names.iter().position(|n| n.starts_with("direct/"));
        let first_ct = names.iter().position(|n| n.starts_with("ct-dit/"));
        assert!(first_direct < first_ct);
    }

    #[test]
    fn simd_backend_is_optional() {
        let full = build_registry(&Backends::default());
        let generic = build_registry(&Backends::generic_only());
        assert!(full.len() > generic.len());
        assert!(generic.ids().all(|id| !id.name.starts_with("direct-simd/")));
        assert!(full.ids().any(|id| id.name == "direct-simd/n1fv_4"));
    }

    #[test]
    fn solver_ids_order_by_name_then_reg_id() {
        let mut ids = vec![
            SolverId::new("b", 0),
            SolverId::new("a", 1),
            SolverId::new("a", 0),
        ];
        ids.sort();
        assert_eq!(ids[0], SolverId::new("a", 0));
        assert_eq!(ids[2], SolverId::new("b", 0));
        assert_eq!(ids[1].to_string(), "a#1");
    }
}
