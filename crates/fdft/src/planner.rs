//! The planner: wisdom lookup, solver search and cost evaluation.
//!
//! [`Planner::plan`] is the top-level entry. Solvers recurse through
//! [`Planner::mkplan`] for their sub-problems, so every node of a plan tree
//! is chosen by the same search and memoized in the same wisdom.
//!
//! Search order for one problem:
//!
//! 1. Replay the wisdom winner for the problem hash, if one answers the
//!    current flags. A stale winner falls through to search.
//! 2. Pass 0 scans the registry with `NO_UGLY` forced (skipped under
//!    `EXHAUSTIVE`); pass 1 scans without it, unless pass 0 found a plan or
//!    the caller asked for `NO_UGLY`.
//! 3. Candidates are scored by op count (`ESTIMATE`, or after a timeout) or
//!    by measured time; only a strictly cheaper candidate replaces the
//!    best, so registration order breaks ties.
//! 4. The winner is stored `Good`; solvers that failed are stored `Bad`.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fdft_runtime::EvidenceLedger;
use serde::{Deserialize, Serialize};

use crate::buffers::{Buffers, Offsets};
use crate::config::{MeasureConfig, PlannerConfig};
use crate::error::FftError;
use crate::flags::{Effort, PlannerFlags};
use crate::plan::{FftPlan, Plan, Wakefulness};
use crate::problem::{Problem, ProblemHash};
use crate::solver::{Applicability, Backends, PlanContext, Registry, SolveFailure, SolverId, build_registry};
use crate::wisdom::{Amnesia, ImportReport, Verdict, Wisdom};

/// Recursion guard for solver chains.
pub const MAX_PLAN_DEPTH: usize = 64;

/// Observer called for every planning event.
pub type PlannerHook = Box<dyn FnMut(&PlanningEvent) + Send>;

/// One planner decision, recorded in the planning ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlanningEvent {
    WisdomHit {
        depth: usize,
        hash: ProblemHash,
        solver: SolverId,
    },
    WisdomStale {
        depth: usize,
        hash: ProblemHash,
        solver: SolverId,
    },
    WisdomMiss {
        depth: usize,
        hash: ProblemHash,
    },
    BadSkip {
        depth: usize,
        hash: ProblemHash,
        solver: SolverId,
    },
    Candidate {
        depth: usize,
        hash: ProblemHash,
        solver: SolverId,
        cost: f64,
        measured: bool,
    },
    Rejected {
        depth: usize,
        hash: ProblemHash,
        solver: SolverId,
        failure: SolveFailure,
    },
    Winner {
        depth: usize,
        hash: ProblemHash,
        solver: SolverId,
        cost: f64,
    },
    Timeout {
        depth: usize,
        hash: ProblemHash,
    },
    NoPlan {
        depth: usize,
        hash: ProblemHash,
        problem: String,
    },
}

/// Counters accumulated over the planner's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerStats {
    pub problems_planned: u64,
    pub plans_evaluated: u64,
    pub wisdom_hits: u64,
    pub wisdom_misses: u64,
    pub bad_skips: u64,
    pub estimated_cost_total: f64,
    /// Seconds.
    pub measured_cost_total: f64,
}

struct Candidate {
    plan: Box<dyn Plan>,
    id: SolverId,
    cost: f64,
    flags: PlannerFlags,
}

pub struct Planner {
    registry: Arc<Registry>,
    wisdom: Wisdom,
    config: PlannerConfig,
    flags: PlannerFlags,
    nthreads: usize,
    stats: PlannerStats,
    ledger: EvidenceLedger<PlanningEvent>,
    hook: Option<PlannerHook>,
    deadline: Option<Instant>,
    timed_out: bool,
    depth: usize,
    root_from_wisdom: bool,
}

impl fmt::Debug for Planner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Planner")
            .field("solvers", &self.registry.len())
            .field("wisdom", &self.wisdom.len())
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

impl Planner {
    /// Planner over the standard registry with every backend.
    #[must_use]
    pub fn new(config: PlannerConfig) -> Self {
        Self::with_registry(build_registry(&Backends::default()), config)
    }

    #[must_use]
    pub fn with_registry(registry: Arc<Registry>, config: PlannerConfig) -> Self {
        Self {
            registry,
            wisdom: Wisdom::new(),
            flags: config.flags.normalize().unwrap_or(config.flags),
            nthreads: config.nthreads,
            stats: PlannerStats::default(),
            ledger: EvidenceLedger::new(config.ledger_capacity),
            hook: None,
            deadline: None,
            timed_out: false,
            depth: 0,
            root_from_wisdom: false,
            config,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Replace the configuration. The ledger keeps its newest events up to
    /// the new capacity.
    pub fn set_config(&mut self, config: PlannerConfig) {
        self.ledger.set_capacity(config.ledger_capacity);
        self.flags = config.flags.normalize().unwrap_or(config.flags);
        self.nthreads = config.nthreads;
        self.config = config;
    }

    #[must_use]
    pub fn wisdom(&self) -> &Wisdom {
        &self.wisdom
    }

    pub fn wisdom_mut(&mut self) -> &mut Wisdom {
        &mut self.wisdom
    }

    #[must_use]
    pub fn stats(&self) -> &PlannerStats {
        &self.stats
    }

    #[must_use]
    pub fn ledger(&self) -> &EvidenceLedger<PlanningEvent> {
        &self.ledger
    }

    /// Planning ledger as JSON lines.
    #[must_use]
    pub fn ledger_jsonl(&self) -> String {
        self.ledger.serialize_jsonl()
    }

    pub fn set_hook(&mut self, hook: PlannerHook) {
        self.hook = Some(hook);
    }

    pub fn clear_hook(&mut self) {
        self.hook = None;
    }

    #[must_use]
    pub fn export_wisdom(&self) -> String {
        self.wisdom.export()
    }

    pub fn import_wisdom(&mut self, text: &str) -> ImportReport {
        self.wisdom.import(text, &self.registry)
    }

    pub fn export_wisdom_to_file(&self, path: impl AsRef<Path>) -> Result<(), FftError> {
        self.wisdom.export_to_file(path)
    }

    pub fn import_wisdom_from_file(&mut self, path: impl AsRef<Path>) -> Result<ImportReport, FftError> {
        self.wisdom.import_from_file(path, &self.registry)
    }

    pub fn forget_wisdom(&mut self, amnesia: Amnesia) {
        self.wisdom.forget(amnesia);
    }

    /// Plan under the configured flags.
    pub fn plan(&mut self, problem: &Problem) -> Result<FftPlan, FftError> {
        self.plan_with_flags(problem, self.config.flags)
    }

    /// Plan `problem` and return an awake handle.
    pub fn plan_with_flags(&mut self, problem: &Problem, flags: PlannerFlags) -> Result<FftPlan, FftError> {
        let flags = flags.normalize()?;
        if self.config.nthreads == 0 {
            return Err(FftError::InvalidWorkers { requested: 0 });
        }
        self.flags = flags;
        self.nthreads = self.config.nthreads;
        self.depth = 0;
        self.timed_out = false;
        self.root_from_wisdom = false;
        self.deadline = self
            .config
            .timelimit
            .and_then(|limit| Instant::now().checked_add(limit));
        self.stats.problems_planned += 1;

        let result = self.mkplan(problem);
        self.deadline = None;
        self.flags = self.config.flags.normalize().unwrap_or(self.config.flags);

        match result {
            Ok(mut root) => {
                root.awake(Wakefulness::Awake);
                Ok(FftPlan::new(root, problem.clone(), self.root_from_wisdom))
            }
            Err(SolveFailure::Exhausted { requested_bytes }) => Err(FftError::ResourceExhausted {
                requested_bytes,
                limit_bytes: self.config.max_working_set_bytes,
            }),
            Err(_) => Err(FftError::NoPlanFound {
                kind: problem.kind(),
                detail: format!("no solver applies to {problem} under {flags:?}"),
            }),
        }
    }

    /// Flags and thread count as seen by `applicable`.
    #[must_use]
    pub fn context(&self) -> PlanContext {
        PlanContext {
            flags: self.flags,
            nthreads: self.nthreads,
        }
    }

    /// Fail with `Exhausted` when a scratch allocation of `bytes` would
    /// exceed the working-set limit.
    pub fn check_scratch(&self, bytes: usize) -> Result<(), SolveFailure> {
        if bytes > self.config.max_working_set_bytes {
            Err(SolveFailure::Exhausted {
                requested_bytes: bytes,
            })
        } else {
            Ok(())
        }
    }

    /// Plan a sub-problem under a different thread count.
    pub fn mkplan_with_threads(
        &mut self,
        problem: &Problem,
        nthreads: usize,
    ) -> Result<Box<dyn Plan>, SolveFailure> {
        let saved = self.nthreads;
        self.nthreads = nthreads;
        let result = self.mkplan(problem);
        self.nthreads = saved;
        result
    }

    /// Find the best plan for `problem`. The returned plan is asleep.
    pub fn mkplan(&mut self, problem: &Problem) -> Result<Box<dyn Plan>, SolveFailure> {
        if self.depth >= MAX_PLAN_DEPTH {
            return Err(SolveFailure::Unsolvable);
        }
        self.depth += 1;
        let result = self.search(problem);
        self.depth -= 1;
        result
    }

    fn search(&mut self, problem: &Problem) -> Result<Box<dyn Plan>, SolveFailure> {
        let hash = problem.structural_hash(self.nthreads);
        let flags = self.flags;

        if !flags.contains(PlannerFlags::IGNORE_WISDOM) {
            match self.wisdom.winner(&hash, flags) {
                Some((id, entry_flags)) => match self.replay(problem, &id, entry_flags) {
                    Ok(plan) => {
                        self.stats.wisdom_hits += 1;
                        if self.depth == 1 {
                            self.root_from_wisdom = true;
                        }
                        self.record(PlanningEvent::WisdomHit {
                            depth: self.depth,
                            hash,
                            solver: id,
                        });
                        return Ok(plan);
                    }
                    Err(_) => {
                        self.stats.wisdom_misses += 1;
                        self.record(PlanningEvent::WisdomStale {
                            depth: self.depth,
                            hash,
                            solver: id,
                        });
                    }
                },
                None => {
                    self.stats.wisdom_misses += 1;
                    self.record(PlanningEvent::WisdomMiss {
                        depth: self.depth,
                        hash,
                    });
                }
            }
        }

        if flags.intersects(PlannerFlags::WISDOM_ONLY | PlannerFlags::NO_SEARCH) {
            self.no_plan(problem, hash);
            return Err(SolveFailure::Unsolvable);
        }

        let registry = Arc::clone(&self.registry);
        let mut best: Option<Candidate> = None;
        let mut attempted = 0usize;
        let mut exhausted = 0usize;
        let mut requested = 0usize;

        for pass in 0..2 {
            let pass_flags = if pass == 0 {
                if flags.contains(PlannerFlags::EXHAUSTIVE) {
                    continue;
                }
                flags | PlannerFlags::NO_UGLY
            } else {
                if flags.contains(PlannerFlags::NO_UGLY) || best.is_some() {
                    break;
                }
                flags
            };
            self.flags = pass_flags;
            let ctx = self.context();

            for entry in registry.iter() {
                if best.is_some() && self.out_of_time(hash) {
                    break;
                }
                let id = entry.id();
                let ruled_out = self
                    .wisdom
                    .entry(&hash, id)
                    .is_some_and(|e| e.verdict == Verdict::Bad && e.flags.rules_out(pass_flags));
                if ruled_out {
                    self.stats.bad_skips += 1;
                    self.record(PlanningEvent::BadSkip {
                        depth: self.depth,
                        hash,
                        solver: id.clone(),
                    });
                    continue;
                }
                match entry.solver().applicable(problem, &ctx) {
                    Applicability::No => continue,
                    Applicability::Ugly if pass_flags.contains(PlannerFlags::NO_UGLY) => continue,
                    Applicability::Ugly | Applicability::Good => {}
                }

                attempted += 1;
                let result = entry.solver().mkplan(problem, self);
                self.flags = pass_flags;
                match result {
                    Ok(mut plan) => {
                        self.stats.plans_evaluated += 1;
                        let (cost, measured) = self.evaluate(plan.as_mut(), problem, hash);
                        self.record(PlanningEvent::Candidate {
                            depth: self.depth,
                            hash,
                            solver: id.clone(),
                            cost,
                            measured,
                        });
                        if best.as_ref().is_none_or(|b| cost < b.cost) {
                            best = Some(Candidate {
                                plan,
                                id: id.clone(),
                                cost,
                                flags: pass_flags,
                            });
                        }
                    }
                    Err(failure) => {
                        self.record(PlanningEvent::Rejected {
                            depth: self.depth,
                            hash,
                            solver: id.clone(),
                            failure,
                        });
                        if let SolveFailure::Exhausted { requested_bytes } = failure {
                            exhausted += 1;
                            requested = requested.max(requested_bytes);
                        } else {
                            self.wisdom.store(hash, id.clone(), Verdict::Bad, pass_flags);
                        }
                    }
                }
            }
        }
        self.flags = flags;

        match best {
            Some(winner) => {
                let stored = if self.timed_out {
                    winner.flags.impatient()
                } else {
                    winner.flags
                };
                self.wisdom
                    .store(hash, winner.id.clone(), Verdict::Good, stored);
                self.record(PlanningEvent::Winner {
                    depth: self.depth,
                    hash,
                    solver: winner.id,
                    cost: winner.cost,
                });
                Ok(winner.plan)
            }
            None => {
                self.no_plan(problem, hash);
                if attempted > 0 && exhausted == attempted {
                    Err(SolveFailure::Exhausted {
                        requested_bytes: requested,
                    })
                } else {
                    Err(SolveFailure::Unsolvable)
                }
            }
        }
    }

    fn replay(
        &mut self,
        problem: &Problem,
        id: &SolverId,
        entry_flags: PlannerFlags,
    ) -> Result<Box<dyn Plan>, SolveFailure> {
        let registry = Arc::clone(&self.registry);
        let solver = registry.find(id).ok_or(SolveFailure::NotApplicable)?;
        let saved = self.flags;
        self.flags = entry_flags | PlannerFlags::NO_SEARCH;
        let result = solver.mkplan(problem, self);
        self.flags = saved;
        result
    }

    fn evaluate(&mut self, plan: &mut dyn Plan, problem: &Problem, hash: ProblemHash) -> (f64, bool) {
        if self.flags.effort() == Effort::Estimate || self.out_of_time(hash) {
            let cost = plan.ops().estimate_cost();
            self.stats.estimated_cost_total += cost;
            (cost, false)
        } else {
            plan.awake(Wakefulness::Awake);
            let seconds = measure_execution_time(plan, problem, &self.config.measure).as_secs_f64();
            plan.awake(Wakefulness::Asleep);
            self.stats.measured_cost_total += seconds;
            (seconds, true)
        }
    }

    fn out_of_time(&mut self, hash: ProblemHash) -> bool {
        if !self.timed_out && self.deadline.is_some_and(|d| Instant::now() >= d) {
            self.timed_out = true;
            self.record(PlanningEvent::Timeout {
                depth: self.depth,
                hash,
            });
        }
        self.timed_out
    }

    fn no_plan(&mut self, problem: &Problem, hash: ProblemHash) {
        self.record(PlanningEvent::NoPlan {
            depth: self.depth,
            hash,
            problem: problem.to_string(),
        });
    }

    fn record(&mut self, event: PlanningEvent) {
        if let Some(hook) = self.hook.as_mut() {
            hook(&event);
        }
        self.ledger.record(event);
    }
}

/// Time one application of an awake `plan` on scratch buffers sized for
/// `problem`: the iteration count doubles until a sample lasts at least
/// `min_sample`, and the fastest of `repeats` samples is kept.
#[must_use]
pub fn measure_execution_time(plan: &dyn Plan, problem: &Problem, measure: &MeasureConfig) -> Duration {
    let width = problem.element_width();
    let fill = |buffer: &mut [f64]| {
        for (i, x) in buffer.iter_mut().enumerate() {
            *x = ((i % 17) as f64 - 8.0) * 0.125;
        }
    };
    let mut input = vec![0.0; width * problem.extent()];
    let mut output = if problem.is_in_place() {
        Vec::new()
    } else {
        vec![0.0; width * problem.output_extent()]
    };

    let mut iterations = 1usize;
    loop {
        let mut shortest = Duration::MAX;
        for _ in 0..measure.repeats.max(1) {
            fill(&mut input);
            let start = Instant::now();
            for _ in 0..iterations {
                let mut io = if problem.is_in_place() {
                    Buffers::in_place(&mut input)
                } else {
                    Buffers::out_of_place(&mut input, &mut output)
                };
                plan.apply(&mut io, Offsets::ZERO);
            }
            shortest = shortest.min(start.elapsed());
        }
        if shortest >= measure.min_sample || iterations >= measure.max_iterations {
            return shortest.div_f64(iterations as f64);
        }
        iterations = iterations.saturating_mul(2);
    }
}
