use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::flags::PlannerFlags;

/// Timing parameters for measured planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureConfig {
    /// Samples per iteration count; the minimum is kept.
    pub repeats: usize,
    /// A sample shorter than this doubles the iteration count.
    pub min_sample: Duration,
    /// Upper bound on iterations per sample.
    pub max_iterations: usize,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            repeats: 8,
            min_sample: Duration::from_micros(100),
            max_iterations: 1 << 16,
        }
    }
}

impl MeasureConfig {
    #[must_use]
    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    #[must_use]
    pub fn with_min_sample(mut self, min_sample: Duration) -> Self {
        self.min_sample = min_sample;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Configuration for a [`crate::Planner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub flags: PlannerFlags,
    /// Wall-clock budget for one top-level planning call.
    pub timelimit: Option<Duration>,
    pub nthreads: usize,
    /// Largest scratch allocation a plan may request.
    pub max_working_set_bytes: usize,
    pub measure: MeasureConfig,
    /// Capacity of the planning-event ledger.
    pub ledger_capacity: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            flags: PlannerFlags::MEASURE,
            timelimit: None,
            nthreads: 1,
            max_working_set_bytes: 64 * 1024 * 1024,
            measure: MeasureConfig::default(),
            ledger_capacity: 1024,
        }
    }
}

impl PlannerConfig {
    #[must_use]
    pub fn with_flags(mut self, flags: PlannerFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_timelimit(mut self, timelimit: Duration) -> Self {
        self.timelimit = Some(timelimit);
        self
    }

    #[must_use]
    pub fn with_nthreads(mut self, nthreads: usize) -> Self {
        self.nthreads = nthreads;
        self
    }

    #[must_use]
    pub fn with_max_working_set_bytes(mut self, bytes: usize) -> Self {
        self.max_working_set_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_measure(mut self, measure: MeasureConfig) -> Self {
        self.measure = measure;
        self
    }

    #[must_use]
    pub fn with_ledger_capacity(mut self, capacity: usize) -> Self {
        self.ledger_capacity = capacity;
        self
    }
}
