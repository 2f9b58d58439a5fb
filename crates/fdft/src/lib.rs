#![forbid(unsafe_code)]

//! Adaptive discrete Fourier transforms.
//!
//! A transform is described by a [`Problem`], planned by a [`Planner`] into
//! a tree of composable plans chosen from a registry of solvers, and run
//! through the resulting [`FftPlan`] any number of times.
//!
//! | Module     | Role                                                     |
//! |------------|----------------------------------------------------------|
//! | `tensor`   | strided index spaces and their algebra                   |
//! | `problem`  | validated, canonical problem descriptions                |
//! | `buffers`  | safe strided views over the caller's arrays              |
//! | `plan`     | the plan trait and the executable plan handle            |
//! | `kernels`  | fixed-size kernel descriptors and reference bodies       |
//! | `solver`   | the solver trait and the registry snapshot               |
//! | `solvers`  | the standard solver library                              |
//! | `planner`  | wisdom replay, search and cost evaluation                |
//! | `wisdom`   | memoized verdicts and their text format                  |
//! | `api`      | plan constructors and one-shot transforms                |

pub mod api;
pub mod buffers;
pub mod config;
pub mod error;
pub mod flags;
pub mod kernels;
pub mod ops;
pub mod plan;
pub mod planner;
pub mod problem;
pub mod solver;
pub mod solvers;
pub mod tensor;
pub mod trig;
pub mod wisdom;

use serde::{Deserialize, Serialize};

pub use api::{
    Complex64, FftOptions, ManyLayout, Placement, TransformTrace, WorkerPolicy,
    export_wisdom_to_file, export_wisdom_to_string, fft, fft2, fftn, forget_wisdom, ifft, ifft2,
    import_wisdom_from_file, import_wisdom_from_string, irfft, plan_dft, plan_dft_1d,
    plan_guru, plan_many_dft, plan_r2r, plan_r2r_1d, rfft, take_transform_traces,
    with_shared_planner,
};
pub use buffers::{Buffers, Offsets};
pub use config::{MeasureConfig, PlannerConfig};
pub use error::FftError;
pub use flags::{Effort, PlannerFlags, ProblemFlags};
pub use ops::OpCount;
pub use plan::{FftPlan, Plan, PlanPrinter, Wakefulness, describe};
pub use planner::{Planner, PlannerHook, PlannerStats, PlanningEvent};
pub use problem::{Alignment, Problem, ProblemBuilder, ProblemHash, ProblemKind};
pub use solver::{
    Applicability, Backends, PlanContext, Registry, RegistryBuilder, SolveFailure, Solver,
    SolverId, build_registry,
};
pub use tensor::{IoDim, Tensor};
pub use wisdom::{Amnesia, ImportReport, Verdict, Wisdom};

/// FFT normalization modes matching SciPy/PocketFFT conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    Forward,
    #[default]
    Backward,
    Ortho,
}

/// One-shot transform entrypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Fft,
    Ifft,
    Rfft,
    Irfft,
    Fft2,
    Ifft2,
    Fftn,
}

impl TransformKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fft => "fft",
            Self::Ifft => "ifft",
            Self::Rfft => "rfft",
            Self::Irfft => "irfft",
            Self::Fft2 => "fft2",
            Self::Ifft2 => "ifft2",
            Self::Fftn => "fftn",
        }
    }
}
