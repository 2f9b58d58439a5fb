//! Public entry points: plan constructors over the shared planner and
//! one-shot transforms.
//!
//! Every function here plans through one process-wide [`Planner`], so
//! wisdom accumulated by plan constructors and one-shot calls is shared and
//! can be exported with [`export_wisdom_to_string`].

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Instant;

use fdft_runtime::RuntimeMode;
use serde::Serialize;

use crate::config::PlannerConfig;
use crate::error::FftError;
use crate::flags::PlannerFlags;
use crate::plan::FftPlan;
use crate::planner::Planner;
use crate::problem::{Problem, ProblemKind};
use crate::tensor::{IoDim, Tensor};
use crate::wisdom::{Amnesia, ImportReport};
use crate::{Normalization, TransformKind};

/// Complex sample as `(re, im)`.
pub type Complex64 = (f64, f64);

/// Worker control policy for transform execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerPolicy {
    /// Single worker.
    #[default]
    Auto,
    /// Require an exact worker count.
    Exact(usize),
    /// Upper-bound worker count, capped by the available parallelism.
    Max(usize),
}

/// Common options shared by the one-shot transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FftOptions {
    pub mode: RuntimeMode,
    pub normalization: Normalization,
    pub workers: WorkerPolicy,
    pub check_finite: bool,
    pub planner_flags: PlannerFlags,
}

impl Default for FftOptions {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Strict,
            normalization: Normalization::Backward,
            workers: WorkerPolicy::Auto,
            check_finite: false,
            planner_flags: PlannerFlags::ESTIMATE,
        }
    }
}

impl FftOptions {
    #[must_use]
    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: WorkerPolicy) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_check_finite(mut self, check_finite: bool) -> Self {
        self.check_finite = check_finite;
        self
    }

    #[must_use]
    pub fn with_planner_flags(mut self, flags: PlannerFlags) -> Self {
        self.planner_flags = flags;
        self
    }
}

/// Whether a constructed plan writes over its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    #[default]
    OutOfPlace,
    InPlace,
}

impl Placement {
    #[must_use]
    pub const fn is_in_place(self) -> bool {
        matches!(self, Self::InPlace)
    }
}

/// Layout of a batch of equally shaped transforms, strides in elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManyLayout {
    pub howmany: usize,
    pub istride: usize,
    pub idist: usize,
    pub ostride: usize,
    pub odist: usize,
}

impl ManyLayout {
    /// `howmany` contiguous transforms of `dims`, packed back to back.
    #[must_use]
    pub fn contiguous(dims: &[usize], howmany: usize) -> Self {
        let dist = dims.iter().product();
        Self {
            howmany,
            istride: 1,
            idist: dist,
            ostride: 1,
            odist: dist,
        }
    }
}

/// One executed one-shot transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformTrace {
    pub operation_id: String,
    pub kind: TransformKind,
    pub direction: &'static str,
    pub n: usize,
    /// Plan tree rendering; equal trees render equal.
    pub plan: String,
    pub wisdom_hit: bool,
    pub mode: RuntimeMode,
    pub timing_ns: u128,
}

impl TransformTrace {
    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

static SHARED_PLANNER: OnceLock<Mutex<Planner>> = OnceLock::new();
static TRACE_LOG: OnceLock<Mutex<Vec<TransformTrace>>> = OnceLock::new();
static OPERATION_COUNTER: AtomicU64 = AtomicU64::new(1);

fn shared_planner() -> &'static Mutex<Planner> {
    SHARED_PLANNER.get_or_init(|| {
        Mutex::new(Planner::new(
            PlannerConfig::default().with_flags(PlannerFlags::ESTIMATE),
        ))
    })
}

/// Run `f` against the shared planner. A poisoned lock is recovered; the
/// planner holds no invariant a panicking solver could break halfway.
pub fn with_shared_planner<R>(f: impl FnOnce(&mut Planner) -> R) -> R {
    let mut planner = shared_planner()
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    f(&mut planner)
}

fn trace_log() -> &'static Mutex<Vec<TransformTrace>> {
    TRACE_LOG.get_or_init(|| Mutex::new(Vec::new()))
}

fn next_operation_id() -> String {
    let next = OPERATION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("fft-op-{next:016x}")
}

fn record_trace(
    kind: TransformKind,
    inverse: bool,
    n: usize,
    plan: &FftPlan,
    mode: RuntimeMode,
    started: Instant,
) {
    let trace = TransformTrace {
        operation_id: next_operation_id(),
        kind,
        direction: if inverse { "inverse" } else { "forward" },
        n,
        plan: plan.describe(),
        wisdom_hit: plan.wisdom_hit(),
        mode,
        timing_ns: started.elapsed().as_nanos(),
    };
    if let Ok(mut log) = trace_log().lock() {
        log.push(trace);
    }
}

#[must_use]
pub fn take_transform_traces() -> Vec<TransformTrace> {
    if let Ok(mut log) = trace_log().lock() {
        return std::mem::take(&mut *log);
    }
    Vec::new()
}

#[must_use]
pub fn export_wisdom_to_string() -> String {
    with_shared_planner(|planner| planner.export_wisdom())
}

pub fn import_wisdom_from_string(text: &str) -> ImportReport {
    with_shared_planner(|planner| planner.import_wisdom(text))
}

pub fn export_wisdom_to_file(path: impl AsRef<Path>) -> Result<(), FftError> {
    with_shared_planner(|planner| planner.export_wisdom_to_file(path))
}

pub fn import_wisdom_from_file(path: impl AsRef<Path>) -> Result<ImportReport, FftError> {
    with_shared_planner(|planner| planner.import_wisdom_from_file(path))
}

pub fn forget_wisdom() {
    with_shared_planner(|planner| planner.forget_wisdom(Amnesia::Everything));
}

/// Plan an arbitrary problem on the shared planner.
pub fn plan_guru(problem: &Problem, flags: PlannerFlags) -> Result<FftPlan, FftError> {
    with_shared_planner(|planner| planner.plan_with_flags(problem, flags))
}

pub fn plan_dft_1d(
    n: usize,
    sign: i32,
    placement: Placement,
    flags: PlannerFlags,
) -> Result<FftPlan, FftError> {
    plan_dft(&[n], sign, placement, flags)
}

/// Contiguous row-major complex DFT over `dims`.
pub fn plan_dft(
    dims: &[usize],
    sign: i32,
    placement: Placement,
    flags: PlannerFlags,
) -> Result<FftPlan, FftError> {
    let problem = Problem::builder(ProblemKind::Dft)
        .dims(Tensor::rowmajor(dims, 1, 1).dims())
        .sign(sign)
        .in_place(placement.is_in_place())
        .build()?;
    plan_guru(&problem, flags)
}

/// `layout.howmany` complex DFTs over `dims`.
pub fn plan_many_dft(
    dims: &[usize],
    layout: &ManyLayout,
    sign: i32,
    placement: Placement,
    flags: PlannerFlags,
) -> Result<FftPlan, FftError> {
    let problem = Problem::builder(ProblemKind::Dft)
        .dims(Tensor::rowmajor(dims, layout.istride, layout.ostride).dims())
        .vector_dims(&[IoDim::new(layout.howmany, layout.idist, layout.odist)])
        .sign(sign)
        .in_place(placement.is_in_place())
        .build()?;
    plan_guru(&problem, flags)
}

pub fn plan_r2r_1d(
    n: usize,
    kind: ProblemKind,
    placement: Placement,
    flags: PlannerFlags,
) -> Result<FftPlan, FftError> {
    plan_r2r(&[n], kind, placement, flags)
}

/// Separable real transform of one `kind` along every dimension.
pub fn plan_r2r(
    dims: &[usize],
    kind: ProblemKind,
    placement: Placement,
    flags: PlannerFlags,
) -> Result<FftPlan, FftError> {
    if kind.is_complex() {
        return Err(FftError::InvalidShape {
            detail: "r2r plans take a real transform kind",
        });
    }
    let problem = Problem::builder(kind)
        .dims(Tensor::rowmajor(dims, 1, 1).dims())
        .in_place(placement.is_in_place())
        .build()?;
    plan_guru(&problem, flags)
}

/// 1D forward complex FFT.
pub fn fft(input: &[Complex64], options: &FftOptions) -> Result<Vec<Complex64>, FftError> {
    ensure_non_empty(input.len())?;
    run_complex(TransformKind::Fft, input, &[input.len()], options, false)
}

/// 1D inverse complex FFT.
pub fn ifft(input: &[Complex64], options: &FftOptions) -> Result<Vec<Complex64>, FftError> {
    ensure_non_empty(input.len())?;
    run_complex(TransformKind::Ifft, input, &[input.len()], options, true)
}

/// 1D real-input FFT; returns the `n / 2 + 1` non-negative frequencies.
pub fn rfft(input: &[f64], options: &FftOptions) -> Result<Vec<Complex64>, FftError> {
    let n = input.len();
    ensure_non_empty(n)?;
    let nthreads = resolve_workers(options.workers)?;
    validate_finite_real(input, options)?;

    let mut signal = input.to_vec();
    let mut halfcomplex = vec![0.0; n];
    let problem = Problem::builder(ProblemKind::R2hc)
        .dims(&[IoDim::new(n, 1, 1)])
        .with_buffers(&signal, Some(&halfcomplex))
        .build()?;

    let started = Instant::now();
    let plan = plan_shared(&problem, options.planner_flags, nthreads)?;
    plan.execute(&mut signal, &mut halfcomplex)?;
    record_trace(TransformKind::Rfft, false, n, &plan, options.mode, started);

    let scale = normalization_scale(options.normalization, n, false);
    Ok((0..=n / 2)
        .map(|k| {
            let im = if k > 0 && k < n - k { halfcomplex[n - k] } else { 0.0 };
            (halfcomplex[k] * scale, im * scale)
        })
        .collect())
}

/// 1D inverse real FFT. `output_len` defaults to `2 * (input.len() - 1)`.
pub fn irfft(
    input: &[Complex64],
    output_len: Option<usize>,
    options: &FftOptions,
) -> Result<Vec<f64>, FftError> {
    ensure_non_empty(input.len())?;
    let nthreads = resolve_workers(options.workers)?;
    validate_finite_complex(input, options)?;

    let n = output_len.unwrap_or_else(|| input.len().saturating_sub(1).saturating_mul(2));
    if n == 0 {
        return Err(FftError::InvalidShape {
            detail: "output_len cannot be zero",
        });
    }
    let expected_len = n / 2 + 1;
    if input.len() != expected_len {
        return Err(FftError::LengthMismatch {
            expected: expected_len,
            actual: input.len(),
        });
    }

    // DC and Nyquist imaginary parts are dropped.
    let mut halfcomplex = vec![0.0; n];
    for (k, &(re, _)) in input.iter().enumerate() {
        halfcomplex[k] = re;
    }
    for k in 1..n.div_ceil(2) {
        halfcomplex[n - k] = input[k].1;
    }
    let mut signal = vec![0.0; n];
    let problem = Problem::builder(ProblemKind::Hc2r)
        .dims(&[IoDim::new(n, 1, 1)])
        .with_buffers(&halfcomplex, Some(&signal))
        .build()?;

    let started = Instant::now();
    let plan = plan_shared(&problem, options.planner_flags, nthreads)?;
    plan.execute(&mut halfcomplex, &mut signal)?;
    record_trace(TransformKind::Irfft, true, n, &plan, options.mode, started);

    scale_all(&mut signal, normalization_scale(options.normalization, n, true));
    Ok(signal)
}

/// 2D forward complex FFT over a row-major `shape`.
pub fn fft2(
    input: &[Complex64],
    shape: (usize, usize),
    options: &FftOptions,
) -> Result<Vec<Complex64>, FftError> {
    run_complex(TransformKind::Fft2, input, &[shape.0, shape.1], options, false)
}

/// 2D inverse complex FFT over a row-major `shape`.
pub fn ifft2(
    input: &[Complex64],
    shape: (usize, usize),
    options: &FftOptions,
) -> Result<Vec<Complex64>, FftError> {
    run_complex(TransformKind::Ifft2, input, &[shape.0, shape.1], options, true)
}

/// N-dimensional forward complex FFT over a row-major `shape`.
pub fn fftn(
    input: &[Complex64],
    shape: &[usize],
    options: &FftOptions,
) -> Result<Vec<Complex64>, FftError> {
    run_complex(TransformKind::Fftn, input, shape, options, false)
}

fn run_complex(
    kind: TransformKind,
    input: &[Complex64],
    shape: &[usize],
    options: &FftOptions,
    inverse: bool,
) -> Result<Vec<Complex64>, FftError> {
    validate_shape(shape)?;
    let n = checked_product(shape).ok_or(FftError::InvalidShape {
        detail: "nd shape product overflow",
    })?;
    if input.len() != n {
        return Err(FftError::LengthMismatch {
            expected: n,
            actual: input.len(),
        });
    }
    let nthreads = resolve_workers(options.workers)?;
    validate_finite_complex(input, options)?;

    let mut data = input.iter().flat_map(|&(re, im)| [re, im]).collect::<Vec<_>>();
    let mut spectrum = vec![0.0; 2 * n];
    let problem = Problem::builder(ProblemKind::Dft)
        .dims(Tensor::rowmajor(shape, 1, 1).dims())
        .sign(if inverse { 1 } else { -1 })
        .with_buffers(&data, Some(&spectrum))
        .build()?;

    let started = Instant::now();
    let plan = plan_shared(&problem, options.planner_flags, nthreads)?;
    plan.execute(&mut data, &mut spectrum)?;
    record_trace(kind, inverse, n, &plan, options.mode, started);

    scale_all(&mut spectrum, normalization_scale(options.normalization, n, inverse));
    Ok(spectrum.chunks_exact(2).map(|c| (c[0], c[1])).collect())
}

/// Plan on the shared planner with a per-call thread count.
fn plan_shared(problem: &Problem, flags: PlannerFlags, nthreads: usize) -> Result<FftPlan, FftError> {
    with_shared_planner(|planner| {
        let saved = planner.config().clone();
        planner.set_config(saved.clone().with_nthreads(nthreads));
        let result = planner.plan_with_flags(problem, flags);
        planner.set_config(saved);
        result
    })
}

fn resolve_workers(policy: WorkerPolicy) -> Result<usize, FftError> {
    match policy {
        WorkerPolicy::Auto => Ok(1),
        WorkerPolicy::Exact(0) | WorkerPolicy::Max(0) => {
            Err(FftError::InvalidWorkers { requested: 0 })
        }
        WorkerPolicy::Exact(k) => Ok(k),
        WorkerPolicy::Max(k) => {
            let available = std::thread::available_parallelism().map_or(1, |n| n.get());
            Ok(k.min(available))
        }
    }
}

fn validate_shape(shape: &[usize]) -> Result<(), FftError> {
    if shape.is_empty() {
        return Err(FftError::InvalidShape {
            detail: "nd shape cannot be empty",
        });
    }
    if shape.contains(&0) {
        return Err(FftError::InvalidShape {
            detail: "nd shape dimensions must be greater than zero",
        });
    }
    Ok(())
}

fn checked_product(shape: &[usize]) -> Option<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &next| acc.checked_mul(next))
}

fn validate_finite_complex(input: &[Complex64], options: &FftOptions) -> Result<(), FftError> {
    let should_check = options.check_finite || options.mode.rejects_non_finite();
    if should_check
        && input
            .iter()
            .any(|&(re, im)| !re.is_finite() || !im.is_finite())
    {
        return Err(FftError::NonFiniteInput);
    }
    Ok(())
}

fn validate_finite_real(input: &[f64], options: &FftOptions) -> Result<(), FftError> {
    let should_check = options.check_finite || options.mode.rejects_non_finite();
    if should_check && input.iter().any(|value| !value.is_finite()) {
        return Err(FftError::NonFiniteInput);
    }
    Ok(())
}

fn ensure_non_empty(len: usize) -> Result<(), FftError> {
    if len == 0 {
        return Err(FftError::InvalidShape {
            detail: "input length must be greater than zero",
        });
    }
    Ok(())
}

fn normalization_scale(normalization: Normalization, n: usize, inverse: bool) -> f64 {
    let n = n as f64;
    match (normalization, inverse) {
        (Normalization::Backward, true) | (Normalization::Forward, false) => 1.0 / n,
        (Normalization::Backward, false) | (Normalization::Forward, true) => 1.0,
        (Normalization::Ortho, _) => 1.0 / n.sqrt(),
    }
}

fn scale_all(data: &mut [f64], scale: f64) {
    if (scale - 1.0).abs() <= f64::EPSILON {
        return;
    }
    for value in data.iter_mut() {
        *value *= scale;
    }
}
