#![forbid(unsafe_code)]

//! Differential conformance harness for fdft.
//!
//! Fixtures are JSON packets of transform cases. Each case is planned and
//! executed through a [`Planner`] and compared against the quadratic
//! reference in [`oracle`]. Reports carry a blake3 digest of their case
//! results so two runs can be compared byte for byte.

pub mod oracle;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fdft::{
    FftError, IoDim, Planner, PlannerConfig, PlannerFlags, Problem, ProblemFlags, ProblemKind,
};
use fdft_runtime::now_unix_ms;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub fixture_root: PathBuf,
    pub artifact_root: PathBuf,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        Self {
            fixture_root: manifest.join("fixtures"),
            artifact_root: manifest.join("fixtures").join("artifacts"),
        }
    }

    #[must_use]
    pub fn fixture_path(&self, name: &str) -> PathBuf {
        self.fixture_root.join(name)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("fixture load failed for {path}: {source}")]
    FixtureIo { path: PathBuf, source: io::Error },
    #[error("fixture parse failed for {path}: {source}")]
    FixtureParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unknown planner flag `{0}`")]
    UnknownFlag(String),
    #[error("artifact write failed for {path}: {source}")]
    ArtifactIo { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectedOutcome {
    /// Planned output matches the reference within the case tolerances.
    Ok,
    /// Planning or execution fails with the named error.
    Error { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformCase {
    pub case_id: String,
    pub kind: ProblemKind,
    pub n: usize,
    #[serde(default = "default_sign")]
    pub sign: i32,
    #[serde(default = "default_howmany")]
    pub howmany: usize,
    #[serde(default)]
    pub in_place: bool,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub problem_flags: Vec<String>,
    pub seed: u64,
    pub atol: f64,
    pub rtol: f64,
    pub expected: ExpectedOutcome,
}

const fn default_sign() -> i32 {
    -1
}

const fn default_howmany() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformFixture {
    pub packet_id: String,
    pub family: String,
    pub cases: Vec<TransformCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToleranceUsed {
    pub atol: f64,
    pub rtol: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DifferentialCaseResult {
    pub case_id: String,
    pub passed: bool,
    pub message: String,
    /// `None` when the case expected an error.
    pub max_diff: Option<f64>,
    pub tolerance_used: Option<ToleranceUsed>,
    /// Rendering of the executed plan tree.
    pub plan: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConformanceReport {
    pub packet_id: String,
    pub family: String,
    pub pass_count: usize,
    pub fail_count: usize,
    pub per_case_results: Vec<DifferentialCaseResult>,
    pub wisdom_entries: usize,
    /// blake3 of the serialized case results.
    pub results_hash: String,
    pub generated_unix_ms: u64,
}

impl ConformanceReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.fail_count == 0
    }
}

/// Union of the named planner flags.
pub fn parse_planner_flags(names: &[String]) -> Result<PlannerFlags, HarnessError> {
    names.iter().try_fold(PlannerFlags::MEASURE, |acc, name| {
        PlannerFlags::from_name(name)
            .map(|flag| acc | flag)
            .ok_or_else(|| HarnessError::UnknownFlag(name.clone()))
    })
}

fn parse_problem_flags(names: &[String]) -> Result<ProblemFlags, HarnessError> {
    let mut flags = ProblemFlags::empty();
    for name in names {
        let flag = match name.as_str() {
            "DESTROY_INPUT" => ProblemFlags::DESTROY_INPUT,
            "PRESERVE_INPUT" => ProblemFlags::PRESERVE_INPUT,
            "TRANSPOSED_OUT" => ProblemFlags::TRANSPOSED_OUT,
            _ => return Err(HarnessError::UnknownFlag(name.clone())),
        };
        flags.insert(flag);
    }
    Ok(flags)
}

/// Stable tag for an error, as written in fixtures.
#[must_use]
pub fn error_tag(err: &FftError) -> &'static str {
    match err {
        FftError::InvalidShape { .. } => "invalid_shape",
        FftError::NoPlanFound { .. } => "no_plan_found",
        FftError::WisdomCorrupt { .. } => "wisdom_corrupt",
        FftError::ResourceExhausted { .. } => "resource_exhausted",
        FftError::LengthMismatch { .. } => "length_mismatch",
        FftError::BufferMismatch { .. } => "buffer_mismatch",
        FftError::PlanAsleep => "plan_asleep",
        FftError::InvalidWorkers { .. } => "invalid_workers",
        FftError::NonFiniteInput => "non_finite_input",
        FftError::Io { .. } => "io",
    }
}

/// Deterministic samples in `[-1, 1)` drawn from the blake3 output stream
/// keyed by `seed`.
#[must_use]
pub fn sample_input(seed: u64, len: usize) -> Vec<f64> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"fdft-conformance-samples");
    hasher.update(&seed.to_le_bytes());
    let mut stream = hasher.finalize_xof();
    let mut bytes = [0u8; 8];
    (0..len)
        .map(|_| {
            stream.fill(&mut bytes);
            let bits = u64::from_le_bytes(bytes) >> 11;
            (bits as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
        })
        .collect()
}

pub fn load_fixture(path: &Path) -> Result<TransformFixture, HarnessError> {
    let raw = fs::read_to_string(path).map_err(|source| HarnessError::FixtureIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| HarnessError::FixtureParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and run a fixture file with a fresh planner.
pub fn run_differential_test(path: &Path) -> Result<ConformanceReport, HarnessError> {
    let fixture = load_fixture(path)?;
    let mut planner = Planner::new(PlannerConfig::default());
    run_fixture(&fixture, &mut planner)
}

/// Run every case of `fixture` through one planner, so later cases may be
/// answered from wisdom gathered by earlier ones.
pub fn run_fixture(
    fixture: &TransformFixture,
    planner: &mut Planner,
) -> Result<ConformanceReport, HarnessError> {
    let mut results = Vec::with_capacity(fixture.cases.len());
    for case in &fixture.cases {
        results.push(run_case(case, planner)?);
    }
    let pass_count = results.iter().filter(|r| r.passed).count();
    let results_hash = match serde_json::to_vec(&results) {
        Ok(bytes) => blake3::hash(&bytes).to_hex().to_string(),
        Err(_) => String::new(),
    };
    Ok(ConformanceReport {
        packet_id: fixture.packet_id.clone(),
        family: fixture.family.clone(),
        pass_count,
        fail_count: results.len() - pass_count,
        per_case_results: results,
        wisdom_entries: planner.wisdom().len(),
        results_hash,
        generated_unix_ms: now_unix_ms(),
    })
}

/// Write `report` as pretty JSON under `dir`, named after the packet.
pub fn write_report(report: &ConformanceReport, dir: &Path) -> Result<PathBuf, HarnessError> {
    let path = dir.join(format!("{}.report.json", report.packet_id));
    let artifact_err = |source: io::Error| HarnessError::ArtifactIo {
        path: path.clone(),
        source,
    };
    fs::create_dir_all(dir).map_err(artifact_err)?;
    let json = serde_json::to_string_pretty(report).map_err(io::Error::other).map_err(artifact_err)?;
    fs::write(&path, json).map_err(artifact_err)?;
    Ok(path)
}

fn case_problem(case: &TransformCase, flags: ProblemFlags) -> Result<Problem, FftError> {
    let mut builder = Problem::builder(case.kind)
        .dims(&[IoDim::new(case.n, 1, 1)])
        .in_place(case.in_place)
        .flags(flags);
    if case.kind.is_complex() {
        builder = builder.sign(case.sign);
    }
    if case.howmany > 1 {
        builder = builder.vector_dims(&[IoDim::new(case.howmany, case.n, case.n)]);
    }
    builder.build()
}

fn execute_case(
    case: &TransformCase,
    planner: &mut Planner,
    flags: PlannerFlags,
    problem_flags: ProblemFlags,
) -> Result<(Vec<f64>, Vec<f64>, String), FftError> {
    let problem = case_problem(case, problem_flags)?;
    let plan = planner.plan_with_flags(&problem, flags)?;
    let width = case.kind.element_width();
    let input = sample_input(case.seed, width * case.n * case.howmany);
    let output = if case.in_place {
        let mut data = input.clone();
        plan.execute_in_place(&mut data)?;
        data
    } else {
        let mut scratch = input.clone();
        let mut out = vec![0.0; input.len()];
        plan.execute(&mut scratch, &mut out)?;
        out
    };
    Ok((input, output, plan.describe()))
}

fn run_case(case: &TransformCase, planner: &mut Planner) -> Result<DifferentialCaseResult, HarnessError> {
    let flags = parse_planner_flags(&case.flags)?;
    let problem_flags = parse_problem_flags(&case.problem_flags)?;
    let outcome = execute_case(case, planner, flags, problem_flags);

    let result = match (&case.expected, outcome) {
        (ExpectedOutcome::Ok, Ok((input, output, plan))) => {
            let width = case.kind.element_width() * case.n;
            let expected = input
                .chunks(width)
                .flat_map(|batch| oracle::reference(case.kind, case.sign, batch))
                .collect::<Vec<_>>();
            let max_diff = fdft_runtime::max_abs_diff(&output, &expected);
            let passed = output
                .iter()
                .zip(&expected)
                .all(|(&a, &e)| fdft_runtime::within_tolerance(a, e, case.atol, case.rtol));
            DifferentialCaseResult {
                case_id: case.case_id.clone(),
                passed,
                message: if passed {
                    "matches reference".into()
                } else {
                    format!("max_diff {max_diff:e} exceeds tolerance")
                },
                max_diff: Some(max_diff),
                tolerance_used: Some(ToleranceUsed {
                    atol: case.atol,
                    rtol: case.rtol,
                }),
                plan: Some(plan),
            }
        }
        (ExpectedOutcome::Ok, Err(err)) => failed(case, format!("unexpected error: {err}")),
        (ExpectedOutcome::Error { error }, Err(err)) => {
            let tag = error_tag(&err);
            DifferentialCaseResult {
                case_id: case.case_id.clone(),
                passed: tag == error.as_str(),
                message: format!("error {tag}"),
                max_diff: None,
                tolerance_used: None,
                plan: None,
            }
        }
        (ExpectedOutcome::Error { error }, Ok(_)) => {
            failed(case, format!("expected error {error}, transform succeeded"))
        }
    };
    Ok(result)
}

fn failed(case: &TransformCase, message: String) -> DifferentialCaseResult {
    DifferentialCaseResult {
        case_id: case.case_id.clone(),
        passed: false,
        message,
        max_diff: None,
        tolerance_used: None,
        plan: None,
    }
}
