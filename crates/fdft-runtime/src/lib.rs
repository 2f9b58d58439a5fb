#![forbid(unsafe_code)]

//! fdft runtime: execution modes, bounded evidence ledgers and the shared
//! structured-logging and assertion helpers used by every test suite in
//! the workspace.
//!
//! ## Module layout
//!
//! | Module   | Contents                                            |
//! |----------|-----------------------------------------------------|
//! | `mode`   | [`RuntimeMode`] enum (Strict / Hardened)            |
//! | `ledger` | [`EvidenceLedger`], a bounded FIFO of audit records |

pub mod ledger;
pub mod mode;

pub use ledger::EvidenceLedger;
pub use mode::RuntimeMode;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Wall-clock timestamp for log and evidence records.
#[must_use]
pub fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

// ═══════════════════════════════════════════════════════════════════
// Test Helpers: shared assertion and logging utilities
// ═══════════════════════════════════════════════════════════════════

/// Structured test log entry for forensic comparison across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestLogEntry {
    pub test_id: String,
    pub timestamp_ms: u64,
    pub level: TestLogLevel,
    pub module: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RuntimeMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_refs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestLogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    Pass,
    Fail,
    Skip,
    Warn,
}

impl TestLogEntry {
    #[must_use]
    pub fn new(
        test_id: impl Into<String>,
        module: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            timestamp_ms: now_unix_ms(),
            level: TestLogLevel::Info,
            module: module.into(),
            message: message.into(),
            seed: None,
            fixture_id: None,
            mode: None,
            result: None,
            artifact_refs: None,
        }
    }

    #[must_use]
    pub fn with_result(mut self, result: TestResult) -> Self {
        self.result = Some(result);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_fixture(mut self, fixture_id: impl Into<String>) -> Self {
        self.fixture_id = Some(fixture_id.into());
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: TestLogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact_refs
            .get_or_insert_with(Vec::new)
            .push(artifact.into());
        self
    }

    /// Serialize to JSON line for structured logging.
    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Assert two f64 values are close within combined absolute and relative tolerance.
///
/// Uses the formula: |actual - expected| <= atol + rtol * |expected|
///
pub fn assert_close(actual: f64, expected: f64, atol: f64, rtol: f64) {
    let tol = atol + rtol * expected.abs();
    assert!(
        (actual - expected).abs() <= tol,
        "assert_close failed: actual={actual} expected={expected} diff={} tol={tol} (atol={atol}, rtol={rtol})",
        (actual - expected).abs()
    );
}

/// Assert two f64 slices are element-wise close within tolerance.
pub fn assert_close_slice(actual: &[f64], expected: &[f64], atol: f64, rtol: f64) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "assert_close_slice: length mismatch: actual={} expected={}",
        actual.len(),
        expected.len()
    );
    for (idx, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        let tol = atol + rtol * e.abs();
        assert!(
            (a - e).abs() <= tol,
            "assert_close_slice[{idx}]: actual={a} expected={e} diff={} tol={tol} (atol={atol}, rtol={rtol})",
            (a - e).abs()
        );
    }
}

/// Assert two interleaved complex slices are close, reporting the complex index on failure.
pub fn assert_close_complex(actual: &[f64], expected: &[f64], atol: f64, rtol: f64) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "assert_close_complex: length mismatch: actual={} expected={}",
        actual.len(),
        expected.len()
    );
    for (idx, (a, e)) in actual.chunks(2).zip(expected.chunks(2)).enumerate() {
        for (part, (av, ev)) in ["re", "im"].iter().zip(a.iter().zip(e.iter())) {
            let tol = atol + rtol * ev.abs();
            assert!(
                (av - ev).abs() <= tol,
                "assert_close_complex[{idx}].{part}: actual={av} expected={ev} diff={} tol={tol}",
                (av - ev).abs()
            );
        }
    }
}

/// Largest absolute element-wise difference; `f64::INFINITY` on length mismatch.
#[must_use]
pub fn max_abs_diff(actual: &[f64], expected: &[f64]) -> f64 {
    if actual.len() != expected.len() {
        return f64::INFINITY;
    }
    actual
        .iter()
        .zip(expected)
        .map(|(a, e)| (a - e).abs())
        .fold(0.0, f64::max)
}

/// Check if a value is within absolute tolerance of expected.
#[must_use]
pub fn within_tolerance(actual: f64, expected: f64, atol: f64, rtol: f64) -> bool {
    let tol = atol + rtol * expected.abs();
    (actual - expected).abs() <= tol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_is_bounded() {
        let mut ledger = EvidenceLedger::new(2);
        for i in 0..4 {
            ledger.record(i);
        }
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.latest(), Some(&3));
        assert_eq!(ledger.total_recorded(), 4);
        assert_eq!(ledger.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn ledger_zero_capacity_keeps_one_entry() {
        let mut ledger = EvidenceLedger::new(0);
        assert_eq!(ledger.capacity(), 1);
        ledger.record("a");
        ledger.record("b");
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.latest(), Some(&"b"));
    }

    #[test]
    fn ledger_drain_empties_but_keeps_total() {
        let mut ledger = EvidenceLedger::new(8);
        ledger.record(1u32);
        ledger.record(2u32);
        assert_eq!(ledger.drain(), vec![1, 2]);
        assert!(ledger.is_empty());
        assert_eq!(ledger.total_recorded(), 2);
    }

    #[test]
    fn ledger_jsonl_has_one_line_per_entry() {
        let mut ledger = EvidenceLedger::new(4);
        ledger.record(serde_json::json!({"event": "a"}));
        ledger.record(serde_json::json!({"event": "b"}));
        let jsonl = ledger.serialize_jsonl();
        assert_eq!(jsonl.lines().count(), 2);
        for line in jsonl.lines() {
            let _: serde_json::Value = serde_json::from_str(line).expect("valid json line");
        }
    }

    #[test]
    fn hardened_mode_rejects_non_finite() {
        assert!(RuntimeMode::Hardened.rejects_non_finite());
        assert!(!RuntimeMode::Strict.rejects_non_finite());
        assert_eq!(RuntimeMode::default(), RuntimeMode::Strict);
    }

    #[test]
    fn test_log_entry_serializes_optional_fields_only_when_set() {
        let bare = TestLogEntry::new("t-1", "fdft_runtime::tests", "bare").to_json_line();
        assert!(!bare.contains("seed"));
        let full = TestLogEntry::new("t-2", "fdft_runtime::tests", "full")
            .with_seed(7)
            .with_mode(RuntimeMode::Hardened)
            .with_fixture("fixture-a")
            .with_result(TestResult::Pass)
            .with_level(TestLogLevel::Debug)
            .with_artifact("report.json")
            .to_json_line();
        let v: serde_json::Value = serde_json::from_str(&full).expect("valid json");
        assert_eq!(v["seed"], 7);
        assert_eq!(v["result"], "pass");
        assert_eq!(v["level"], "debug");
        assert_eq!(v["artifact_refs"][0], "report.json");
    }

    #[test]
    fn within_tolerance_uses_combined_bound() {
        assert!(within_tolerance(1.0 + 1e-10, 1.0, 1e-12, 1e-9));
        assert!(!within_tolerance(1.1, 1.0, 1e-12, 1e-9));
    }

    #[test]
    fn assert_close_complex_accepts_matching_pairs() {
        assert_close_complex(&[1.0, -2.0, 0.5, 0.0], &[1.0, -2.0, 0.5, 1e-13], 1e-12, 0.0);
    }

    #[test]
    #[should_panic(expected = "assert_close_complex[1].im")]
    fn assert_close_complex_reports_index_and_part() {
        assert_close_complex(&[1.0, 0.0, 0.0, 1.0], &[1.0, 0.0, 0.0, 0.0], 1e-12, 0.0);
    }

    #[test]
    fn max_abs_diff_flags_length_mismatch() {
        assert_eq!(max_abs_diff(&[1.0], &[1.0, 2.0]), f64::INFINITY);
        assert!((max_abs_diff(&[1.0, 2.5], &[1.0, 2.0]) - 0.5).abs() < 1e-15);
    }
}
