use std::path::PathBuf;

use thiserror::Error;

use crate::problem::ProblemKind;

/// Errors surfaced by problem construction, planning and execution.
#[derive(Debug, Error)]
pub enum FftError {
    #[error("invalid shape: {detail}")]
    InvalidShape { detail: &'static str },
    #[error("no plan found for {kind} problem: {detail}")]
    NoPlanFound { kind: ProblemKind, detail: String },
    #[error("wisdom corrupt at line {line}: {reason}")]
    WisdomCorrupt { line: usize, reason: String },
    #[error("resource exhausted: requested {requested_bytes} bytes, limit {limit_bytes}")]
    ResourceExhausted {
        requested_bytes: usize,
        limit_bytes: usize,
    },
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("buffer mismatch: {detail}")]
    BufferMismatch { detail: &'static str },
    #[error("plan is asleep; wake it before executing")]
    PlanAsleep,
    #[error("invalid worker count: {requested}")]
    InvalidWorkers { requested: usize },
    #[error("non-finite input rejected by policy")]
    NonFiniteInput,
    #[error("wisdom i/o failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::FftError;
    use crate::problem::ProblemKind;

    #[test]
    fn display_carries_structured_detail() {
        let err = FftError::LengthMismatch {
            expected: 8,
            actual: 6,
        };
        assert_eq!(err.to_string(), "length mismatch: expected 8, got 6");

        let err = FftError::NoPlanFound {
            kind: ProblemKind::Redft10,
            detail: "search exhausted".into(),
        };
        assert!(err.to_string().contains("redft10"));
    }

    #[test]
    fn io_error_exposes_source() {
        use std::error::Error as _;
        let err = FftError::Io {
            path: "/nonexistent/wisdom".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.source().is_some());
    }
}
