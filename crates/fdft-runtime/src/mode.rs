#![forbid(unsafe_code)]

//! Runtime mode definitions for Strict and Hardened operation.

use serde::{Deserialize, Serialize};

/// Operational mode governing how much input validation runs before a transform.
///
/// - **Strict**: Validate shapes and buffer layouts only; sample values are
///   passed through untouched, NaN and infinity included.
/// - **Hardened**: Additionally reject non-finite samples before any plan is
///   executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RuntimeMode {
    #[default]
    Strict,
    Hardened,
}

impl RuntimeMode {
    /// Whether non-finite samples must be rejected under this mode.
    #[must_use]
    pub const fn rejects_non_finite(self) -> bool {
        matches!(self, Self::Hardened)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Hardened => "Hardened",
        }
    }
}
