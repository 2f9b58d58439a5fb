//! Planner and problem flag sets.
//!
//! Planner flags fall into three groups:
//!
//! | Group        | Flags                                                        |
//! |--------------|--------------------------------------------------------------|
//! | effort       | `ESTIMATE`, `PATIENT`, `EXHAUSTIVE` (none set means measure) |
//! | restrictions | `NO_SIMD`, `NO_UGLY`, `NO_INDIRECT`, `NO_BUFFERING`, `NO_RANK_SPLITS`, `NO_VRANK_SPLITS` |
//! | wisdom       | `WISDOM_ONLY`, `IGNORE_WISDOM`, internal `NO_SEARCH`         |
//!
//! Wisdom entries remember effort and restrictions; the wisdom group only
//! steers a single planning call.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::error::FftError;

/// Planning effort, ordered from least to most patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Effort {
    Estimate,
    Measure,
    Patient,
    Exhaustive,
}

/// Bit set of planner flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlannerFlags(u32);

const PLANNER_FLAG_NAMES: [(PlannerFlags, &str); 12] = [
    (PlannerFlags::ESTIMATE, "ESTIMATE"),
    (PlannerFlags::PATIENT, "PATIENT"),
    (PlannerFlags::EXHAUSTIVE, "EXHAUSTIVE"),
    (PlannerFlags::NO_SIMD, "NO_SIMD"),
    (PlannerFlags::NO_UGLY, "NO_UGLY"),
    (PlannerFlags::NO_INDIRECT, "NO_INDIRECT"),
    (PlannerFlags::NO_BUFFERING, "NO_BUFFERING"),
    (PlannerFlags::NO_RANK_SPLITS, "NO_RANK_SPLITS"),
    (PlannerFlags::NO_VRANK_SPLITS, "NO_VRANK_SPLITS"),
    (PlannerFlags::WISDOM_ONLY, "WISDOM_ONLY"),
    (PlannerFlags::IGNORE_WISDOM, "IGNORE_WISDOM"),
    (PlannerFlags::NO_SEARCH, "NO_SEARCH"),
];

impl PlannerFlags {
    /// Measure candidates by timing (the default effort).
    pub const MEASURE: Self = Self(0);
    pub const ESTIMATE: Self = Self(1 << 0);
    pub const PATIENT: Self = Self(1 << 1);
    pub const EXHAUSTIVE: Self = Self(1 << 2);
    pub const NO_SIMD: Self = Self(1 << 3);
    pub const NO_UGLY: Self = Self(1 << 4);
    pub const NO_INDIRECT: Self = Self(1 << 5);
    pub const NO_BUFFERING: Self = Self(1 << 6);
    pub const NO_RANK_SPLITS: Self = Self(1 << 7);
    pub const NO_VRANK_SPLITS: Self = Self(1 << 8);
    pub const WISDOM_ONLY: Self = Self(1 << 9);
    pub const IGNORE_WISDOM: Self = Self(1 << 10);
    /// Set by the planner while replaying wisdom; sub-problems must also
    /// come from wisdom.
    #[doc(hidden)]
    pub const NO_SEARCH: Self = Self(1 << 11);

    const EFFORT: Self = Self(Self::ESTIMATE.0 | Self::PATIENT.0 | Self::EXHAUSTIVE.0);
    const RESTRICTIONS: Self = Self(
        Self::NO_SIMD.0
            | Self::NO_UGLY.0
            | Self::NO_INDIRECT.0
            | Self::NO_BUFFERING.0
            | Self::NO_RANK_SPLITS.0
            | Self::NO_VRANK_SPLITS.0,
    );
    /// Restrictions that only narrow the search; a plan found without
    /// them is still a valid answer for a request that sets them.
    const IMPATIENCE: Self = Self(
        Self::NO_INDIRECT.0 | Self::NO_BUFFERING.0 | Self::NO_RANK_SPLITS.0 | Self::NO_VRANK_SPLITS.0,
    );
    const ALL: Self = Self((1 << 12) - 1);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Rebuild from raw bits; `None` if any unknown bit is set.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Validate and expand implied flags.
    ///
    /// `EXHAUSTIVE` implies `PATIENT`; `ESTIMATE` without `PATIENT` or
    /// `EXHAUSTIVE` implies `NO_INDIRECT | NO_VRANK_SPLITS | NO_RANK_SPLITS`.
    pub fn normalize(self) -> Result<Self, FftError> {
        if self.contains(Self::NO_UGLY | Self::EXHAUSTIVE) {
            return Err(FftError::InvalidShape {
                detail: "NO_UGLY contradicts EXHAUSTIVE",
            });
        }
        if self.contains(Self::WISDOM_ONLY | Self::IGNORE_WISDOM) {
            return Err(FftError::InvalidShape {
                detail: "WISDOM_ONLY contradicts IGNORE_WISDOM",
            });
        }
        let mut flags = self;
        if flags.contains(Self::EXHAUSTIVE) {
            flags.insert(Self::PATIENT);
        }
        if flags.contains(Self::ESTIMATE) && !flags.intersects(Self::PATIENT | Self::EXHAUSTIVE) {
            flags.insert(Self::NO_INDIRECT | Self::NO_VRANK_SPLITS | Self::NO_RANK_SPLITS);
        }
        Ok(flags)
    }

    #[must_use]
    pub const fn effort(self) -> Effort {
        if self.contains(Self::ESTIMATE) {
            Effort::Estimate
        } else if self.contains(Self::EXHAUSTIVE) {
            Effort::Exhaustive
        } else if self.contains(Self::PATIENT) {
            Effort::Patient
        } else {
            Effort::Measure
        }
    }

    #[must_use]
    pub const fn restrictions(self) -> Self {
        Self(self.0 & Self::RESTRICTIONS.0)
    }

    /// The part of the flags that wisdom entries remember.
    #[must_use]
    pub const fn wisdom_bits(self) -> Self {
        Self(self.0 & (Self::EFFORT.0 | Self::RESTRICTIONS.0))
    }

    /// Downgrade effort to estimate, keeping restrictions.
    #[must_use]
    pub const fn impatient(self) -> Self {
        Self((self.0 & !Self::EFFORT.0) | Self::ESTIMATE.0)
    }

    /// Whether a `Good` wisdom entry planned under `self` can answer a
    /// request planned under `request`. The entry must be at least as
    /// patient, must not have skipped anything the request would search,
    /// and must agree on `NO_SIMD`. A plan found under `NO_UGLY` answers
    /// any request, since the search tries that pass first; a request that
    /// sets `NO_UGLY` needs an entry that set it too.
    #[must_use]
    pub fn answers(self, request: Self) -> bool {
        self.effort() >= request.effort()
            && request.impatience_bits().contains(self.impatience_bits())
            && self.contains(Self::NO_SIMD) == request.contains(Self::NO_SIMD)
            && (self.contains(Self::NO_UGLY) || !request.contains(Self::NO_UGLY))
    }

    const fn impatience_bits(self) -> Self {
        Self(self.0 & Self::IMPATIENCE.0)
    }

    /// Whether a `Bad` wisdom entry recorded under `self` still rules a
    /// solver out under `request`: the request is at least as restricted.
    #[must_use]
    pub fn rules_out(self, request: Self) -> bool {
        request.restrictions().contains(self.restrictions())
    }

    /// Flag named as in its `Debug` rendering. `NO_SEARCH` is internal and
    /// has no public name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "MEASURE" {
            return Some(Self::MEASURE);
        }
        PLANNER_FLAG_NAMES
            .iter()
            .find(|(flag, n)| *n == name && *flag != Self::NO_SEARCH)
            .map(|(flag, _)| *flag)
    }
}

impl BitOr for PlannerFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for PlannerFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl BitAnd for PlannerFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for PlannerFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("MEASURE");
        }
        let names = PLANNER_FLAG_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>();
        f.write_str(&names.join(" | "))
    }
}

/// Bit set of problem flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemFlags(u8);

impl ProblemFlags {
    /// Plans may overwrite the input array.
    pub const DESTROY_INPUT: Self = Self(1 << 0);
    /// Plans must leave the input array untouched.
    pub const PRESERVE_INPUT: Self = Self(1 << 1);
    /// Store the first two output dimensions transposed.
    pub const TRANSPOSED_OUT: Self = Self(1 << 2);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for ProblemFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
