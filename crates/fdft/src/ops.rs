//! Floating-point operation counts used by the estimate cost model.

use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

/// Operation counts accumulated bottom-up through a plan tree.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OpCount {
    pub add: f64,
    pub mul: f64,
    pub fma: f64,
    pub other: f64,
}

impl OpCount {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(add: f64, mul: f64, fma: f64, other: f64) -> Self {
        Self {
            add,
            mul,
            fma,
            other,
        }
    }

    #[must_use]
    pub const fn other(other: f64) -> Self {
        Self::new(0.0, 0.0, 0.0, other)
    }

    /// `add + mul + 2 * fma + other`, the estimate planner's cost.
    #[must_use]
    pub fn estimate_cost(&self) -> f64 {
        self.add + self.mul + 2.0 * self.fma + self.other
    }

    /// `self * m + rhs`.
    #[must_use]
    pub fn madd(self, m: f64, rhs: Self) -> Self {
        self * m + rhs
    }
}

impl Add for OpCount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            add: self.add + rhs.add,
            mul: self.mul + rhs.mul,
            fma: self.fma + rhs.fma,
            other: self.other + rhs.other,
        }
    }
}

impl AddAssign for OpCount {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Mul<f64> for OpCount {
    type Output = Self;

    fn mul(self, m: f64) -> Self {
        Self {
            add: self.add * m,
            mul: self.mul * m,
            fma: self.fma * m,
            other: self.other * m,
        }
    }
}
