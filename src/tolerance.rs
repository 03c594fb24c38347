//! Element-wise approximate equality in the `allclose` sense:
//! `|a - b| <= atol + rtol * |b|` for every entry.

use log::trace;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Absolute and relative tolerance pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub atol: f64,
    pub rtol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            atol: 1e-8,
            rtol: 1e-5,
        }
    }
}

impl Tolerance {
    pub fn new(atol: f64, rtol: f64) -> Self {
        Self { atol, rtol }
    }

    /// Loose tolerance suited to checking an ICA reconstruction of real imagery.
    pub fn reconstruction() -> Self {
        Self {
            atol: 1e-4,
            rtol: 0.13,
        }
    }

    /// Compare `actual` against `expected`. Shapes must agree; a shape mismatch
    /// counts every entry of the larger matrix as a violation.
    pub fn check(&self, actual: &DMatrix<f64>, expected: &DMatrix<f64>) -> ToleranceReport {
        if actual.shape() != expected.shape() {
            let total = actual.len().max(expected.len());
            return ToleranceReport {
                atol: self.atol,
                rtol: self.rtol,
                max_abs_diff: f64::INFINITY,
                violations: total,
                total,
            };
        }

        let mut max_abs_diff = 0.0_f64;
        let mut violations = 0usize;
        for (&a, &b) in actual.iter().zip(expected.iter()) {
            let diff = (a - b).abs();
            // NaN never passes
            if !(diff <= self.atol + self.rtol * b.abs()) {
                violations += 1;
            }
            if diff.is_nan() {
                max_abs_diff = f64::NAN;
            } else if !max_abs_diff.is_nan() {
                max_abs_diff = max_abs_diff.max(diff);
            }
        }

        trace!(
            "tolerance check: {} / {} violations, max |Δ|={:.3e}",
            violations,
            actual.len(),
            max_abs_diff
        );

        ToleranceReport {
            atol: self.atol,
            rtol: self.rtol,
            max_abs_diff,
            violations,
            total: actual.len(),
        }
    }
}

/// Outcome of a tolerance comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct ToleranceReport {
    pub atol: f64,
    pub rtol: f64,
    pub max_abs_diff: f64,
    pub violations: usize,
    pub total: usize,
}

impl ToleranceReport {
    pub fn passed(&self) -> bool {
        self.violations == 0
    }
}
