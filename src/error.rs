//! Fatal errors and non-fatal diagnostics for a band-selection run.
//!
//! Errors abort the run with no partial output. Diagnostics are surfaced
//! through `log::warn!` and carried on the final report; they never abort.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::tolerance::ToleranceReport;

/// Result type for band-selection operations
pub type Result<T> = std::result::Result<T, BandSelectError>;

/// Errors that halt a band-selection run
#[derive(Error, Debug)]
pub enum BandSelectError {
    /// Component count is not usable for the available bands.
    #[error("invalid component count {n_components} for {n_bands} bands: {reason}")]
    Configuration {
        n_components: usize,
        n_bands: usize,
        reason: &'static str,
    },

    /// Mixing matrix is rank deficient, so no left inverse exists.
    #[error(
        "mixing matrix does not have a left inverse (rank {rank} < {n_components} components)"
    )]
    DegenerateMixingMatrix { rank: usize, n_components: usize },

    /// Input matrix has too few rows or columns to decompose.
    #[error("input matrix is too small: {rows}×{cols}")]
    EmptyInput { rows: usize, cols: usize },

    /// NaN or infinite value found in a matrix.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    /// Separation backend failed numerically.
    #[error("decomposition failed: {0}")]
    Decomposition(String),

    /// ENVI header missing or malformed.
    #[error("ENVI header error: {0}")]
    Header(String),

    /// ENVI data type code this reader does not decode.
    #[error("unsupported ENVI data type: {0}")]
    UnsupportedDataType(u32),

    /// Cube dimensions whose sample or byte count overflows `usize`.
    #[error("cube geometry {lines}×{samples}×{bands} is too large to address")]
    GeometryOverflow {
        lines: usize,
        samples: usize,
        bands: usize,
    },

    /// Raw cube file size disagrees with the header geometry.
    #[error("cube size mismatch: expected {expected} bytes, got {actual}")]
    CubeSize { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Which numerical self-check produced a tolerance diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToleranceCheck {
    /// X ≈ S·Aᵗ + mean
    Reconstruction,
    /// A ≈ A·W·A
    PseudoInverse,
}

impl fmt::Display for ToleranceCheck {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ToleranceCheck::Reconstruction => write!(f, "reconstruction"),
            ToleranceCheck::PseudoInverse => write!(f, "pseudo-inverse"),
        }
    }
}

/// Non-fatal findings collected during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A self-check exceeded its configured tolerance.
    NumericalTolerance {
        check: ToleranceCheck,
        report: ToleranceReport,
    },
    /// More bands were requested than the cube holds; all bands are returned.
    RequestedCountExceedsAvailable { requested: usize, available: usize },
    /// The separation backend stopped at its iteration bound.
    NotConverged { iterations: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Diagnostic::NumericalTolerance { check, report } => write!(
                f,
                "{} check failed tolerance: {} of {} entries outside atol={:.2e} rtol={:.2e} (max |Δ|={:.3e})",
                check, report.violations, report.total, report.atol, report.rtol, report.max_abs_diff
            ),
            Diagnostic::RequestedCountExceedsAvailable {
                requested,
                available,
            } => write!(
                f,
                "requested {} bands but the data set only has {}; returning all bands",
                requested, available
            ),
            Diagnostic::NotConverged { iterations } => write!(
                f,
                "separation did not converge within {} iterations; consider raising max_iter or tol",
                iterations
            ),
        }
    }
}
