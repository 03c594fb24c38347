//! Stage 1: blind source separation of the spectral matrix.
//!
//! The separation routine sits behind [`BlindSourceSeparation`] so the
//! numerical backend can be swapped. [`DecomposerStage`] owns the
//! preconditions (component count vs. band count) and the optional
//! reconstruction diagnostic; backends only do the numerics.
//!
//! Contract of every backend: for X (P × B) and `n_components`, return
//! S (P × n_c), A (B × n_c) and a mean (B) such that X ≈ S·Aᵗ + mean.

pub mod fastica;

pub use fastica::FastIca;

use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};

use crate::error::{BandSelectError, Diagnostic, Result, ToleranceCheck};
use crate::matrix::SpectralMatrix;
use crate::tolerance::Tolerance;

// ─────────────────────────────────────────────────────────────────────────────
// Backend interface
// ─────────────────────────────────────────────────────────────────────────────

/// Narrow interface to a blind source separation routine.
pub trait BlindSourceSeparation {
    /// Decompose `x` (P × B) into `n_components` independent sources.
    /// Callers guarantee `1 <= n_components <= x.ncols()`.
    fn decompose(&self, x: &DMatrix<f64>, n_components: usize) -> Result<Decomposition>;

    /// Display name for logs.
    fn name(&self) -> &str;
}

// ─────────────────────────────────────────────────────────────────────────────
// Output types
// ─────────────────────────────────────────────────────────────────────────────

/// Output of a separation backend.
#[derive(Clone, Debug)]
pub struct Decomposition {
    /// Estimated sources S, P × n_c.
    pub sources: DMatrix<f64>,

    /// Estimated mixing matrix A, B × n_c.
    pub mixing: DMatrix<f64>,

    /// Per-band mean removed before separation, length B.
    pub mean: DVector<f64>,

    /// Iterations the backend ran.
    pub n_iter: usize,

    /// False when the backend stopped at its iteration bound.
    pub converged: bool,
}

impl Decomposition {
    pub fn n_components(&self) -> usize {
        self.mixing.ncols()
    }

    /// S·Aᵗ + mean, P × B.
    pub fn reconstruct(&self) -> DMatrix<f64> {
        let centered = &self.sources * self.mixing.transpose();
        DMatrix::from_fn(centered.nrows(), centered.ncols(), |i, j| {
            centered[(i, j)] + self.mean[j]
        })
    }

    pub fn summary(&self) -> String {
        format!(
            "Decomposition: sources={}×{}, mixing={}×{}, iterations={}, converged={}",
            self.sources.nrows(),
            self.sources.ncols(),
            self.mixing.nrows(),
            self.mixing.ncols(),
            self.n_iter,
            self.converged
        )
    }
}

/// Output of the decomposer stage.
#[derive(Debug)]
pub struct DecomposerOutput {
    /// Backend output, shapes already validated.
    pub decomposition: Decomposition,

    /// Reconstruction warnings, if the check is enabled.
    pub diagnostics: Vec<Diagnostic>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage executor
// ─────────────────────────────────────────────────────────────────────────────

/// Reject component counts the decomposition cannot honour.
pub fn check_component_count(n_components: usize, n_bands: usize) -> Result<()> {
    if n_components == 0 {
        return Err(BandSelectError::Configuration {
            n_components,
            n_bands,
            reason: "at least one component is required",
        });
    }
    if n_components > n_bands {
        return Err(BandSelectError::Configuration {
            n_components,
            n_bands,
            reason: "component count exceeds band count",
        });
    }
    Ok(())
}

/// Stage 1 executor.
pub struct DecomposerStage<D: BlindSourceSeparation> {
    /// Separation routine doing the numerics.
    pub backend: D,

    /// Tolerance for the reconstruction diagnostic; `None` skips it.
    pub reconstruction_check: Option<Tolerance>,
}

impl<D: BlindSourceSeparation> DecomposerStage<D> {
    pub fn new(backend: D) -> Self {
        Self {
            backend,
            reconstruction_check: None,
        }
    }

    pub fn with_reconstruction_check(mut self, tol: Option<Tolerance>) -> Self {
        self.reconstruction_check = tol;
        self
    }

    /// Execute Stage 1.
    ///
    /// Fails with [`BandSelectError::Configuration`] before touching the
    /// backend when `n_components` is 0 or exceeds the band count.
    pub fn execute(&self, x: &SpectralMatrix, n_components: usize) -> Result<DecomposerOutput> {
        let (p, b) = (x.n_pixels(), x.n_bands());
        check_component_count(n_components, b)?;
        if p < 2 {
            return Err(BandSelectError::EmptyInput { rows: p, cols: b });
        }

        info!(
            "Stage 1: decomposing {}×{} spectral matrix into {} components with {}",
            p,
            b,
            n_components,
            self.backend.name()
        );

        let decomposition = self.backend.decompose(x.as_matrix(), n_components)?;
        debug!("{}", decomposition.summary());

        if decomposition.mixing.shape() != (b, n_components)
            || decomposition.sources.shape() != (p, n_components)
            || decomposition.mean.len() != b
        {
            return Err(BandSelectError::Decomposition(format!(
                "{} returned inconsistent shapes: {}",
                self.backend.name(),
                decomposition.summary()
            )));
        }

        let mut diagnostics = Vec::new();
        if let Some(tol) = &self.reconstruction_check {
            let report = tol.check(x.as_matrix(), &decomposition.reconstruct());
            if report.passed() {
                debug!(
                    "Reconstruction within tolerance (max |Δ|={:.3e})",
                    report.max_abs_diff
                );
            } else {
                let diag = Diagnostic::NumericalTolerance {
                    check: ToleranceCheck::Reconstruction,
                    report,
                };
                warn!("{}", diag);
                diagnostics.push(diag);
            }
        }

        Ok(DecomposerOutput {
            decomposition,
            diagnostics,
        })
    }
}
