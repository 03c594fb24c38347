//! Stage 2: rank bands by their weight in the pseudo-inverse of the mixing
//! matrix.
//!
//! For a mixing matrix A (B × n_c) with full column rank, W = pinv(A) is the
//! least-squares unmixing operator (n_c × B): Sᵗ ≈ W·Xcᵗ. Column j of W holds
//! the weight band j receives in every recovered component, so
//!
//!   score[j] = Σᵢ |W[i, j]|
//!
//! measures how much band j contributes to the independent components as a
//! whole. Bands with the largest scores are selected.

use log::{debug, info, warn};
use nalgebra::DMatrix;

use crate::config::RankerConfig;
use crate::error::{BandSelectError, Diagnostic, Result, ToleranceCheck};
use crate::linalg::Spectrum;

// ─────────────────────────────────────────────────────────────────────────────
// Scoring primitives
// ─────────────────────────────────────────────────────────────────────────────

/// Numerical rank of `a`. `tol = None` uses `σ_max · max(rows, cols) · ε`.
pub fn numerical_rank(a: &DMatrix<f64>, tol: Option<f64>) -> Result<usize> {
    let spectrum = Spectrum::new(a)?;
    let tol = tol.unwrap_or_else(|| spectrum.default_rank_tolerance());
    Ok(spectrum.rank(tol))
}

/// Sum of absolute values down each column of `w` (n_c × B), one score per
/// band.
pub fn band_scores(w: &DMatrix<f64>) -> Vec<f64> {
    w.column_iter()
        .map(|col| col.iter().map(|v| v.abs()).sum())
        .collect()
}

/// 1-based indices of the `n_bands` highest scores, in ascending-score order.
///
/// Ties keep the lower band index first. Requests beyond `scores.len()` are
/// capped; a request of zero yields an empty list.
pub fn select_top_bands(scores: &[f64], n_bands: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&i, &j| scores[i].total_cmp(&scores[j]));

    let start = order.len().saturating_sub(n_bands);
    order[start..].iter().map(|&i| i + 1).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Output type
// ─────────────────────────────────────────────────────────────────────────────

/// Output of Stage 2.
#[derive(Clone, Debug)]
pub struct RankingOutput {
    /// Numerical rank of the mixing matrix (equals its column count).
    pub rank: usize,

    /// One non-negative score per band, indexed by 0-based band.
    pub scores: Vec<f64>,

    /// Selected 1-based band numbers, ascending score.
    pub selected: Vec<usize>,

    /// Pseudo-inverse self-check warnings, if any.
    pub diagnostics: Vec<Diagnostic>,
}

impl RankingOutput {
    pub fn summary(&self) -> String {
        format!(
            "RankingOutput: rank={}, bands={}, selected={:?}",
            self.rank,
            self.scores.len(),
            self.selected
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stage executor
// ─────────────────────────────────────────────────────────────────────────────

/// Stage 2 executor.
#[derive(Clone, Debug, Default)]
pub struct BandRanker {
    pub config: RankerConfig,
}

impl BandRanker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(RankerConfig::default())
    }

    /// Execute Stage 2 on a B × n_c mixing matrix.
    ///
    /// An empty mixing matrix is rejected with
    /// [`BandSelectError::EmptyInput`]. Fails with [`BandSelectError::DegenerateMixingMatrix`] when the mixing
    /// matrix has no left inverse; no scores are produced in that case.
    pub fn execute(&self, mixing: &DMatrix<f64>, n_bands: usize) -> Result<RankingOutput> {
        let (b, n_c) = mixing.shape();
        info!(
            "Stage 2: ranking {} bands from {}×{} mixing matrix",
            b, b, n_c
        );

        // Step 1: left-invertibility
        let spectrum = Spectrum::new(mixing)?;
        let tol = self
            .config
            .rank_tolerance
            .unwrap_or_else(|| spectrum.default_rank_tolerance());
        let rank = spectrum.rank(tol);
        debug!(
            "Mixing matrix rank {} (tol={:.3e}, σ_max={:.4e})",
            rank,
            tol,
            spectrum.max_singular_value()
        );
        if rank < n_c {
            return Err(BandSelectError::DegenerateMixingMatrix {
                rank,
                n_components: n_c,
            });
        }

        // Step 2: pseudo-inverse
        let w = spectrum.pseudo_inverse(self.config.pinv_rcond)?;
        debug!("Pseudo-inverse: {}×{}", w.nrows(), w.ncols());

        let mut diagnostics = Vec::new();
        if let Some(tol) = &self.config.pinv_check {
            let report = tol.check(&(mixing * &w * mixing), mixing);
            if !report.passed() {
                let diag = Diagnostic::NumericalTolerance {
                    check: ToleranceCheck::PseudoInverse,
                    report,
                };
                warn!("{}", diag);
                diagnostics.push(diag);
            }
        }

        // Step 3: scores
        let scores = band_scores(&w);

        // Step 4: selection
        let selected = select_top_bands(&scores, n_bands);
        info!(
            "Selected {} of {} bands (highest score last): {:?}",
            selected.len(),
            b,
            selected
        );

        Ok(RankingOutput {
            rank,
            scores,
            selected,
            diagnostics,
        })
    }
}
