//! End-to-end band selection: validate → decompose → rank.
//!
//! ```ignore
//! use ica_bands::{BandSelectionPipeline, SelectionConfig, SpectralMatrix};
//!
//! let x = SpectralMatrix::from_cube(cube)?;
//! let report = BandSelectionPipeline::new(SelectionConfig::default()).run(&x, 30, 10)?;
//! println!("{:?}", report.descending());
//! ```

use log::{info, warn};

use crate::config::{RankerConfig, SelectionConfig};
use crate::decomposer::{
    BlindSourceSeparation, DecomposerStage, FastIca, check_component_count,
};
use crate::error::{Diagnostic, Result};
use crate::matrix::SpectralMatrix;
use crate::ranker::BandRanker;
use crate::tolerance::Tolerance;

// ─────────────────────────────────────────────────────────────────────────────
// Parameter validation
// ─────────────────────────────────────────────────────────────────────────────

/// Validate the two caller parameters against the band count.
///
/// A component count of zero or above `n_bands` is fatal. A selected-band
/// count above `n_bands` only yields a warning.
pub fn validate_parameters(
    n_bands: usize,
    n_components: usize,
    n_selected: usize,
) -> Result<Vec<Diagnostic>> {
    check_component_count(n_components, n_bands)?;

    let mut diagnostics = Vec::new();
    if n_selected > n_bands {
        let diag = Diagnostic::RequestedCountExceedsAvailable {
            requested: n_selected,
            available: n_bands,
        };
        warn!("{}", diag);
        diagnostics.push(diag);
    }
    Ok(diagnostics)
}

// ─────────────────────────────────────────────────────────────────────────────
// Output type
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a full run.
#[derive(Clone, Debug)]
pub struct SelectionReport {
    /// 1-based band numbers, ascending score (best band last).
    pub selected_bands: Vec<usize>,

    /// Per-band scores, indexed by 0-based band.
    pub scores: Vec<f64>,

    /// Component count the decomposition ran with.
    pub n_components: usize,

    /// Iterations the separation backend ran.
    pub n_iter: usize,

    /// False when the backend hit its iteration bound.
    pub converged: bool,

    /// Warnings raised along the way, in the order they occurred.
    pub diagnostics: Vec<Diagnostic>,
}

impl SelectionReport {
    /// Selected bands, best first.
    pub fn descending(&self) -> Vec<usize> {
        self.selected_bands.iter().rev().copied().collect()
    }

    /// Score of a 1-based band number.
    pub fn score_of(&self, band: usize) -> Option<f64> {
        band.checked_sub(1).and_then(|i| self.scores.get(i).copied())
    }

    pub fn summary(&self) -> String {
        format!(
            "SelectionReport: {} bands selected from {}, n_components={}, iterations={}, converged={}, warnings={}",
            self.selected_bands.len(),
            self.scores.len(),
            self.n_components,
            self.n_iter,
            self.converged,
            self.diagnostics.len()
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Band-selection pipeline over a separation backend.
pub struct BandSelectionPipeline<D: BlindSourceSeparation = FastIca> {
    /// Stage 1: blind source separation.
    pub decomposer: DecomposerStage<D>,

    /// Stage 2: pseudo-inverse scoring and selection.
    pub ranker: BandRanker,
}

impl BandSelectionPipeline<FastIca> {
    /// FastICA-backed pipeline built from `config`.
    pub fn new(config: SelectionConfig) -> Self {
        let SelectionConfig {
            ica,
            ranker,
            reconstruction_check,
        } = config;
        Self::with_backend(FastIca::new(ica), ranker, reconstruction_check)
    }
}

impl<D: BlindSourceSeparation> BandSelectionPipeline<D> {
    pub fn with_backend(
        backend: D,
        ranker: RankerConfig,
        reconstruction_check: Option<Tolerance>,
    ) -> Self {
        Self {
            decomposer: DecomposerStage::new(backend).with_reconstruction_check(reconstruction_check),
            ranker: BandRanker::new(ranker),
        }
    }

    /// Run validation, decomposition and ranking.
    ///
    /// Errors abort with no partial output; warnings are collected on the
    /// report.
    pub fn run(
        &self,
        x: &SpectralMatrix,
        n_components: usize,
        n_selected: usize,
    ) -> Result<SelectionReport> {
        info!("╔═══════════════════════════════════════════════════════╗");
        info!("║  ICA BAND SELECTION                                   ║");
        info!("╚═══════════════════════════════════════════════════════╝");
        info!(
            "  • {} pixels × {} bands, n_components={}, n_selected={}",
            x.n_pixels(),
            x.n_bands(),
            n_components,
            n_selected
        );

        let mut diagnostics = validate_parameters(x.n_bands(), n_components, n_selected)?;

        let decomposed = self.decomposer.execute(x, n_components)?;
        diagnostics.extend(decomposed.diagnostics);
        let decomposition = decomposed.decomposition;
        if !decomposition.converged {
            let diag = Diagnostic::NotConverged {
                iterations: decomposition.n_iter,
            };
            warn!("{}", diag);
            diagnostics.push(diag);
        }
        info!("  ✓ {}", decomposition.summary());

        let ranking = self.ranker.execute(&decomposition.mixing, n_selected)?;
        info!("  ✓ {}", ranking.summary());
        diagnostics.extend(ranking.diagnostics);

        let report = SelectionReport {
            selected_bands: ranking.selected,
            scores: ranking.scores,
            n_components,
            n_iter: decomposition.n_iter,
            converged: decomposition.converged,
            diagnostics,
        };
        info!("{}", report.summary());
        Ok(report)
    }
}
