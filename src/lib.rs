//! # ica-bands
//!
//! Band selection for hyperspectral cubes from the pseudo-inverse of an ICA
//! mixing matrix (Du et al., "Band Selection Using Independent Component
//! Analysis for Hyperspectral Image Processing", 2003).
//!
//! # Pipeline
//!
//! 1. **Load**: an ENVI cube (`envi`) is flattened into a pixel × band
//!    [`SpectralMatrix`].
//! 2. **Decompose**: a [`BlindSourceSeparation`] backend ([`FastIca`] by
//!    default) yields sources S, mixing A and the band means.
//! 3. **Rank**: the [`BandRanker`] checks A has a left inverse, takes
//!    W = pinv(A) and scores band j by Σᵢ |W[i, j]|.
//! 4. **Select**: the top `n_b` bands are returned as 1-based band numbers.
//!
//! Fatal conditions are [`BandSelectError`]s; numerical self-checks and
//! over-sized requests are reported as [`Diagnostic`]s and logged with
//! `log::warn!`.

pub mod config;
pub mod decomposer;
pub mod envi;
pub mod error;
pub mod linalg;
pub mod matrix;
pub mod pipeline;
pub mod ranker;
pub mod tolerance;

#[cfg(test)]
mod tests;

pub use config::{Contrast, IcaConfig, RankerConfig, SelectionConfig};
pub use decomposer::{BlindSourceSeparation, DecomposerStage, Decomposition, FastIca};
pub use envi::{EnviHeader, HyperCube};
pub use error::{BandSelectError, Diagnostic, Result, ToleranceCheck};
pub use matrix::SpectralMatrix;
pub use pipeline::{BandSelectionPipeline, SelectionReport, validate_parameters};
pub use ranker::{BandRanker, band_scores, numerical_rank, select_top_bands};
pub use tolerance::{Tolerance, ToleranceReport};
