//! Run configuration: separation backend knobs, ranker tolerances and the
//! optional self-checks. Every struct has a `Default` and deserializes from
//! TOML with missing keys falling back to those defaults.

use std::fmt;
use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tolerance::Tolerance;

// ─────────────────────────────────────────────────────────────────────────────
// Contrast function
// ─────────────────────────────────────────────────────────────────────────────

/// Non-quadratic contrast function used by the fixed-point iteration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Contrast {
    /// G(u) = log cosh(αu) / α, general purpose.
    Logcosh { alpha: f64 },
    /// G(u) = -exp(-u²/2), robust for super-Gaussian sources.
    Exp,
    /// G(u) = u⁴/4, kurtosis based.
    Cube,
}

impl Default for Contrast {
    fn default() -> Self {
        Contrast::Logcosh { alpha: 1.0 }
    }
}

impl fmt::Display for Contrast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Contrast::Logcosh { alpha } => write!(f, "Logcosh({:.2})", alpha),
            Contrast::Exp => write!(f, "Exp"),
            Contrast::Cube => write!(f, "Cube"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Separation backend
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the FastICA backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcaConfig {
    /// Iteration bound for the fixed-point loop.
    pub max_iter: usize,

    /// Convergence threshold on the change of the unmixing matrix.
    pub tol: f64,

    /// Seed for the initial unmixing matrix. Equal seeds give equal runs.
    pub seed: u64,

    /// Contrast function g driving the fixed-point update.
    pub contrast: Contrast,

    /// Whiten before iterating. Without whitening the component count must
    /// equal the band count.
    pub whiten: bool,

    /// Relative floor applied to covariance eigenvalues during whitening.
    pub eigen_floor: f64,
}

impl Default for IcaConfig {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tol: 1e-4,
            seed: 0,
            contrast: Contrast::default(),
            whiten: true,
            eigen_floor: 1e-12,
        }
    }
}

impl IcaConfig {
    /// Longer, tighter iteration for small, clean data sets.
    pub fn precise() -> Self {
        Self {
            max_iter: 1000,
            tol: 1e-8,
            ..Self::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Band ranker
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the band ranker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    /// Singular-value threshold for the rank test. `None` uses
    /// `σ_max · max(rows, cols) · ε`.
    pub rank_tolerance: Option<f64>,

    /// Singular values below `pinv_rcond · σ_max` are dropped from the
    /// pseudo-inverse.
    pub pinv_rcond: f64,

    /// Tolerance for the `A ≈ A·W·A` self-check. `None` skips it.
    pub pinv_check: Option<Tolerance>,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            rank_tolerance: None,
            pinv_rcond: 1e-15,
            pinv_check: Some(Tolerance::default()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration of a band-selection run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// FastICA knobs, TOML table `[ica]`.
    pub ica: IcaConfig,

    /// Rank and pseudo-inverse knobs, TOML table `[ranker]`.
    pub ranker: RankerConfig,

    /// Tolerance for the `X ≈ S·Aᵗ + mean` diagnostic. `None` skips it.
    pub reconstruction_check: Option<Tolerance>,
}

impl SelectionConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: SelectionConfig = toml::from_str(s)?;
        debug!("Parsed selection config: {:?}", cfg);
        Ok(cfg)
    }

    /// Load a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading config from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.ica.seed = seed;
        self
    }

    pub fn with_reconstruction_check(mut self, tol: Tolerance) -> Self {
        self.reconstruction_check = Some(tol);
        self
    }
}
