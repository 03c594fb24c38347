//! Dense linear-algebra helpers shared by the separation backend and the
//! band ranker: SVD-based rank and pseudo-inverse, symmetric inverse square
//! root.

use log::trace;
use nalgebra::{DMatrix, DVector, SVD, SymmetricEigen};

use crate::error::{BandSelectError, Result};

/// Singular values plus the SVD needed to build a pseudo-inverse.
pub struct Spectrum {
    svd: SVD<f64, nalgebra::Dyn, nalgebra::Dyn>,
    shape: (usize, usize),
}

impl Spectrum {
    pub fn new(a: &DMatrix<f64>) -> Result<Self> {
        if a.is_empty() {
            return Err(BandSelectError::EmptyInput {
                rows: a.nrows(),
                cols: a.ncols(),
            });
        }
        if a.iter().any(|v| !v.is_finite()) {
            return Err(BandSelectError::NonFinite("matrix passed to SVD"));
        }
        let shape = a.shape();
        let svd = SVD::new(a.clone(), true, true);
        trace!("SVD of {}×{}: σ={:?}", shape.0, shape.1, svd.singular_values.as_slice());
        Ok(Self { svd, shape })
    }

    pub fn singular_values(&self) -> &DVector<f64> {
        &self.svd.singular_values
    }

    pub fn max_singular_value(&self) -> f64 {
        self.svd
            .singular_values
            .iter()
            .copied()
            .fold(0.0_f64, f64::max)
    }

    /// `σ_max · max(rows, cols) · ε`, the conventional matrix-rank threshold.
    pub fn default_rank_tolerance(&self) -> f64 {
        self.max_singular_value() * self.shape.0.max(self.shape.1) as f64 * f64::EPSILON
    }

    /// Count of singular values strictly above `tol`.
    pub fn rank(&self, tol: f64) -> usize {
        self.svd
            .singular_values
            .iter()
            .filter(|&&s| s > tol)
            .count()
    }

    /// Moore–Penrose pseudo-inverse, dropping singular values at or below
    /// `rcond · σ_max`.
    pub fn pseudo_inverse(self, rcond: f64) -> Result<DMatrix<f64>> {
        let cutoff = rcond.max(0.0) * self.max_singular_value();
        self.svd
            .pseudo_inverse(cutoff)
            .map_err(|e| BandSelectError::Decomposition(format!("pseudo-inverse failed: {}", e)))
    }
}

/// Pseudo-inverse of `a` with relative cutoff `rcond`.
pub fn pseudo_inverse(a: &DMatrix<f64>, rcond: f64) -> Result<DMatrix<f64>> {
    Spectrum::new(a)?.pseudo_inverse(rcond)
}

/// M^{-1/2} for a symmetric positive semi-definite `m`; eigenvalues are
/// clipped at the smallest positive `f64` first.
pub fn inverse_sqrt_symmetric(m: DMatrix<f64>) -> DMatrix<f64> {
    let eig = SymmetricEigen::new(m);
    let scale = eig
        .eigenvalues
        .map(|d| 1.0 / d.max(f64::MIN_POSITIVE).sqrt());
    let v = &eig.eigenvectors;
    v * DMatrix::from_diagonal(&scale) * v.transpose()
}
