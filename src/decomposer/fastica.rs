//! FastICA: whitening followed by the parallel fixed-point iteration.
//!
//! # Steps
//!
//! 1. **Center** X by its per-band mean.
//! 2. **Whiten**: eigendecompose the B×B covariance, keep the n_c largest
//!    eigenpairs and build K = D^{-½}·Eᵗ (n_c × B). Z = Xc·Kᵗ has identity
//!    covariance.
//! 3. **Iterate** on the n_c × n_c unmixing matrix W, seeded from a
//!    standard normal draw:
//!    W ← E[g(WZᵗ)·Z] − diag(E[g'(WZᵗ)])·W, then W ← (WWᵗ)^{-½}·W.
//!    Stop once every row of W is (up to sign) unchanged within `tol`.
//! 4. **Assemble**: U = W·K, S = Xc·Uᵗ, A = pinv(U).

use log::{debug, info, trace, warn};
use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_pcg::Pcg64;

use super::{BlindSourceSeparation, Decomposition};
use crate::config::{Contrast, IcaConfig};
use crate::error::{BandSelectError, Result};
use crate::linalg::{inverse_sqrt_symmetric, pseudo_inverse};
use crate::matrix::column_means;

/// Relative cutoff used when inverting the full unmixing matrix.
const MIXING_RCOND: f64 = 1e-15;

/// FastICA backend.
#[derive(Clone, Debug, Default)]
pub struct FastIca {
    pub config: IcaConfig,
}

impl FastIca {
    pub fn new(config: IcaConfig) -> Self {
        Self { config }
    }

    /// Whitening matrix K (n_c × B) for centered data.
    fn whitening(&self, xc: &DMatrix<f64>, n_components: usize) -> Result<DMatrix<f64>> {
        let (p, b) = xc.shape();
        let cov = (xc.transpose() * xc) / p as f64;
        let eig = nalgebra::SymmetricEigen::new(cov);

        let mut order: Vec<usize> = (0..b).collect();
        order.sort_by(|&i, &j| eig.eigenvalues[j].total_cmp(&eig.eigenvalues[i]));

        let lambda_max = eig.eigenvalues[order[0]];
        if !(lambda_max > 0.0) {
            return Err(BandSelectError::Decomposition(
                "data has zero variance in every band".into(),
            ));
        }
        let floor = self.config.eigen_floor * lambda_max;

        let mut k = DMatrix::zeros(n_components, b);
        let mut clamped = 0usize;
        for (row, &idx) in order.iter().take(n_components).enumerate() {
            let mut lambda = eig.eigenvalues[idx];
            if lambda < floor {
                lambda = floor;
                clamped += 1;
            }
            let scale = 1.0 / lambda.sqrt();
            for j in 0..b {
                k[(row, j)] = eig.eigenvectors[(j, idx)] * scale;
            }
        }

        if clamped > 0 {
            warn!(
                "{} of {} retained covariance eigenvalues fell below the floor {:.3e}; \
                 the data has fewer than {} informative directions",
                clamped, n_components, floor, n_components
            );
        }
        debug!(
            "Whitening: kept {} of {} eigenpairs, λ_max={:.4e}",
            n_components, b, lambda_max
        );

        Ok(k)
    }

    fn initial_unmixing(&self, n_components: usize) -> DMatrix<f64> {
        let mut rng = Pcg64::seed_from_u64(self.config.seed);
        let w0 = DMatrix::from_fn(n_components, n_components, |_, _| {
            rng.sample::<f64, _>(StandardNormal)
        });
        symmetric_decorrelation(w0)
    }

    /// Parallel fixed-point loop. Returns (W, iterations, converged).
    fn fixed_point(&self, z: &DMatrix<f64>, w_init: DMatrix<f64>) -> (DMatrix<f64>, usize, bool) {
        let p = z.nrows() as f64;
        let zt = z.transpose();
        let mut w = w_init;

        for iter in 1..=self.config.max_iter {
            let y = &w * &zt; // n_c × P
            let (g, g_prime) = apply_contrast(&self.config.contrast, &y);

            let g_prime_mean = DVector::from_iterator(
                g_prime.nrows(),
                g_prime.row_iter().map(|r| r.mean()),
            );

            let w_next = (&g * z) / p - DMatrix::from_diagonal(&g_prime_mean) * &w;
            let w_next = symmetric_decorrelation(w_next);

            let overlap = &w_next * w.transpose();
            let lim = overlap
                .diagonal()
                .iter()
                .map(|d| (d.abs() - 1.0).abs())
                .fold(0.0_f64, f64::max);

            w = w_next;
            trace!("FastICA iteration {}: lim={:.3e}", iter, lim);

            if lim < self.config.tol {
                return (w, iter, true);
            }
        }

        (w, self.config.max_iter, false)
    }
}

impl BlindSourceSeparation for FastIca {
    fn decompose(&self, x: &DMatrix<f64>, n_components: usize) -> Result<Decomposition> {
        let (p, b) = x.shape();
        info!(
            "FastICA: {} pixels × {} bands → {} components ({}, max_iter={}, tol={:.1e}, seed={})",
            p,
            b,
            n_components,
            self.config.contrast,
            self.config.max_iter,
            self.config.tol,
            self.config.seed
        );

        let mean = column_means(x);
        let xc = DMatrix::from_fn(p, b, |i, j| x[(i, j)] - mean[j]);

        let k = if self.config.whiten {
            self.whitening(&xc, n_components)?
        } else {
            if n_components != b {
                return Err(BandSelectError::Decomposition(format!(
                    "without whitening the component count ({}) must equal the band count ({})",
                    n_components, b
                )));
            }
            DMatrix::identity(b, b)
        };

        let z = &xc * k.transpose(); // P × n_c
        let w_init = self.initial_unmixing(n_components);
        let (w, n_iter, converged) = self.fixed_point(&z, w_init);

        if converged {
            debug!("FastICA converged after {} iterations", n_iter);
        } else {
            warn!(
                "FastICA stopped at max_iter={} without reaching tol={:.1e}",
                n_iter, self.config.tol
            );
        }

        let unmixing = &w * &k; // n_c × B
        let sources = &xc * unmixing.transpose();
        let mixing = pseudo_inverse(&unmixing, MIXING_RCOND)?;

        Ok(Decomposition {
            sources,
            mixing,
            mean,
            n_iter,
            converged,
        })
    }

    fn name(&self) -> &str {
        "FastICA"
    }
}

/// W ← (W·Wᵗ)^{-½}·W
fn symmetric_decorrelation(w: DMatrix<f64>) -> DMatrix<f64> {
    let m = &w * w.transpose();
    inverse_sqrt_symmetric(m) * w
}

/// Element-wise g and g' of the contrast function.
fn apply_contrast(contrast: &Contrast, y: &DMatrix<f64>) -> (DMatrix<f64>, DMatrix<f64>) {
    match *contrast {
        Contrast::Logcosh { alpha } => {
            let g = y.map(|v| (alpha * v).tanh());
            let g_prime = g.map(|t| alpha * (1.0 - t * t));
            (g, g_prime)
        }
        Contrast::Exp => {
            let e = y.map(|v| (-0.5 * v * v).exp());
            let g = y.component_mul(&e);
            let g_prime = y.zip_map(&e, |v, ev| (1.0 - v * v) * ev);
            (g, g_prime)
        }
        Contrast::Cube => (y.map(|v| v * v * v), y.map(|v| 3.0 * v * v)),
    }
}
