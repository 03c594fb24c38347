//! Spectral matrix: one row per pixel, one column per band.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::envi::HyperCube;
use crate::error::{BandSelectError, Result};

/// Pixel-by-band matrix X (P × B).
#[derive(Clone, Debug, PartialEq)]
pub struct SpectralMatrix {
    data: DMatrix<f64>,
}

impl SpectralMatrix {
    /// Wrap an existing P × B matrix.
    pub fn new(data: DMatrix<f64>) -> Result<Self> {
        if data.iter().any(|v| !v.is_finite()) {
            return Err(BandSelectError::NonFinite("spectral matrix"));
        }
        Ok(Self { data })
    }

    /// Flatten a cube to P × B. Row `p` is the spectrum of pixel
    /// `line * width + sample`.
    ///
    /// The pixel-major buffer is copied into column-major storage, so both
    /// are alive until the cube is dropped on return.
    pub fn from_cube(cube: HyperCube) -> Result<Self> {
        let (lines, samples, bands) = cube.shape();
        let n_pixels = lines * samples;
        debug!(
            "Reshaping {}×{}×{} cube into {}×{} spectral matrix",
            lines, samples, bands, n_pixels, bands
        );
        Self::new(DMatrix::from_row_slice(n_pixels, bands, &cube.data))
    }

    /// Build from pixel spectra. All rows must share a length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_pixels = rows.len();
        let n_bands = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != n_bands) {
            return Err(BandSelectError::CubeSize {
                expected: n_bands,
                actual: bad.len(),
            });
        }
        Self::new(DMatrix::from_fn(n_pixels, n_bands, |i, j| rows[i][j]))
    }

    pub fn n_pixels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_bands(&self) -> usize {
        self.data.ncols()
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn into_matrix(self) -> DMatrix<f64> {
        self.data
    }

    /// Per-band mean over all pixels.
    pub fn band_means(&self) -> DVector<f64> {
        column_means(&self.data)
    }
}

pub(crate) fn column_means(m: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(m.ncols(), m.column_iter().map(|c| c.mean()))
}
