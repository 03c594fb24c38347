use std::cell::Cell;

use nalgebra::{DMatrix, DVector};

use crate::decomposer::{
    BlindSourceSeparation, DecomposerStage, Decomposition, FastIca, check_component_count,
};
use crate::error::{BandSelectError, Diagnostic, Result, ToleranceCheck};
use crate::matrix::SpectralMatrix;
use crate::tests::init;
use crate::tests::test_data::{make_mixed_spectra, make_synthetic_cube, random_matrix};
use crate::tolerance::Tolerance;

/// Backend returning a fixed decomposition and counting its calls.
pub(super) struct FixedBackend {
    pub calls: Cell<usize>,
    pub sources: DMatrix<f64>,
    pub mixing: DMatrix<f64>,
    pub mean: DVector<f64>,
}

impl FixedBackend {
    pub fn new(sources: DMatrix<f64>, mixing: DMatrix<f64>, mean: DVector<f64>) -> Self {
        Self {
            calls: Cell::new(0),
            sources,
            mixing,
            mean,
        }
    }
}

impl BlindSourceSeparation for FixedBackend {
    fn decompose(&self, _x: &DMatrix<f64>, _n_components: usize) -> Result<Decomposition> {
        self.calls.set(self.calls.get() + 1);
        Ok(Decomposition {
            sources: self.sources.clone(),
            mixing: self.mixing.clone(),
            mean: self.mean.clone(),
            n_iter: 1,
            converged: true,
        })
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[test]
fn test_component_count_bounds() {
    assert!(check_component_count(1, 1).is_ok());
    assert!(check_component_count(10, 10).is_ok());
    assert!(matches!(
        check_component_count(0, 10),
        Err(BandSelectError::Configuration { n_components: 0, .. })
    ));
    assert!(matches!(
        check_component_count(11, 10),
        Err(BandSelectError::Configuration {
            n_components: 11,
            n_bands: 10,
            ..
        })
    ));
}

#[test]
fn test_too_many_components_rejected_before_decomposition() {
    init();
    let cube = make_synthetic_cube(4, 4, 10, 3, 7);
    let x = SpectralMatrix::from_cube(cube).unwrap();

    let backend = FixedBackend::new(
        DMatrix::zeros(16, 11),
        DMatrix::identity(10, 11),
        DVector::zeros(10),
    );
    let stage = DecomposerStage::new(backend);

    let err = stage.execute(&x, 11).unwrap_err();
    assert!(matches!(err, BandSelectError::Configuration { .. }));
    assert_eq!(stage.backend.calls.get(), 0, "backend must not run");
}

#[test]
fn test_single_pixel_rejected() {
    let x = SpectralMatrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
    let stage = DecomposerStage::new(FastIca::default());
    let err = stage.execute(&x, 2).unwrap_err();
    assert!(matches!(err, BandSelectError::EmptyInput { rows: 1, cols: 3 }));
}

#[test]
fn test_inconsistent_backend_shapes_rejected() {
    let x = make_mixed_spectra(20, 5, 2, 1);
    // mixing has the wrong band count
    let backend = FixedBackend::new(
        DMatrix::zeros(20, 2),
        DMatrix::zeros(4, 2),
        DVector::zeros(5),
    );
    let err = DecomposerStage::new(backend).execute(&x, 2).unwrap_err();
    assert!(matches!(err, BandSelectError::Decomposition(_)));
}

#[test]
fn test_reconstruction_warning_is_not_fatal() {
    init();
    let x = make_mixed_spectra(20, 5, 2, 1);
    // zero sources and zero mean reconstruct to all zeros
    let backend = FixedBackend::new(
        DMatrix::zeros(20, 2),
        DMatrix::identity(5, 2),
        DVector::zeros(5),
    );
    let stage =
        DecomposerStage::new(backend).with_reconstruction_check(Some(Tolerance::new(1e-4, 0.13)));

    let out = stage.execute(&x, 2).unwrap();
    assert_eq!(out.diagnostics.len(), 1);
    match &out.diagnostics[0] {
        Diagnostic::NumericalTolerance { check, report } => {
            assert_eq!(*check, ToleranceCheck::Reconstruction);
            assert_eq!(report.violations, report.total);
        }
        other => panic!("unexpected diagnostic {:?}", other),
    }
}

#[test]
fn test_reconstruction_check_passes_with_fastica() {
    init();
    let x = SpectralMatrix::new(random_matrix(64, 6, 3).add_scalar(2.0)).unwrap();
    let stage = DecomposerStage::new(FastIca::default())
        .with_reconstruction_check(Some(Tolerance::new(1e-6, 1e-6)));

    let out = stage.execute(&x, 6).unwrap();
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
}
