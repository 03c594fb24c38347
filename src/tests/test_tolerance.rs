use nalgebra::DMatrix;

use crate::tolerance::Tolerance;

#[test]
fn test_identical_matrices_pass() {
    let a = DMatrix::from_row_slice(2, 2, &[1.0, -2.0, 3.0, 0.0]);
    let report = Tolerance::default().check(&a, &a);
    assert!(report.passed());
    assert_eq!(report.total, 4);
    assert_eq!(report.max_abs_diff, 0.0);
}

#[test]
fn test_violations_are_counted() {
    let expected = DMatrix::from_row_slice(1, 4, &[0.0, 1.0, 2.0, 3.0]);
    let actual = DMatrix::from_row_slice(1, 4, &[0.0, 1.5, 2.0, 3.25]);
    let report = Tolerance::new(0.1, 0.0).check(&actual, &expected);

    assert!(!report.passed());
    assert_eq!(report.violations, 2);
    assert_eq!(report.total, 4);
    assert_eq!(report.max_abs_diff, 0.5);
}

#[test]
fn test_relative_term_scales_with_expected() {
    let tol = Tolerance::new(0.0, 0.1);
    let expected = DMatrix::from_element(1, 1, 100.0);

    // 5 <= 0.1 * 100
    let close = DMatrix::from_element(1, 1, 105.0);
    assert!(tol.check(&close, &expected).passed());

    // measured against |expected|, not |actual|
    let small_expected = DMatrix::from_element(1, 1, 10.0);
    let large_actual = DMatrix::from_element(1, 1, 12.0);
    assert!(!tol.check(&large_actual, &small_expected).passed());
}

#[test]
fn test_shape_mismatch_fails_every_entry() {
    let a = DMatrix::<f64>::zeros(2, 3);
    let b = DMatrix::<f64>::zeros(3, 2);
    let report = Tolerance::default().check(&a, &b);
    assert_eq!(report.violations, 6);
    assert_eq!(report.total, 6);
    assert!(report.max_abs_diff.is_infinite());
}

#[test]
fn test_nan_never_passes() {
    let expected = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
    let actual = DMatrix::from_row_slice(1, 2, &[f64::NAN, 2.0]);
    let report = Tolerance::new(1.0, 1.0).check(&actual, &expected);
    assert_eq!(report.violations, 1);
    assert!(report.max_abs_diff.is_nan());
}
