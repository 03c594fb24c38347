use approx::assert_relative_eq;
use nalgebra::DMatrix;

use crate::config::RankerConfig;
use crate::error::{BandSelectError, Diagnostic, ToleranceCheck};
use crate::linalg::pseudo_inverse;
use crate::ranker::{BandRanker, band_scores, numerical_rank, select_top_bands};
use crate::tests::init;
use crate::tests::test_data::random_matrix;
use crate::tolerance::Tolerance;

// ─────────────────────────────────────────────────────────────────────────────
// Rank and pseudo-inverse
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_pseudo_inverse_satisfies_penrose_conditions() {
    for seed in [1, 2, 3, 4] {
        let a = random_matrix(8, 3, seed);
        assert_eq!(numerical_rank(&a, None).unwrap(), 3);

        let w = pseudo_inverse(&a, 1e-15).unwrap();
        assert_eq!(w.shape(), (3, 8));

        let awa = &a * &w * &a;
        assert!(
            (awa - &a).norm() < 1e-10,
            "‖A·W·A − A‖ too large for seed {}",
            seed
        );
        let waw = &w * &a * &w;
        assert!((waw - &w).norm() < 1e-10);
        // full column rank: W is a left inverse
        assert_relative_eq!(&w * &a, DMatrix::<f64>::identity(3, 3), epsilon = 1e-10);
    }
}

#[test]
fn test_rank_of_duplicated_column() {
    let a = DMatrix::from_row_slice(
        5,
        3,
        &[
            1.0, 2.0, 1.0, //
            2.0, 0.0, 2.0, //
            3.0, 1.0, 3.0, //
            4.0, 3.0, 4.0, //
            5.0, 1.0, 5.0,
        ],
    );
    assert_eq!(numerical_rank(&a, None).unwrap(), 2);
}

#[test]
fn test_rank_tolerance_override() {
    let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1e-3, 0.0, 0.0]);
    assert_eq!(numerical_rank(&a, None).unwrap(), 2);
    assert_eq!(numerical_rank(&a, Some(1e-2)).unwrap(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Scoring and selection
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_band_scores_are_column_abs_sums() {
    let w = DMatrix::from_row_slice(2, 3, &[1.0, -2.0, 0.0, -0.5, 0.5, 3.0]);
    let scores = band_scores(&w);
    assert_eq!(scores, vec![1.5, 2.5, 3.0]);
}

#[test]
fn test_scores_are_non_negative() {
    for seed in 0..5 {
        let a = random_matrix(12, 4, seed);
        let out = BandRanker::with_defaults().execute(&a, 3).unwrap();
        assert_eq!(out.scores.len(), 12);
        assert!(out.scores.iter().all(|&s| s >= 0.0));
    }
}

#[test]
fn test_known_pseudo_inverse_scores() {
    init();
    // pinv = [[1, 0, 0], [0, 0.5, 0]]
    let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
    let out = BandRanker::with_defaults().execute(&a, 2).unwrap();

    assert_eq!(out.rank, 2);
    assert_relative_eq!(out.scores[0], 1.0, epsilon = 1e-12);
    assert_relative_eq!(out.scores[1], 0.5, epsilon = 1e-12);
    assert_relative_eq!(out.scores[2], 0.0, epsilon = 1e-12);
    // ascending score, 1-based
    assert_eq!(out.selected, vec![2, 1]);
    assert!(out.diagnostics.is_empty());
}

#[test]
fn test_select_all_bands_returns_each_once() {
    let scores = vec![0.3, 0.9, 0.1, 0.5, 0.7, 0.2];
    let selected = select_top_bands(&scores, scores.len());

    assert_eq!(selected, vec![3, 6, 1, 4, 5, 2]);
    let mut sorted = selected.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (1..=6).collect::<Vec<_>>());
}

#[test]
fn test_select_zero_bands_is_empty() {
    assert!(select_top_bands(&[0.3, 0.9, 0.1], 0).is_empty());
}

#[test]
fn test_select_more_than_available_caps_at_all_bands() {
    let selected = select_top_bands(&[0.3, 0.9, 0.1], 10);
    assert_eq!(selected, vec![3, 1, 2]);
}

#[test]
fn test_select_ties_are_deterministic() {
    assert_eq!(select_top_bands(&[1.0, 1.0, 0.5], 2), vec![1, 2]);
    assert_eq!(select_top_bands(&[1.0, 1.0, 0.5], 1), vec![2]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure modes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_degenerate_mixing_matrix_rejected() {
    init();
    let a = DMatrix::from_row_slice(
        5,
        3,
        &[
            1.0, 2.0, 1.0, //
            2.0, 0.0, 2.0, //
            3.0, 1.0, 3.0, //
            4.0, 3.0, 4.0, //
            5.0, 1.0, 5.0,
        ],
    );

    let err = BandRanker::with_defaults().execute(&a, 2).unwrap_err();
    assert!(matches!(
        err,
        BandSelectError::DegenerateMixingMatrix {
            rank: 2,
            n_components: 3
        }
    ));
}

#[test]
fn test_configured_rank_tolerance_rejects_ill_conditioned() {
    let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1e-3, 0.0, 0.0]);
    let ranker = BandRanker::new(RankerConfig {
        rank_tolerance: Some(1e-2),
        ..Default::default()
    });
    assert!(matches!(
        ranker.execute(&a, 1),
        Err(BandSelectError::DegenerateMixingMatrix { rank: 1, .. })
    ));
}

#[test]
fn test_non_finite_mixing_rejected() {
    let mut a = random_matrix(4, 2, 5);
    a[(1, 1)] = f64::NAN;
    assert!(matches!(
        BandRanker::with_defaults().execute(&a, 2),
        Err(BandSelectError::NonFinite(_))
    ));
}

#[test]
fn test_pinv_check_can_be_disabled() {
    let a = random_matrix(6, 3, 8);
    let ranker = BandRanker::new(RankerConfig {
        pinv_check: None,
        ..Default::default()
    });
    let out = ranker.execute(&a, 2).unwrap();
    assert!(
        !out.diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::NumericalTolerance { .. }))
    );
    assert_eq!(out.selected.len(), 2);
}

#[test]
fn test_failed_pinv_check_warns_and_still_selects() {
    init();
    let a = random_matrix(6, 3, 8);
    // no difference can be within a negative absolute tolerance
    let ranker = BandRanker::new(RankerConfig {
        pinv_check: Some(Tolerance::new(-1.0, 0.0)),
        ..Default::default()
    });

    let out = ranker.execute(&a, 2).unwrap();
    assert_eq!(out.diagnostics.len(), 1);
    match &out.diagnostics[0] {
        Diagnostic::NumericalTolerance { check, report } => {
            assert_eq!(*check, ToleranceCheck::PseudoInverse);
            assert_eq!(report.violations, 18);
            assert_eq!(report.total, 18);
        }
        other => panic!("unexpected diagnostic {:?}", other),
    }
    assert_eq!(out.selected.len(), 2);
    assert_eq!(out.scores.len(), 6);
}

#[test]
fn test_empty_mixing_rejected() {
    assert!(matches!(
        BandRanker::with_defaults().execute(&DMatrix::zeros(5, 0), 2),
        Err(BandSelectError::EmptyInput { rows: 5, cols: 0 })
    ));
    assert!(matches!(
        BandRanker::with_defaults().execute(&DMatrix::zeros(0, 3), 2),
        Err(BandSelectError::EmptyInput { rows: 0, cols: 3 })
    ));
    assert!(matches!(
        numerical_rank(&DMatrix::zeros(0, 0), None),
        Err(BandSelectError::EmptyInput { .. })
    ));
}
