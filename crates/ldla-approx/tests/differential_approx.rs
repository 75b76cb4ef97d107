//! Differential oracle, metamorphic relation, and adversarial tests for the
//! approximate LDL operations.
//!
//! Oracle values are hand-computed from the pivot rule or follow from the
//! identity `B = P^T L D L^H P` between the two output forms.

use ldla_approx::{
    ApproxError, ApproximationOptions, BoundValue, DecompositionType, HermitianStorage,
    InputMatrix, LdlDecomposition, PermutationMethod, approximate_matrix,
    approximate_matrix_with_evidence, decomposition, decomposition_as, positive_definite_matrix,
    positive_semidefinite_matrix,
};
use ldla_runtime::{PivotCase, PivotEvidenceLedger, RuntimeMode, assert_close, assert_close_slice};
use ldla_sparse::{CscMatrix, CsrMatrix, DenseBridge, FormatConvertible, random_hermitian};
use nalgebra::{Complex, DMatrix};

const ATOL: f64 = 1e-10;
const RTOL: f64 = 1e-10;

fn dense(n: usize, values: &[f64]) -> HermitianStorage<f64> {
    HermitianStorage::Dense(DMatrix::from_row_slice(n, n, values))
}

/// Indefinite, well-separated test matrix used across several relations.
fn indefinite() -> HermitianStorage<f64> {
    dense(
        4,
        &[
            2.0, 1.0, 0.0, 0.5, //
            1.0, -1.0, 0.3, 0.0, //
            0.0, 0.3, 0.5, 1.5, //
            0.5, 0.0, 1.5, -2.0,
        ],
    )
}

fn assert_dense_close(actual: &DMatrix<f64>, expected: &DMatrix<f64>) {
    assert_eq!(actual.shape(), expected.shape(), "shape mismatch");
    for row in 0..actual.nrows() {
        for col in 0..actual.ncols() {
            let (a, e) = (actual[(row, col)], expected[(row, col)]);
            assert!(
                (a - e).abs() <= ATOL + RTOL * e.abs(),
                "[{row},{col}]: actual={a} expected={e} diff={}",
                (a - e).abs()
            );
        }
    }
}

fn assert_complex_close(actual: &DMatrix<Complex<f64>>, expected: &DMatrix<Complex<f64>>) {
    assert_eq!(actual.shape(), expected.shape(), "shape mismatch");
    for row in 0..actual.nrows() {
        for col in 0..actual.ncols() {
            let diff = (actual[(row, col)] - expected[(row, col)]).norm();
            assert!(
                diff <= ATOL + RTOL * expected[(row, col)].norm(),
                "[{row},{col}]: actual={} expected={} diff={diff}",
                actual[(row, col)],
                expected[(row, col)]
            );
        }
    }
}

fn natural() -> ApproximationOptions {
    ApproximationOptions {
        permutation: PermutationMethod::Natural,
        ..ApproximationOptions::default()
    }
}

fn dense_result(storage: &HermitianStorage<f64>) -> DMatrix<f64> {
    assert!(matches!(storage, HermitianStorage::Dense(_)), "expected dense output");
    storage.to_dense()
}

// ═══════════════════════════════════════════════════════════════════
// §1  Differential Oracle Tests
// ═══════════════════════════════════════════════════════════════════

// Identity: every pivot admissible, nothing changes.
#[test]
fn diff_identity_is_its_own_decomposition() {
    let identity = dense(2, &[1.0, 0.0, 0.0, 1.0]);
    let ldl = decomposition(&identity, &ApproximationOptions::default()).expect("identity");
    assert_eq!(ldl.d, vec![1.0, 1.0]);
    assert_eq!(ldl.p, vec![0, 1]);
    assert_eq!(ldl.omega, vec![1.0, 1.0]);
    assert_eq!(ldl.delta, vec![0.0, 0.0]);
    assert_dense_close(&ldl.l.to_dense(), &DMatrix::identity(2, 2));
}

// SPD 2x2: d = [4, 3 - 1] with l = 0.5, B = A.
#[test]
fn diff_positive_definite_pivots_by_hand() {
    let a = dense(2, &[4.0, 2.0, 2.0, 3.0]);
    let ldl = decomposition(&a, &natural()).expect("spd");
    assert_close_slice(&ldl.d, &[4.0, 2.0], ATOL, RTOL);
    assert_close(ldl.l.entry(1, 0), 0.5, ATOL, RTOL);
    assert_close_slice(&ldl.delta, &[0.0, 0.0], ATOL, RTOL);
    assert_dense_close(&ldl.composed_matrix(), &a.to_dense());
}

// [[0, 2], [2, 0]] with the defaults: both pivots snap to zero, the coupling
// cannot be represented and B loses it.
#[test]
fn diff_zero_diagonal_with_zero_pivots() {
    let a = dense(2, &[0.0, 2.0, 2.0, 0.0]);
    let ldl = decomposition(&a, &ApproximationOptions::default()).expect("decompose");
    assert_eq!(ldl.d, vec![0.0, 0.0]);
    assert_eq!(ldl.delta, vec![0.0, 0.0]);

    let b = approximate_matrix(&a, &ApproximationOptions::default()).expect("approximate");
    assert_dense_close(&dense_result(&b), &DMatrix::zeros(2, 2));
}

// Same matrix with min_diag_d = 1: the first pivot is lifted to 1, the second
// index is fixed with omega in (0, 1) and a positive diagonal change.
#[test]
fn diff_zero_diagonal_with_lifted_pivots() {
    let a = dense(2, &[0.0, 2.0, 2.0, 0.0]);
    let options = ApproximationOptions {
        min_diag_d: Some(1.0),
        ..ApproximationOptions::default()
    };
    let mut ledger = PivotEvidenceLedger::new(16);
    let b = approximate_matrix_with_evidence(&a, &options, &mut ledger).expect("approximate");
    let ldl = decomposition(&a, &options).expect("decompose");

    assert_eq!(ldl.p, vec![0, 1]);
    assert_close(ldl.d[0], 1.0, ATOL, RTOL);
    assert!(ldl.d[1] >= 1.0);
    assert!(ldl.omega[1] > 0.0 && ldl.omega[1] < 1.0);
    assert!(ldl.delta.iter().all(|&delta| delta > 0.0));
    assert_eq!(ledger.len(), 2);
    assert!(ledger.iter().any(|entry| entry.case == PivotCase::Boundary));

    let b = dense_result(&b);
    assert_dense_close(&b, &ldl.composed_matrix());
    assert_close(b[(0, 0)], ldl.delta[0], ATOL, RTOL);
    assert_close(b[(0, 1)], 2.0 * ldl.omega[1], ATOL, RTOL);
}

// An upper bound on B below the diagonal forces a negative change.
#[test]
fn diff_max_diag_b_caps_the_diagonal() {
    let a = dense(2, &[5.0, 0.0, 0.0, 1.0]);
    let options = ApproximationOptions {
        max_diag_b: Some(BoundValue::Scalar(3.0)),
        permutation: PermutationMethod::Natural,
        ..ApproximationOptions::default()
    };
    let ldl = decomposition(&a, &options).expect("decompose");
    assert_close_slice(&ldl.d, &[3.0, 1.0], ATOL, RTOL);
    assert_close_slice(&ldl.delta, &[-2.0, 0.0], ATOL, RTOL);
}

// Per-index lower bound on B.
#[test]
fn diff_vector_min_diag_b() {
    let a = dense(3, &[1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, 2.0]);
    let options = ApproximationOptions {
        min_diag_b: Some(BoundValue::Vector(vec![0.0, 0.5, 3.0])),
        permutation: PermutationMethod::Natural,
        ..ApproximationOptions::default()
    };
    let b = dense_result(&approximate_matrix(&a, &options).expect("approximate"));
    assert_close_slice(&[b[(0, 0)], b[(1, 1)], b[(2, 2)]], &[1.0, 0.5, 3.0], ATOL, RTOL);
}

// ═══════════════════════════════════════════════════════════════════
// §2  Metamorphic Relations
// ═══════════════════════════════════════════════════════════════════

// The approximation equals the product of its decomposition.
#[test]
fn meta_approximation_matches_decomposition() {
    let a = indefinite();
    for method in [
        PermutationMethod::Natural,
        PermutationMethod::DecreasingDiagonalValues,
        PermutationMethod::IncreasingAbsoluteDiagonalValues,
        PermutationMethod::MinimalDifference,
    ] {
        let options = ApproximationOptions {
            min_diag_d: Some(0.1),
            permutation: method,
            ..ApproximationOptions::default()
        };
        let ldl = decomposition(&a, &options).expect("decompose");
        let b = approximate_matrix(&a, &options).expect("approximate");
        assert_dense_close(&dense_result(&b), &ldl.composed_matrix());
    }
}

// A positive definite input is returned unchanged.
#[test]
fn meta_positive_definite_input_is_fixed_point() {
    let a = dense(
        3,
        &[4.0, 1.0, 0.5, 1.0, 3.0, 0.25, 0.5, 0.25, 2.0],
    );
    let ldl = decomposition(&a, &ApproximationOptions::default()).expect("decompose");
    assert!(ldl.omega.iter().all(|&omega| omega == 1.0));
    assert_close_slice(&ldl.delta, &[0.0; 3], ATOL, RTOL);
    let b = approximate_matrix(&a, &ApproximationOptions::default()).expect("approximate");
    assert_dense_close(&dense_result(&b), &a.to_dense());
}

// Approximating an approximation changes nothing.
#[test]
fn meta_approximation_is_idempotent() {
    let options = ApproximationOptions {
        min_diag_d: Some(0.2),
        permutation: PermutationMethod::Natural,
        ..ApproximationOptions::default()
    };
    let once = approximate_matrix(&indefinite(), &options).expect("first");
    let twice = approximate_matrix(&once, &options).expect("second");
    let (once, twice) = (once.to_dense(), twice.to_dense());
    for row in 0..4 {
        for col in 0..4 {
            assert!((once[(row, col)] - twice[(row, col)]).abs() < 1e-8);
        }
    }
}

// Dense, CSR and CSC inputs give the same approximation in their own format.
#[test]
fn meta_storage_formats_agree() {
    let a = indefinite().to_dense();
    let csr = CsrMatrix::from_dense(&a).expect("csr");
    let csc = CscMatrix::from_dense(&a).expect("csc");
    let options = ApproximationOptions {
        min_diag_d: Some(0.1),
        ..ApproximationOptions::default()
    };

    let from_dense = approximate_matrix(&HermitianStorage::Dense(a), &options).expect("dense");
    let from_csr = approximate_matrix(&HermitianStorage::Csr(csr), &options).expect("csr");
    let from_csc = approximate_matrix(&HermitianStorage::Csc(csc), &options).expect("csc");

    assert!(matches!(from_csr, HermitianStorage::Csr(_)));
    assert!(matches!(from_csc, HermitianStorage::Csc(_)));
    let expected = from_dense.to_dense();
    assert_dense_close(&from_csr.to_dense(), &expected);
    assert_dense_close(&from_csc.to_dense(), &expected);
}

// Transferring the storage yields the same result as borrowing it.
#[test]
fn meta_owned_input_matches_borrowed() {
    let options = ApproximationOptions {
        min_diag_d: Some(0.1),
        ..ApproximationOptions::default()
    };
    let borrowed = approximate_matrix(&indefinite(), &options).expect("borrowed");
    let owned = approximate_matrix(indefinite(), &options).expect("owned");
    assert_dense_close(&owned.to_dense(), &borrowed.to_dense());

    let csr = HermitianStorage::Csr(
        random_hermitian(12, 0.3, 7).expect("random"),
    );
    let borrowed = approximate_matrix(&csr, &options).expect("borrowed csr");
    let owned = approximate_matrix(csr.clone(), &options).expect("owned csr");
    assert!(matches!(owned, HermitianStorage::Csr(_)));
    assert_dense_close(&owned.to_dense(), &borrowed.to_dense());

    let ldl_borrowed = decomposition(&csr, &options).expect("borrowed ldl");
    let ldl_owned = decomposition(InputMatrix::Owned(csr), &options).expect("owned ldl");
    assert_eq!(ldl_owned.p, ldl_borrowed.p);
    assert_close_slice(&ldl_owned.d, &ldl_borrowed.d, ATOL, RTOL);
}

// Every decomposition layout composes to the same matrix.
#[test]
fn meta_decomposition_layouts_compose_equally() {
    let options = ApproximationOptions {
        min_diag_d: Some(0.05),
        ..ApproximationOptions::default()
    };
    let a = indefinite();
    let expected = decomposition(&a, &options).expect("ldl").composed_matrix();
    for kind in [
        DecompositionType::Ldl,
        DecompositionType::LdlCompressed,
        DecompositionType::Ll,
    ] {
        let layout = decomposition_as(&a, &options, kind).expect("layout");
        assert_eq!(layout.kind(), kind);
        assert_dense_close(&layout.composed_matrix(), &expected);
    }
}

// The approximation of a Hermitian input is Hermitian.
#[test]
fn meta_complex_output_is_hermitian() {
    let i = Complex::new(0.0, 1.0);
    let one = Complex::new(1.0, 0.0);
    let a = DMatrix::from_row_slice(
        3,
        3,
        &[
            one * 1.0,
            one + i * 2.0,
            i * 0.5,
            one - i * 2.0,
            -one,
            one * 0.25,
            -i * 0.5,
            one * 0.25,
            one * 0.5,
        ],
    );
    let storage = HermitianStorage::Dense(a);
    let options = ApproximationOptions {
        min_diag_d: Some(0.1),
        ..ApproximationOptions::default()
    };
    let ldl: LdlDecomposition<Complex<f64>> = decomposition(&storage, &options).expect("ldl");
    let b = approximate_matrix(&storage, &options).expect("approximate").to_dense();

    assert_complex_close(&b, &b.adjoint());
    assert_complex_close(&b, &ldl.composed_matrix());
    for index in 0..3 {
        assert_eq!(b[(index, index)].im, 0.0);
    }
}

// Integer input is promoted to f64 when borrowed.
#[test]
fn meta_integer_input_matches_float() {
    let ints = HermitianStorage::Dense(DMatrix::from_row_slice(2, 2, &[2_i64, 1, 1, 2]));
    let floats = dense(2, &[2.0, 1.0, 1.0, 2.0]);
    let from_ints = approximate_matrix(&ints, &natural()).expect("ints");
    let from_floats = approximate_matrix(&floats, &natural()).expect("floats");
    assert_dense_close(&from_ints.to_dense(), &from_floats.to_dense());
}

// ═══════════════════════════════════════════════════════════════════
// §3  Bound Guarantees
// ═══════════════════════════════════════════════════════════════════

#[test]
fn bounds_hold_on_random_sparse_matrix() {
    let csr = HermitianStorage::Csr(random_hermitian(20, 0.25, 42).expect("random"));
    let options = ApproximationOptions {
        min_diag_b: Some(BoundValue::Scalar(-0.5)),
        max_diag_b: Some(BoundValue::Scalar(4.0)),
        min_diag_d: Some(0.01),
        max_diag_d: Some(10.0),
        min_abs_value_d: Some(0.05),
        ..ApproximationOptions::default()
    };
    let ldl = decomposition(&csr, &options).expect("ldl");
    for &d in &ldl.d {
        assert!(d == 0.0 || d >= 0.05 - 1e-8, "pivot {d} below min_abs_value_d");
        assert!(d >= 0.01 - 1e-8 && d <= 10.0 + 1e-8, "pivot {d} out of range");
    }
    assert!(ldl.omega.iter().all(|&omega| omega >= 0.0 && omega.is_finite()));

    let b = approximate_matrix(&csr, &options).expect("approximate").to_dense();
    for index in 0..20 {
        assert!((-0.5..=4.0).contains(&b[(index, index)]));
    }
}

#[test]
fn positive_definite_result_has_cholesky() {
    let options = ApproximationOptions {
        min_diag_d: Some(0.1),
        ..ApproximationOptions::default()
    };
    let b = positive_definite_matrix(&indefinite(), &options).expect("pd").to_dense();
    assert!(b.cholesky().is_some(), "approximation must be positive definite");

    // eigenvalues 3 and -1; the last pivot drops to zero and B becomes singular
    let a = dense(2, &[1.0, 2.0, 2.0, 1.0]);
    let psd = positive_semidefinite_matrix(&a, &ApproximationOptions::default())
        .expect("psd")
        .to_dense();
    let eigenvalues = psd.symmetric_eigenvalues();
    assert!(eigenvalues.iter().all(|&lambda| lambda > -1e-10));
    assert!(eigenvalues.iter().any(|&lambda| lambda.abs() < 1e-10));
}

#[test]
fn positive_definite_default_floor_is_sqrt_eps() {
    let mut ledger = PivotEvidenceLedger::new(8);
    ldla_approx::positive_definite_matrix_with_evidence(
        &dense(2, &[-1.0, 0.0, 0.0, 2.0]),
        &ApproximationOptions::default(),
        &mut ledger,
    )
    .expect("pd");
    assert_eq!(ledger.len(), 2);
    assert!(ledger.iter().all(|entry| entry.d >= f64::EPSILON.sqrt()));
}

// ═══════════════════════════════════════════════════════════════════
// §4  Adversarial Inputs
// ═══════════════════════════════════════════════════════════════════

#[test]
fn adv_rejects_non_square() {
    let a = HermitianStorage::Dense(DMatrix::<f64>::zeros(2, 3));
    let err = decomposition(&a, &ApproximationOptions::default()).expect_err("non-square");
    assert_eq!(err, ApproxError::NotSquare { rows: 2, cols: 3 });
}

#[test]
fn adv_rejects_complex_diagonal() {
    let a = HermitianStorage::Dense(DMatrix::from_row_slice(
        2,
        2,
        &[
            Complex::new(1.0, 0.0),
            Complex::new(0.0, 1.0),
            Complex::new(0.0, -1.0),
            Complex::new(1.0, 0.5),
        ],
    ));
    let err = approximate_matrix(&a, &ApproximationOptions::default()).expect_err("diag");
    assert_eq!(
        err,
        ApproxError::ComplexDiagonal {
            index: 1,
            imaginary: 0.5
        }
    );
}

#[test]
fn adv_rejects_bad_bounds() {
    let a = indefinite();
    let wrong_shape = ApproximationOptions {
        min_diag_b: Some(BoundValue::Vector(vec![0.0; 3])),
        ..ApproximationOptions::default()
    };
    assert!(matches!(
        decomposition(&a, &wrong_shape),
        Err(ApproxError::BoundWrongShape { expected: 4, actual: 3, .. })
    ));

    let inconsistent = ApproximationOptions {
        min_diag_b: Some(BoundValue::Scalar(2.0)),
        max_diag_b: Some(BoundValue::Scalar(1.0)),
        ..ApproximationOptions::default()
    };
    assert!(matches!(
        decomposition(&a, &inconsistent),
        Err(ApproxError::InconsistentBounds { .. })
    ));

    let negative_floor = ApproximationOptions {
        min_diag_d: Some(-1.0),
        ..ApproximationOptions::default()
    };
    assert!(matches!(
        decomposition(&a, &negative_floor),
        Err(ApproxError::BoundBelowMinimum { .. })
    ));
}

#[test]
fn adv_positive_definite_rejects_zero_floor() {
    let options = ApproximationOptions {
        min_diag_d: Some(0.0),
        ..ApproximationOptions::default()
    };
    let err = positive_definite_matrix(&indefinite(), &options).expect_err("zero floor");
    assert!(matches!(err, ApproxError::UnsupportedOption { .. }));
}

#[test]
fn adv_ll_rejects_negative_pivots_only_when_present() {
    let a = dense(2, &[4.0, 0.0, 0.0, 1.0]);
    let layout = decomposition_as(&a, &ApproximationOptions::default(), DecompositionType::Ll);
    assert!(layout.is_ok());
}

#[test]
fn adv_integer_owned_storage_is_rejected() {
    let ints = HermitianStorage::Dense(DMatrix::from_row_slice(2, 2, &[2_i32, 1, 1, 2]));
    let err = approximate_matrix(ints, &ApproximationOptions::default()).expect_err("owned int");
    assert!(matches!(err, ApproxError::UnsupportedOption { .. }));
}

#[test]
fn adv_hardened_mode_checks_entries() {
    let hardened = ApproximationOptions {
        mode: RuntimeMode::Hardened,
        ..ApproximationOptions::default()
    };
    let nan = dense(2, &[1.0, f64::NAN, f64::NAN, 1.0]);
    assert!(matches!(
        decomposition(&nan, &hardened),
        Err(ApproxError::NonFiniteInput { .. })
    ));

    let skew = dense(2, &[1.0, 2.0, 3.0, 1.0]);
    assert_eq!(
        decomposition(&skew, &hardened).expect_err("not hermitian"),
        ApproxError::NotHermitian { row: 0, col: 1 }
    );

    // strict mode skips the entry checks
    let strict = decomposition(&skew, &natural());
    assert!(strict.is_ok());
}

#[test]
fn adv_failed_validation_leaves_owned_input_untouched() {
    // errors are raised before any elimination, so nothing is half written
    let csc = HermitianStorage::Csc(
        CsrMatrix::from_dense(&indefinite().to_dense())
            .expect("csr")
            .to_csc()
            .expect("csc"),
    );
    let bad = ApproximationOptions {
        max_diag_d: Some(f64::NAN),
        ..ApproximationOptions::default()
    };
    let err = approximate_matrix(csc, &bad).expect_err("nan bound");
    assert!(matches!(err, ApproxError::BoundNotFinite { name: "max_diag_d", .. }));
}

#[test]
fn adv_empty_matrix() {
    let empty = HermitianStorage::Dense(DMatrix::<f64>::zeros(0, 0));
    let ldl = decomposition(&empty, &ApproximationOptions::default()).expect("empty");
    assert!(ldl.d.is_empty() && ldl.p.is_empty());
    let b = approximate_matrix(&empty, &ApproximationOptions::default()).expect("empty");
    assert_eq!(b.shape(), (0, 0));
}
