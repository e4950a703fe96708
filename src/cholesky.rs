//! Positive-semi-definite repair and Cholesky factorization of the assembled
//! correlation matrix. Legs are capped at 6, so dense decompositions are
//! ample here.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::correlation::AssembledCorrelation;
use crate::types::EvalError;

const EIGENVALUE_FLOOR: f64 = 1e-6;
const RIDGE_START: f64 = 1e-4;
const RIDGE_CAP: f64 = 1e-1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RepairMethod {
    /// The assembled matrix factored as-is.
    Direct,
    /// Eigenvalues clipped to the floor, diagonal rescaled to 1.
    EigenClip,
    /// Ridge blend (1-eps) R + eps I after eigenvalue clipping.
    Ridge { epsilon: f64 },
}

#[derive(Debug, Clone)]
pub struct CorrelationFactor {
    /// Row-major lower-triangular factor L with L * L^T ~= repaired.
    pub lower: Vec<f64>,
    /// The matrix that was actually factored.
    pub repaired: Vec<f64>,
    pub n: usize,
    pub method: RepairMethod,
}

impl CorrelationFactor {
    pub fn lower_at(&self, i: usize, j: usize) -> f64 {
        self.lower[i * self.n + j]
    }

    /// Max-norm reconstruction error against a reference matrix.
    pub fn reconstruction_error(&self, reference: &[f64]) -> f64 {
        let n = self.n;
        let mut worst = 0.0_f64;
        for i in 0..n {
            for j in 0..n {
                let mut acc = 0.0;
                for k in 0..=i.min(j) {
                    acc += self.lower[i * n + k] * self.lower[j * n + k];
                }
                worst = worst.max((acc - reference[i * n + j]).abs());
            }
        }
        worst
    }
}

/// Factor the assembled correlation, repairing indefiniteness by eigenvalue
/// clipping and, as a last resort, ridge escalation.
pub fn factor(corr: &AssembledCorrelation) -> Result<CorrelationFactor, EvalError> {
    let n = corr.n;
    let matrix = DMatrix::from_row_slice(n, n, &corr.matrix);

    if let Some(f) = try_cholesky(&matrix) {
        return Ok(build(f, &matrix, n, RepairMethod::Direct));
    }

    // Eigenvalue clip, then rescale back to a unit-diagonal correlation.
    let eigen = matrix.clone().symmetric_eigen();
    let clipped = DVector::from_iterator(
        n,
        eigen.eigenvalues.iter().map(|l| l.max(EIGENVALUE_FLOOR)),
    );
    let mut repaired =
        &eigen.eigenvectors * DMatrix::from_diagonal(&clipped) * eigen.eigenvectors.transpose();
    unit_diagonal_rescale(&mut repaired);

    if let Some(f) = try_cholesky(&repaired) {
        debug!("correlation repaired by eigenvalue clip");
        return Ok(build(f, &repaired, n, RepairMethod::EigenClip));
    }

    // Ridge escalation on the clipped matrix. The blend keeps the diagonal
    // at exactly 1.
    let mut epsilon = RIDGE_START;
    while epsilon <= RIDGE_CAP {
        let ridged = repaired.map(|x| (1.0 - epsilon) * x) + DMatrix::identity(n, n) * epsilon;
        if let Some(f) = try_cholesky(&ridged) {
            warn!(epsilon, "correlation repaired by ridge escalation");
            return Ok(build(f, &ridged, n, RepairMethod::Ridge { epsilon }));
        }
        epsilon *= 2.0;
    }

    Err(EvalError::NonRepairableCorrelation)
}

fn try_cholesky(matrix: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    nalgebra::linalg::Cholesky::new(matrix.clone()).map(|c| c.l())
}

fn unit_diagonal_rescale(matrix: &mut DMatrix<f64>) {
    let n = matrix.nrows();
    let scale: Vec<f64> = (0..n).map(|i| matrix[(i, i)].max(1e-12).sqrt()).collect();
    for i in 0..n {
        for j in 0..n {
            matrix[(i, j)] /= scale[i] * scale[j];
        }
    }
    for i in 0..n {
        matrix[(i, i)] = 1.0;
    }
}

fn build(lower: DMatrix<f64>, repaired: &DMatrix<f64>, n: usize, method: RepairMethod) -> CorrelationFactor {
    let mut lower_rows = vec![0.0; n * n];
    let mut repaired_rows = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            lower_rows[i * n + j] = if j <= i { lower[(i, j)] } else { 0.0 };
            repaired_rows[i * n + j] = repaired[(i, j)];
        }
    }
    CorrelationFactor {
        lower: lower_rows,
        repaired: repaired_rows,
        n,
        method,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembled(n: usize, matrix: Vec<f64>) -> AssembledCorrelation {
        AssembledCorrelation {
            matrix,
            n,
            imputed_pairs: vec![],
        }
    }

    #[test]
    fn psd_matrix_factors_directly() {
        let corr = assembled(3, vec![1.0, 0.5, 0.2, 0.5, 1.0, 0.3, 0.2, 0.3, 1.0]);
        let f = factor(&corr).unwrap();
        assert_eq!(f.method, RepairMethod::Direct);
        assert!(f.reconstruction_error(&corr.matrix) <= 1e-6);
    }

    #[test]
    fn identity_factors_to_identity() {
        let corr = assembled(2, vec![1.0, 0.0, 0.0, 1.0]);
        let f = factor(&corr).unwrap();
        assert_eq!(f.method, RepairMethod::Direct);
        assert!((f.lower_at(0, 0) - 1.0).abs() < 1e-12);
        assert!((f.lower_at(1, 1) - 1.0).abs() < 1e-12);
        assert_eq!(f.lower_at(0, 1), 0.0);
    }

    #[test]
    fn small_negative_eigenvalue_is_clipped() {
        // Eigenvalues of [[1, 1.05], [1.05, 1]] are -0.05 and 2.05.
        let corr = assembled(2, vec![1.0, 1.05, 1.05, 1.0]);
        let f = factor(&corr).unwrap();
        assert_eq!(f.method, RepairMethod::EigenClip);
        assert!(f.reconstruction_error(&f.repaired) <= 1e-6);
        // Repaired matrix keeps a unit diagonal.
        assert!((f.repaired[0] - 1.0).abs() < 1e-9);
        assert!((f.repaired[3] - 1.0).abs() < 1e-9);
        // And stays close to the original off-diagonal.
        assert!(f.repaired[1] > 0.9 && f.repaired[1] < 1.0);
    }

    #[test]
    fn indefinite_three_leg_matrix_repairs() {
        let corr = assembled(
            3,
            vec![1.0, 0.9, 0.9, 0.9, 1.0, -0.9, 0.9, -0.9, 1.0],
        );
        let f = factor(&corr).unwrap();
        assert_ne!(f.method, RepairMethod::Direct);
        assert!(f.reconstruction_error(&f.repaired) <= 1e-6);
        for i in 0..3 {
            assert!((f.repaired[i * 3 + i] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn reconstruction_matches_lower_times_transpose() {
        let corr = assembled(2, vec![1.0, 0.65, 0.65, 1.0]);
        let f = factor(&corr).unwrap();
        // L for [[1, r], [r, 1]] is [[1, 0], [r, sqrt(1 - r^2)]].
        assert!((f.lower_at(1, 0) - 0.65).abs() < 1e-12);
        assert!((f.lower_at(1, 1) - (1.0 - 0.65_f64 * 0.65).sqrt()).abs() < 1e-12);
    }
}
