//! # Covariance Matrix Calculations
//!
//! This module provides functions for calculating and manipulating covariance
//! matrices from Jacobian matrices in nonlinear least-squares optimization.

use faer::linalg::solvers::{Llt, Solve};
use faer::{Mat, Side};
use ndarray::{Array1, Array2};

use crate::error::{MultiPeakError, Result};
use crate::utils::matrix_convert::{faer_to_ndarray, ndarray_to_faer};

/// Calculate covariance matrix from Jacobian matrix.
///
/// For nonlinear least-squares problems, the covariance matrix is estimated as:
///   covar = redchi * inv(J^T * J)
/// where:
///   - J is the Jacobian matrix
///   - redchi is the reduced chi-square (chi^2 / dof)
///
/// # Errors
///
/// `LinearAlgebraError` if `J^T J` is not positive definite, which happens
/// when parameters are degenerate or do not affect the model.
pub fn calculate_covariance(jacobian: &Array2<f64>, redchi: f64) -> Result<Array2<f64>> {
    let jtj = jacobian.t().dot(jacobian);
    let n = jtj.nrows();

    let factor = Llt::new(ndarray_to_faer(&jtj).as_ref(), Side::Lower).map_err(|e| {
        MultiPeakError::LinearAlgebraError(format!("J^T J is not positive definite: {:?}", e))
    })?;

    let mut inv = Mat::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 });
    factor.solve_in_place(inv.as_mut());
    let mut covar = faer_to_ndarray(&inv);

    // Solves can leave tiny asymmetry
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = 0.5 * (covar[[i, j]] + covar[[j, i]]);
            covar[[i, j]] = avg;
            covar[[j, i]] = avg;
        }
    }
    covar.mapv_inplace(|v| v * redchi);

    if covar.iter().any(|v| !v.is_finite()) {
        return Err(MultiPeakError::LinearAlgebraError(
            "covariance matrix is not finite".to_string(),
        ));
    }

    Ok(covar)
}

/// Map a covariance matrix through a per-parameter change of variables.
///
/// `derivatives[i]` is d(external_i)/d(internal_i), so
/// `result[i, j] = derivatives[i] * derivatives[j] * covar[i, j]`.
pub fn transform_covariance(covar: &Array2<f64>, derivatives: &[f64]) -> Result<Array2<f64>> {
    if covar.nrows() != derivatives.len() || covar.ncols() != derivatives.len() {
        return Err(MultiPeakError::DimensionMismatch(format!(
            "covariance is {}x{}, got {} derivatives",
            covar.nrows(),
            covar.ncols(),
            derivatives.len()
        )));
    }

    Ok(Array2::from_shape_fn(covar.raw_dim(), |(i, j)| {
        derivatives[i] * derivatives[j] * covar[[i, j]]
    }))
}

/// Calculate correlation matrix from covariance matrix.
///
/// correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    let mut correl = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..n {
            if i == j {
                correl[[i, j]] = 1.0;
            } else {
                let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
                if denom > 0.0 {
                    correl[[i, j]] = covar[[i, j]] / denom;
                }
            }
        }
    }

    correl
}

/// Extract standard errors from the covariance matrix.
///
/// Standard errors are the square roots of the diagonal elements
/// of the covariance matrix.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar
        .diag()
        .mapv(|v| if v > 0.0 { v.sqrt() } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn test_calculate_covariance() {
        // 2 parameters, 3 data points
        let jacobian = arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let redchi = 2.0;

        let covar = calculate_covariance(&jacobian, redchi).unwrap();
        assert_eq!(covar.shape(), &[2, 2]);

        // J^T J = [[35, 44], [44, 56]], det = 24
        assert_relative_eq!(covar[[0, 0]], 2.0 * 56.0 / 24.0, epsilon = 1e-10);
        assert_relative_eq!(covar[[1, 1]], 2.0 * 35.0 / 24.0, epsilon = 1e-10);
        assert_relative_eq!(covar[[0, 1]], -2.0 * 44.0 / 24.0, epsilon = 1e-10);
        assert_eq!(covar[[0, 1]], covar[[1, 0]]);
    }

    #[test]
    fn test_singular_jacobian() {
        // Second parameter has no effect on the residuals
        let jacobian = arr2(&[[1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]);
        assert!(matches!(
            calculate_covariance(&jacobian, 1.0),
            Err(MultiPeakError::LinearAlgebraError(_))
        ));
    }

    #[test]
    fn test_transform_covariance() {
        let covar = arr2(&[[4.0, 1.0], [1.0, 9.0]]);
        let transformed = transform_covariance(&covar, &[0.5, 2.0]).unwrap();

        assert_relative_eq!(transformed[[0, 0]], 1.0);
        assert_relative_eq!(transformed[[0, 1]], 1.0);
        assert_relative_eq!(transformed[[1, 1]], 36.0);

        assert!(transform_covariance(&covar, &[1.0]).is_err());
    }

    #[test]
    fn test_calculate_correlation() {
        let covar = arr2(&[[0.1, 0.05], [0.05, 0.2]]);
        let correl = calculate_correlation(&covar);

        assert_eq!(correl[[0, 0]], 1.0);
        assert_eq!(correl[[1, 1]], 1.0);

        let expected = 0.05 / (0.1f64 * 0.2f64).sqrt();
        assert_relative_eq!(correl[[0, 1]], expected, epsilon = 1e-10);
        assert_relative_eq!(correl[[1, 0]], expected, epsilon = 1e-10);
    }

    #[test]
    fn test_standard_errors_from_covariance() {
        let covar = arr2(&[[0.1, 0.05], [0.05, 0.2]]);
        let errors = standard_errors_from_covariance(&covar);

        assert_eq!(errors.len(), 2);
        assert_relative_eq!(errors[0], 0.1f64.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(errors[1], 0.2f64.sqrt(), epsilon = 1e-10);
    }
}
