//! Step calculation for the Levenberg-Marquardt algorithm.
//!
//! This module computes the Levenberg-Marquardt step, which interpolates
//! between the Gauss-Newton and gradient descent steps.

use faer::linalg::solvers::{Llt, Solve};
use faer::Side;
use ndarray::{Array1, Array2};

use crate::error::{MultiPeakError, Result};
use crate::utils::matrix_convert::{faer_col_to_ndarray, ndarray_to_faer, ndarray_vec_to_faer};

/// Floor for the diagonal scaling, so parameters with a vanishing column in
/// the Jacobian still get damped.
const MIN_DIAGONAL: f64 = 1e-12;

/// Normal equations of the linearized problem at the current point.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    /// J^T J
    pub jtj: Array2<f64>,

    /// Gradient J^T r
    pub gradient: Array1<f64>,
}

impl NormalEquations {
    pub fn new(jacobian: &Array2<f64>, residuals: &Array1<f64>) -> Self {
        Self {
            jtj: jacobian.t().dot(jacobian),
            gradient: jacobian.t().dot(residuals),
        }
    }

    /// Raises each entry of `scale` to the matching diagonal of `J^T J`.
    ///
    /// The damping diagonal only ever grows, so a parameter whose column
    /// temporarily flattens keeps the damping it had earlier.
    pub fn update_scale(&self, scale: &mut Array1<f64>) {
        scale.zip_mut_with(&self.jtj.diag(), |s, &d| *s = s.max(d));
    }

    /// Euclidean norm of the gradient.
    pub fn gradient_norm(&self) -> f64 {
        self.gradient.dot(&self.gradient).sqrt()
    }
}

/// Result of a Levenberg-Marquardt step calculation.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The calculated step vector
    pub step: Array1<f64>,

    /// The reduction in the sum of squares predicted by the linear model
    pub predicted_reduction: f64,
}

/// Handles step calculation for the Levenberg-Marquardt algorithm.
pub struct LmStep;

impl LmStep {
    /// Calculates the Levenberg-Marquardt step.
    ///
    /// Solves `(J^T J + lambda * diag(scale)) step = -J^T r` with a Cholesky
    /// factorization. `scale` is normally the running maximum of the
    /// diagonal of `J^T J`, see [`NormalEquations::update_scale`].
    ///
    /// # Errors
    ///
    /// `LinearAlgebraError` if the damped matrix is not positive definite or
    /// the step is not finite. The caller should increase lambda and retry.
    pub fn calculate_step(
        normal: &NormalEquations,
        scale: &Array1<f64>,
        lambda: f64,
    ) -> Result<StepResult> {
        let mut augmented = normal.jtj.clone();
        for (i, s) in scale.iter().enumerate() {
            augmented[[i, i]] += lambda * s.max(MIN_DIAGONAL);
        }

        let step = Self::solve_cholesky(&augmented, &-&normal.gradient)?;
        if step.iter().any(|v| !v.is_finite()) {
            return Err(MultiPeakError::LinearAlgebraError(
                "step contains non-finite values".to_string(),
            ));
        }

        let predicted_reduction = Self::predicted_reduction(normal, &step);

        Ok(StepResult {
            step,
            predicted_reduction,
        })
    }

    /// Solves the symmetric positive definite system `a * x = b`.
    pub fn solve_cholesky(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
        let a_faer = ndarray_to_faer(a);
        let factor = Llt::new(a_faer.as_ref(), Side::Lower).map_err(|e| {
            MultiPeakError::LinearAlgebraError(format!("Cholesky factorization failed: {:?}", e))
        })?;

        let mut rhs = ndarray_vec_to_faer(b);
        factor.solve_in_place(rhs.as_mut());

        Ok(faer_col_to_ndarray(&rhs))
    }

    /// Reduction of `sum(r^2)` predicted by the linear model `r + J step`.
    ///
    /// Equals `-(2 step·J^T r + step^T J^T J step)`.
    pub fn predicted_reduction(normal: &NormalEquations, step: &Array1<f64>) -> f64 {
        let linear = 2.0 * step.dot(&normal.gradient);
        let quadratic = step.dot(&normal.jtj.dot(step));
        -(linear + quadratic)
    }
}
