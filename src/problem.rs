//! Problem definition trait.
//!
//! This module defines the `Problem` trait, which represents a nonlinear
//! least squares problem to be solved with the Levenberg-Marquardt algorithm.
//! The fit driver reaches the optimizer only through this trait.

use crate::error::Result;
use ndarray::{Array1, Array2};

/// A trait representing a nonlinear least squares problem.
///
/// This trait defines the interface for problems that can be solved using
/// the Levenberg-Marquardt algorithm.
pub trait Problem {
    /// Evaluate the residuals at the given parameters.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values at which to evaluate the residuals
    ///
    /// # Returns
    ///
    /// * A vector of residuals, or an error if the evaluation fails
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Evaluate the Jacobian matrix of the residuals at the given parameters.
    ///
    /// The default implementation uses forward finite differences.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// Check if this problem provides a custom Jacobian implementation.
    ///
    /// If this returns false, the optimizer computes the Jacobian by finite
    /// differences with its own step size.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Evaluate the sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MultiPeakError;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1, Array2};

    /// A single Gaussian peak with unit width: f(x) = a * exp(-(x - c)^2 / 2)
    struct PeakProblem {
        x_data: Array1<f64>,
        y_data: Array1<f64>,
    }

    impl PeakProblem {
        fn new(a: f64, c: f64) -> Self {
            let x_data = Array1::linspace(-3.0, 3.0, 13);
            let y_data = x_data.mapv(|x| a * (-(x - c).powi(2) / 2.0).exp());
            Self { x_data, y_data }
        }
    }

    impl Problem for PeakProblem {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            if params.len() != 2 {
                return Err(MultiPeakError::DimensionMismatch(format!(
                    "Expected 2 parameters, got {}",
                    params.len()
                )));
            }

            let (a, c) = (params[0], params[1]);
            Ok(&self.y_data - &self.x_data.mapv(|x| a * (-(x - c).powi(2) / 2.0).exp()))
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            self.x_data.len()
        }
    }

    #[test]
    fn test_eval_at_solution() {
        let problem = PeakProblem::new(2.0, 0.5);
        let residuals = problem.eval(&array![2.0, 0.5]).unwrap();

        assert_eq!(residuals.len(), 13);
        for r in residuals.iter() {
            assert_relative_eq!(*r, 0.0, epsilon = 1e-12);
        }
        assert!(problem.eval(&array![1.0]).is_err());
    }

    #[test]
    fn test_default_jacobian() {
        let problem = PeakProblem::new(2.0, 0.5);
        let params = array![2.0, 0.5];
        let jac: Array2<f64> = problem.jacobian(&params).unwrap();

        assert_eq!(jac.shape(), &[13, 2]);
        for (i, &x) in problem.x_data.iter().enumerate() {
            let e = (-(x - 0.5f64).powi(2) / 2.0).exp();
            // Residual is y - model, so the derivatives are negated
            assert_relative_eq!(jac[[i, 0]], -e, epsilon = 1e-6);
            assert_relative_eq!(jac[[i, 1]], -2.0 * e * (x - 0.5), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_eval_cost() {
        let problem = PeakProblem::new(2.0, 0.5);
        assert_relative_eq!(problem.eval_cost(&array![2.0, 0.5]).unwrap(), 0.0, epsilon = 1e-20);

        let expected: f64 = problem.y_data.iter().map(|y| y * y).sum();
        assert_relative_eq!(problem.eval_cost(&array![0.0, 0.5]).unwrap(), expected, epsilon = 1e-12);
    }
}
