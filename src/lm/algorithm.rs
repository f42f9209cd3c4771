//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! This module contains the core implementation of the Levenberg-Marquardt
//! algorithm for nonlinear least-squares optimization.

use log::debug;
use ndarray::{Array1, Array2};
use std::fmt;

use crate::error::{MultiPeakError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference;

use super::config::LmConfig;
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};
use super::step::{LmStep, NormalEquations};
use super::trust_region::TrustRegion;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of iterations performed
    pub iterations: usize,

    /// Number of function evaluations
    pub func_evals: usize,

    /// Whether the optimization succeeded
    pub success: bool,

    /// A message describing the result
    pub message: String,

    /// Why the optimization stopped
    pub status: ConvergenceStatus,

    /// The Jacobian matrix at the solution (if requested)
    pub jacobian: Option<Array2<f64>>,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self {
            config: LmConfig::default(),
        }
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for relative reduction in cost.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for change in parameter values.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for gradient norm.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set the growth of lambda after the first rejected step.
    pub fn with_lambda_up_factor(mut self, factor: f64) -> Self {
        self.config.lambda_up_factor = factor;
        self
    }

    /// Set the smallest factor an accepted step scales lambda by.
    pub fn with_lambda_down_factor(mut self, factor: f64) -> Self {
        self.config.lambda_down_factor = factor;
        self
    }

    /// Set the minimum value for lambda.
    pub fn with_min_lambda(mut self, min_lambda: f64) -> Self {
        self.config.min_lambda = min_lambda;
        self
    }

    /// Set the maximum value for lambda.
    pub fn with_max_lambda(mut self, max_lambda: f64) -> Self {
        self.config.max_lambda = max_lambda;
        self
    }

    /// Set the relative step of the finite-difference Jacobian.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Set whether to calculate and return the Jacobian at the solution.
    pub fn with_calc_jacobian(mut self, calc_jacobian: bool) -> Self {
        self.config.calc_jacobian = calc_jacobian;
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// Each iteration evaluates the Jacobian once, then tries damped steps
    /// with increasing lambda until one reduces the cost. Non-finite trial
    /// residuals count as a rejected step.
    ///
    /// Hitting the iteration limit or exhausting the damping range is not an
    /// error: the result is returned with `success == false`.
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` if `initial_params` does not match the problem
    /// * `FunctionEvaluation` if the residuals at `initial_params` are not finite
    /// * any error raised by the problem's residual or Jacobian evaluation
    pub fn minimize<P: Problem>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(MultiPeakError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let mut params = initial_params;
        let mut residuals = problem.eval(&params)?;
        let mut func_evals = 1;

        if residuals.len() != problem.residual_count() {
            return Err(MultiPeakError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                problem.residual_count(),
                residuals.len()
            )));
        }

        let mut cost = sum_of_squares(&residuals);
        if !cost.is_finite() {
            return Err(MultiPeakError::FunctionEvaluation(
                "residuals at the initial parameters are not finite".to_string(),
            ));
        }

        let criteria = ConvergenceCriteria::from_config(&self.config);
        let mut trust_region = TrustRegion::from_config(&self.config);
        let mut scale = Array1::<f64>::zeros(n_params);
        let mut iterations = 0;

        let status = loop {
            if n_params == 0 {
                break ConvergenceStatus::ParameterConvergence;
            }

            let jacobian = self.jacobian(problem, &params, &residuals, &mut func_evals)?;
            let normal = NormalEquations::new(&jacobian, &residuals);
            normal.update_scale(&mut scale);

            let status = criteria.check_point(cost, normal.gradient_norm());
            if status.is_terminated() {
                break status;
            }
            if criteria.iterations_exhausted(iterations) {
                break ConvergenceStatus::MaxIterationsReached;
            }
            iterations += 1;

            // Retry with more damping until a step is accepted
            let status = loop {
                let at_max_damping = trust_region.is_exhausted();

                let step = match LmStep::calculate_step(&normal, &scale, trust_region.lambda) {
                    Ok(step) => step,
                    Err(e) => {
                        debug!("step failed at lambda = {:.3e}: {}", trust_region.lambda, e);
                        if at_max_damping {
                            break ConvergenceStatus::DampingExhausted;
                        }
                        trust_region.increase();
                        continue;
                    }
                };

                let new_params = &params + &step.step;
                let new_residuals = problem.eval(&new_params)?;
                func_evals += 1;
                let new_cost = sum_of_squares(&new_residuals);

                let gain_ratio = TrustRegion::gain_ratio(cost, new_cost, step.predicted_reduction);
                if trust_region.update_lambda(gain_ratio) {
                    let status = criteria.check(
                        &params,
                        &new_params,
                        cost,
                        new_cost,
                        step.predicted_reduction,
                    );
                    debug!(
                        "iteration {}: cost {:.6e} -> {:.6e}, lambda = {:.3e}",
                        iterations, cost, new_cost, trust_region.lambda
                    );

                    params = new_params;
                    residuals = new_residuals;
                    cost = new_cost;
                    break status;
                }

                debug!(
                    "step rejected: gain ratio {:.3e}, lambda -> {:.3e}",
                    gain_ratio, trust_region.lambda
                );

                // No representable improvement left
                if ConvergenceCriteria::relative_step(&params, &step.step) < criteria.xtol {
                    break ConvergenceStatus::ParameterConvergence;
                }
                if at_max_damping {
                    break ConvergenceStatus::DampingExhausted;
                }
            };

            if status.is_terminated() {
                break status;
            }
        };

        let message = match status {
            ConvergenceStatus::MaxIterationsReached => format!(
                "Maximum iterations ({}) reached",
                self.config.max_iterations
            ),
            _ => status.description().to_string(),
        };

        let jacobian = if self.config.calc_jacobian {
            Some(self.jacobian(problem, &params, &residuals, &mut func_evals)?)
        } else {
            None
        };

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            success: status.is_converged(),
            message,
            status,
            jacobian,
        })
    }

    fn jacobian<P: Problem>(
        &self,
        problem: &P,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
        func_evals: &mut usize,
    ) -> Result<Array2<f64>> {
        if problem.has_custom_jacobian() {
            return problem.jacobian(params);
        }

        *func_evals += params.len();
        finite_difference::jacobian_at(problem, params, residuals, Some(self.config.epsilon))
    }
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r.powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// A simple linear model for testing: f(x) = a * x + b
    struct LinearModel {
        x_data: Array1<f64>,
        y_data: Array1<f64>,
    }

    impl Problem for LinearModel {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            let (a, b) = (params[0], params[1]);
            Ok(self
                .x_data
                .iter()
                .zip(self.y_data.iter())
                .map(|(x, y)| a * x + b - y)
                .collect())
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            self.x_data.len()
        }

        fn jacobian(&self, _params: &Array1<f64>) -> Result<Array2<f64>> {
            let n = self.x_data.len();
            let mut jac = Array2::zeros((n, 2));
            for i in 0..n {
                jac[[i, 0]] = self.x_data[i];
                jac[[i, 1]] = 1.0;
            }
            Ok(jac)
        }

        fn has_custom_jacobian(&self) -> bool {
            true
        }
    }

    /// Two unit-width Gaussians: [amp_0, center_0, amp_1, center_1].
    /// Uses the finite-difference Jacobian.
    struct GaussianPair {
        x_data: Array1<f64>,
        y_data: Array1<f64>,
    }

    impl GaussianPair {
        fn model(x: f64, params: &Array1<f64>) -> f64 {
            params[0] * (-(x - params[1]).powi(2) / 2.0).exp()
                + params[2] * (-(x - params[3]).powi(2) / 2.0).exp()
        }

        fn new(truth: &Array1<f64>) -> Self {
            let x_data = Array1::linspace(-10.0, 10.0, 201);
            let y_data = x_data.mapv(|x| Self::model(x, truth));
            Self { x_data, y_data }
        }
    }

    impl Problem for GaussianPair {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            Ok(&self.y_data - &self.x_data.mapv(|x| Self::model(x, params)))
        }

        fn parameter_count(&self) -> usize {
            4
        }

        fn residual_count(&self) -> usize {
            self.x_data.len()
        }
    }

    #[test]
    fn test_linear_fit() {
        // Approximately y = 2x + 3
        let model = LinearModel {
            x_data: array![1.0, 2.0, 3.0, 4.0, 5.0],
            y_data: array![5.1, 7.0, 8.9, 11.2, 13.0],
        };

        let result = LevenbergMarquardt::new()
            .minimize(&model, array![1.0, 1.0])
            .unwrap();

        assert!(result.success, "{}", result.message);
        assert!(result.status.is_converged());
        assert_relative_eq!(result.params[0], 2.0, epsilon = 0.1);
        assert_relative_eq!(result.params[1], 3.0, epsilon = 0.1);
        assert!(result.cost < 0.1);
        assert!(result.jacobian.is_none());
    }

    #[test]
    fn test_gaussian_pair_fit() {
        let truth = array![3.0, -2.0, 1.5, 2.5];
        let problem = GaussianPair::new(&truth);

        let result = LevenbergMarquardt::new()
            .with_calc_jacobian(true)
            .minimize(&problem, array![2.5, -1.7, 1.2, 2.8])
            .unwrap();

        assert!(result.success, "{}", result.message);
        for (fitted, expected) in result.params.iter().zip(truth.iter()) {
            assert_relative_eq!(*fitted, *expected, epsilon = 1e-6);
        }
        assert!(result.func_evals > result.iterations);

        let jacobian = result.jacobian.unwrap();
        assert_eq!(jacobian.shape(), &[201, 4]);
    }

    #[test]
    fn test_exact_start_stops_immediately() {
        let truth = array![3.0, -2.0, 1.5, 2.5];
        let problem = GaussianPair::new(&truth);

        let result = LevenbergMarquardt::new()
            .minimize(&problem, truth.clone())
            .unwrap();

        assert!(result.success);
        assert_eq!(result.status, ConvergenceStatus::ZeroResidual);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.params, truth);
    }

    #[test]
    fn test_max_iterations() {
        let problem = GaussianPair::new(&array![3.0, -2.0, 1.5, 2.5]);

        let result = LevenbergMarquardt::new()
            .with_max_iterations(1)
            .minimize(&problem, array![1.0, 0.0, 1.0, 1.0])
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.status, ConvergenceStatus::MaxIterationsReached);
        assert!(result.message.contains("Maximum iterations (1)"));
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let model = LinearModel {
            x_data: array![1.0, 2.0],
            y_data: array![1.0, 2.0],
        };
        let err = LevenbergMarquardt::new()
            .minimize(&model, array![1.0])
            .unwrap_err();
        assert!(matches!(err, MultiPeakError::DimensionMismatch(_)));
    }

    #[test]
    fn test_non_finite_start() {
        let model = LinearModel {
            x_data: array![1.0, 2.0],
            y_data: array![1.0, f64::NAN],
        };
        let err = LevenbergMarquardt::new()
            .minimize(&model, array![1.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, MultiPeakError::FunctionEvaluation(_)));
    }
}
