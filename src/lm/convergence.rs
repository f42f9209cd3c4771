//! Convergence criteria for the Levenberg-Marquardt algorithm.
//!
//! This module defines the criteria used to determine when the optimizer has
//! reached a solution, and the terminal states it can report.

use ndarray::Array1;

use super::config::LmConfig;

/// Possible convergence states for an optimization algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// The algorithm has converged due to a small parameter change.
    ParameterConvergence,

    /// The algorithm has converged due to a small function value change.
    FunctionValueConvergence,

    /// The algorithm has converged due to a small gradient.
    GradientConvergence,

    /// The residuals vanished.
    ZeroResidual,

    /// The algorithm has terminated due to reaching the maximum number of iterations.
    MaxIterationsReached,

    /// No step reduced the cost before the damping parameter hit its maximum.
    DampingExhausted,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has terminated (either converged or failed).
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
                | ConvergenceStatus::ZeroResidual
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::Running => "Optimization is still running",
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => "Converged: small function value change",
            ConvergenceStatus::GradientConvergence => "Converged: small gradient",
            ConvergenceStatus::ZeroResidual => "Converged: residuals vanished",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::DampingExhausted => "Terminated: damping parameter reached maximum",
        }
    }
}

/// Criteria for determining when an optimization algorithm has converged.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Tolerance for change in parameter values.
    pub xtol: f64,

    /// Tolerance for change in function value.
    pub ftol: f64,

    /// Tolerance for gradient norm.
    pub gtol: f64,

    /// Maximum number of iterations.
    pub max_iterations: usize,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self::from_config(&LmConfig::default())
    }
}

impl ConvergenceCriteria {
    /// Creates a new set of convergence criteria with the given tolerances.
    pub fn new(xtol: f64, ftol: f64, gtol: f64, max_iterations: usize) -> Self {
        Self {
            xtol,
            ftol,
            gtol,
            max_iterations,
        }
    }

    pub fn from_config(config: &LmConfig) -> Self {
        Self::new(config.xtol, config.ftol, config.gtol, config.max_iterations)
    }

    pub fn iterations_exhausted(&self, iterations: usize) -> bool {
        iterations >= self.max_iterations
    }

    /// Checks the state at the current point, before a step is attempted.
    pub fn check_point(&self, cost: f64, gradient_norm: f64) -> ConvergenceStatus {
        if cost < f64::MIN_POSITIVE {
            ConvergenceStatus::ZeroResidual
        } else if gradient_norm < self.gtol {
            ConvergenceStatus::GradientConvergence
        } else {
            ConvergenceStatus::Running
        }
    }

    /// Largest change of any parameter, relative to its magnitude (at least 1).
    pub fn relative_step(params: &Array1<f64>, step: &Array1<f64>) -> f64 {
        params
            .iter()
            .zip(step.iter())
            .map(|(p, s)| s.abs() / p.abs().max(1.0))
            .fold(0.0, f64::max)
    }

    /// Checks whether an accepted step has converged.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values before the step
    /// * `new_params` - The parameter values after the step
    /// * `cost` - The cost before the step
    /// * `new_cost` - The cost after the step
    /// * `predicted_reduction` - The reduction predicted by the linear model
    ///
    /// # Returns
    ///
    /// * The convergence status
    pub fn check(
        &self,
        params: &Array1<f64>,
        new_params: &Array1<f64>,
        cost: f64,
        new_cost: f64,
        predicted_reduction: f64,
    ) -> ConvergenceStatus {
        if new_cost < f64::MIN_POSITIVE {
            return ConvergenceStatus::ZeroResidual;
        }

        let step = new_params - params;
        if Self::relative_step(params, &step) < self.xtol {
            return ConvergenceStatus::ParameterConvergence;
        }

        // Both the achieved and the predicted relative reduction must be small
        let actual = (cost - new_cost).abs() / cost;
        let predicted = predicted_reduction.abs() / cost;
        if actual < self.ftol && predicted < self.ftol {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        ConvergenceStatus::Running
    }
}
