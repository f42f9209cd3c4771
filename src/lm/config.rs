//! Configuration options for the Levenberg-Marquardt algorithm.
//!
//! This module defines the convergence tolerances, damping schedule, and
//! Jacobian settings used by [`LevenbergMarquardt`](super::LevenbergMarquardt).

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct LmConfig {
    /// Maximum number of iterations (Jacobian evaluations). Default: 200
    pub max_iterations: usize,

    /// Tolerance for relative reduction in cost, actual and predicted. Default: 1e-10
    pub ftol: f64,

    /// Tolerance for relative change in parameter values. Default: 1e-10
    pub xtol: f64,

    /// Tolerance for the norm of the gradient `J^T r`. Default: 1e-12
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Growth of lambda after the first rejected step; it doubles on every
    /// further consecutive rejection. Default: 2.0
    pub lambda_up_factor: f64,

    /// Smallest factor lambda is scaled by after an accepted step. Default: 1/3
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Maximum value for lambda. Default: 1e12
    pub max_lambda: f64,

    /// Relative step for the forward-difference Jacobian. Default: 1e-8
    pub epsilon: f64,

    /// Whether to calculate and return the Jacobian at the solution. Default: false
    pub calc_jacobian: bool,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-12,
            initial_lambda: 1e-3,
            lambda_up_factor: 2.0,
            lambda_down_factor: 1.0 / 3.0,
            min_lambda: 1e-12,
            max_lambda: 1e12,
            epsilon: 1e-8,
            calc_jacobian: false,
        }
    }
}
