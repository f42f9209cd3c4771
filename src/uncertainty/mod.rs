//! # Uncertainty Calculation
//!
//! Standard errors and correlations of fitted parameters, estimated from the
//! Jacobian at the solution the way lmfit does it: `redchi * inv(J^T J)`.
//!
//! The optimizer works on internal (unbounded) values, so the covariance is
//! first computed in that space and then mapped back to parameter values
//! through the derivative of each parameter's bounds transform.

mod covariance;

pub use covariance::{
    calculate_correlation, calculate_covariance, standard_errors_from_covariance,
    transform_covariance,
};

use ndarray::{Array1, Array2};

use crate::error::{MultiPeakError, Result};
use crate::parameters::ParameterSchema;

/// Uncertainties of the varying parameters of a fit.
#[derive(Debug, Clone)]
pub struct UncertaintyResult {
    /// Names of the varying parameters, in schema order
    pub names: Vec<String>,
    /// Covariance matrix in parameter space
    pub covariance: Array2<f64>,
    /// Correlation matrix derived from covariance
    pub correlation: Array2<f64>,
    /// Standard error of each varying parameter
    pub standard_errors: Array1<f64>,
}

impl UncertaintyResult {
    /// Standard error of the parameter `name`, if it was varied.
    pub fn standard_error(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.standard_errors[i])
    }
}

/// Estimate uncertainties of the varying parameters of `schema`.
///
/// # Arguments
///
/// * `schema` - The schema the fit started from; defines which parameters vary
/// * `internal` - Internal values of the varying parameters at the solution
/// * `jacobian` - Jacobian of the residuals with respect to `internal`
/// * `redchi` - Reduced chi-square of the fit
///
/// # Errors
///
/// `DimensionMismatch` if the sizes disagree, `LinearAlgebraError` if the
/// covariance cannot be computed.
pub fn parameter_uncertainties(
    schema: &ParameterSchema,
    internal: &[f64],
    jacobian: &Array2<f64>,
    redchi: f64,
) -> Result<UncertaintyResult> {
    let varying = schema.varying();
    if internal.len() != varying.len() || jacobian.ncols() != varying.len() {
        return Err(MultiPeakError::DimensionMismatch(format!(
            "{} varying parameters, {} internal values, {} Jacobian columns",
            varying.len(),
            internal.len(),
            jacobian.ncols()
        )));
    }

    let internal_covariance = calculate_covariance(jacobian, redchi)?;

    let derivatives: Vec<f64> = varying
        .iter()
        .zip(internal)
        .map(|(param, &value)| param.bounds_transform().external_derivative(value))
        .collect();
    let covariance = transform_covariance(&internal_covariance, &derivatives)?;

    Ok(UncertaintyResult {
        names: varying.iter().map(|p| p.name().to_string()).collect(),
        correlation: calculate_correlation(&covariance),
        standard_errors: standard_errors_from_covariance(&covariance),
        covariance,
    })
}
