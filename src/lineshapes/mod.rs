//! Single-peak lineshapes.
//!
//! A lineshape describes one peak as a pure function of the independent
//! variable and a fixed list of named scalar parameters. Each implementation
//! declares those names explicitly through [`Lineshape::parameter_names`];
//! the schema builder derives the per-peak parameter keys from them and the
//! composite model passes values back in the same order.
//!
//! Two reference lineshapes are provided ([`Gaussian`] and [`Lorentzian`]);
//! any other curve can be plugged in with [`FnLineshape`] or by implementing
//! the trait directly.

use crate::error::{MultiPeakError, Result};
use ndarray::Array1;
use std::collections::HashSet;

mod function;
mod peak;

pub use function::FnLineshape;
pub use peak::{Gaussian, Lorentzian};

/// A single-peak curve with declared parameter names.
pub trait Lineshape: Send + Sync {
    /// Identifier used in logs and fit reports.
    fn name(&self) -> &str;

    /// Per-peak parameter names in declaration order, excluding `x`.
    fn parameter_names(&self) -> Vec<&str>;

    /// Evaluate the peak at every point of `x`.
    ///
    /// `params` holds one value per entry of [`parameter_names`](Self::parameter_names),
    /// in the same order. The result has the same length as `x`.
    fn evaluate(&self, x: &Array1<f64>, params: &[f64]) -> Array1<f64>;

    /// Number of parameters per peak.
    fn parameter_count(&self) -> usize {
        self.parameter_names().len()
    }
}

/// Validated parameter names of `lineshape`.
///
/// The descriptor must list at least one name, without blanks or repeats.
pub(crate) fn declared_parameters(lineshape: &dyn Lineshape) -> Result<Vec<&str>> {
    let names = lineshape.parameter_names();

    if names.is_empty() {
        return Err(MultiPeakError::ConfigurationError(format!(
            "lineshape '{}' declares no peak parameters",
            lineshape.name()
        )));
    }

    let mut seen = HashSet::new();
    for name in &names {
        if name.trim().is_empty() {
            return Err(MultiPeakError::ConfigurationError(format!(
                "lineshape '{}' declares an unnamed parameter",
                lineshape.name()
            )));
        }
        if !seen.insert(*name) {
            return Err(MultiPeakError::ConfigurationError(format!(
                "lineshape '{}' declares parameter '{}' more than once",
                lineshape.name(),
                name
            )));
        }
    }

    Ok(names)
}
