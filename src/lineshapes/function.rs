use super::Lineshape;
use ndarray::Array1;
use std::fmt;
use std::sync::Arc;

type ShapeFn = dyn Fn(&Array1<f64>, &[f64]) -> Array1<f64> + Send + Sync;

/// A lineshape backed by a closure and an explicit list of parameter names.
///
/// # Examples
///
/// ```
/// use multipeak_rs::lineshapes::{FnLineshape, Lineshape};
/// use ndarray::{array, Array1};
///
/// // Area-normalized Gaussian: (x, area, center, sigma)
/// let shape = FnLineshape::new("area_gaussian", &["area", "center", "sigma"], |x: &Array1<f64>, p: &[f64]| {
///     let norm = p[0] / (p[2] * (2.0 * std::f64::consts::PI).sqrt());
///     x.mapv(|xi| norm * (-(xi - p[1]).powi(2) / (2.0 * p[2] * p[2])).exp())
/// });
///
/// assert_eq!(shape.parameter_names(), ["area", "center", "sigma"]);
/// let y = shape.evaluate(&array![0.0], &[1.0, 0.0, 1.0]);
/// assert!((y[0] - 0.398_942).abs() < 1e-6);
/// ```
#[derive(Clone)]
pub struct FnLineshape {
    name: String,
    parameter_names: Vec<String>,
    func: Arc<ShapeFn>,
}

impl FnLineshape {
    pub fn new<F>(name: &str, parameter_names: &[&str], func: F) -> Self
    where
        F: Fn(&Array1<f64>, &[f64]) -> Array1<f64> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            parameter_names: parameter_names.iter().map(|s| s.to_string()).collect(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for FnLineshape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLineshape")
            .field("name", &self.name)
            .field("parameter_names", &self.parameter_names)
            .finish_non_exhaustive()
    }
}

impl Lineshape for FnLineshape {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter_names(&self) -> Vec<&str> {
        self.parameter_names.iter().map(String::as_str).collect()
    }

    fn evaluate(&self, x: &Array1<f64>, params: &[f64]) -> Array1<f64> {
        (self.func)(x, params)
    }
}
