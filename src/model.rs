//! Composite multi-peak model.
//!
//! A [`CompositeModel`] sums `n_peaks` copies of one lineshape over shared
//! x-coordinates. It owns no parameter data: values come from a
//! [`ParameterSchema`] (or a raw flat vector) in peak-major order and are cut
//! into contiguous chunks of `k` values, one chunk per peak.
//!
//! [`ModelProblem`] adapts a model, a schema, and an x/y dataset to the
//! [`Problem`] trait so the Levenberg-Marquardt optimizer can fit it.

use crate::error::{MultiPeakError, Result};
use crate::lineshapes::Lineshape;
use crate::parameters::ParameterSchema;
use crate::problem::Problem;
use ndarray::Array1;
use std::fmt;
use std::sync::Arc;

/// Sum of `n_peaks` lineshape evaluations.
#[derive(Clone)]
pub struct CompositeModel {
    lineshape: Arc<dyn Lineshape>,
    n_peaks: usize,
    params_per_peak: usize,
}

/// Build the composite model for `n_peaks` copies of `lineshape`.
///
/// The number of parameters per peak is taken from the lineshape's
/// declared parameter names.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use multipeak_rs::lineshapes::Gaussian;
/// use multipeak_rs::model::build_model;
/// use ndarray::array;
///
/// let model = build_model(Arc::new(Gaussian), 2);
/// let x = array![0.0, 5.0];
/// let y = model.eval_values(&x, &[1.0, 0.0, 1.0, 2.0, 5.0, 1.0]).unwrap();
///
/// assert!((y[1] - 2.0).abs() < 1e-5);
/// ```
pub fn build_model(lineshape: Arc<dyn Lineshape>, n_peaks: usize) -> CompositeModel {
    CompositeModel::new(lineshape, n_peaks)
}

impl CompositeModel {
    pub fn new(lineshape: Arc<dyn Lineshape>, n_peaks: usize) -> Self {
        let params_per_peak = lineshape.parameter_count();
        Self {
            lineshape,
            n_peaks,
            params_per_peak,
        }
    }

    pub fn lineshape(&self) -> &Arc<dyn Lineshape> {
        &self.lineshape
    }

    pub fn n_peaks(&self) -> usize {
        self.n_peaks
    }

    pub fn params_per_peak(&self) -> usize {
        self.params_per_peak
    }

    /// Total number of values the model consumes, `n_peaks * k`.
    pub fn parameter_count(&self) -> usize {
        self.n_peaks * self.params_per_peak
    }

    pub fn description(&self) -> String {
        format!(
            "A multi-peak model with {} {} lineshape(s).",
            self.n_peaks,
            self.lineshape.name()
        )
    }

    /// Evaluate the model at `x` using the schema's current values.
    ///
    /// # Errors
    ///
    /// `ShapeMismatchError` if the schema does not hold `n_peaks * k` values
    /// or a lineshape returns an array whose length differs from `x`.
    pub fn eval(&self, x: &Array1<f64>, schema: &ParameterSchema) -> Result<Array1<f64>> {
        self.eval_values(x, &schema.values())
    }

    /// Evaluate the model at `x` from a flat value vector in schema order.
    pub fn eval_values(&self, x: &Array1<f64>, values: &[f64]) -> Result<Array1<f64>> {
        self.check_value_count(values.len())?;

        let mut y = Array1::zeros(x.len());
        if self.params_per_peak == 0 {
            return Ok(y);
        }

        for chunk in values.chunks_exact(self.params_per_peak) {
            y += &self.eval_peak(x, chunk)?;
        }
        Ok(y)
    }

    /// Evaluate each peak separately, in peak order.
    pub fn eval_components(
        &self,
        x: &Array1<f64>,
        schema: &ParameterSchema,
    ) -> Result<Vec<Array1<f64>>> {
        let values = schema.values();
        self.check_value_count(values.len())?;

        if self.params_per_peak == 0 {
            return Ok(Vec::new());
        }

        values
            .chunks_exact(self.params_per_peak)
            .map(|chunk| self.eval_peak(x, chunk))
            .collect()
    }

    fn eval_peak(&self, x: &Array1<f64>, params: &[f64]) -> Result<Array1<f64>> {
        let y = self.lineshape.evaluate(x, params);
        if y.len() != x.len() {
            return Err(MultiPeakError::ShapeMismatchError {
                expected: x.len(),
                actual: y.len(),
            });
        }
        Ok(y)
    }

    fn check_value_count(&self, actual: usize) -> Result<()> {
        let expected = self.parameter_count();
        if actual != expected {
            return Err(MultiPeakError::ShapeMismatchError { expected, actual });
        }
        Ok(())
    }
}

impl fmt::Debug for CompositeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeModel")
            .field("lineshape", &self.lineshape.name())
            .field("n_peaks", &self.n_peaks)
            .field("params_per_peak", &self.params_per_peak)
            .finish()
    }
}

/// An adapter that implements [`Problem`] for a composite model fit.
///
/// The optimizer sees only the varying parameters, in internal (unbounded)
/// coordinates; fixed parameters keep their schema values. The residual is
/// `y - model(x)`.
pub struct ModelProblem<'a> {
    model: &'a CompositeModel,
    schema: &'a ParameterSchema,
    x_data: &'a Array1<f64>,
    y_data: &'a Array1<f64>,
    nvarys: usize,
}

impl<'a> ModelProblem<'a> {
    /// Create a new adapter.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `x_data` and `y_data` differ in length.
    pub fn new(
        model: &'a CompositeModel,
        schema: &'a ParameterSchema,
        x_data: &'a Array1<f64>,
        y_data: &'a Array1<f64>,
    ) -> Result<Self> {
        if x_data.len() != y_data.len() {
            return Err(MultiPeakError::DimensionMismatch(format!(
                "x has {} points, y has {}",
                x_data.len(),
                y_data.len()
            )));
        }

        Ok(Self {
            model,
            schema,
            x_data,
            y_data,
            nvarys: schema.varying().len(),
        })
    }

    /// Internal values of the varying parameters, the optimizer's starting point.
    pub fn initial_params(&self) -> Result<Array1<f64>> {
        Ok(Array1::from(self.schema.varying_internal_values()?))
    }

    pub fn ndata(&self) -> usize {
        self.x_data.len()
    }

    pub fn nvarys(&self) -> usize {
        self.nvarys
    }
}

impl Problem for ModelProblem<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let values = self.schema.values_from_internal(&params.to_vec())?;
        let y_model = self.model.eval_values(self.x_data, &values)?;
        Ok(self.y_data - &y_model)
    }

    fn parameter_count(&self) -> usize {
        self.nvarys
    }

    fn residual_count(&self) -> usize {
        self.x_data.len()
    }
}
