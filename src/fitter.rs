//! Multi-peak fitter.
//!
//! A [`Fitter`] owns one lineshape, a peak count, the parameter schema built
//! from them, and the composite model that evaluates the schema. Calling
//! [`Fitter::fit`] minimizes `y - model(x)` with Levenberg-Marquardt and, on
//! success only, replaces the schema with the fitted one.
//!
//! # Example
//!
//! ```
//! use multipeak_rs::{Fitter, Gaussian};
//! use ndarray::Array1;
//!
//! let x = Array1::linspace(0.0, 10.0, 101);
//! let y = x.mapv(|x: f64| 2.0 * (-(x - 4.0).powi(2) / 2.0).exp());
//!
//! let mut fitter = Fitter::new(Gaussian, 1).unwrap();
//! fitter.schema_mut().set_value("center_0", 3.5).unwrap();
//! fitter.fit(&x, &y).unwrap();
//!
//! assert!((fitter.schema().value("amp_0").unwrap() - 2.0).abs() < 1e-6);
//! assert!((fitter.schema().value("center_0").unwrap() - 4.0).abs() < 1e-6);
//! ```

use log::{debug, info, warn};
use ndarray::{Array1, Array2};
use std::fmt;
use std::sync::Arc;

use crate::error::{MultiPeakError, Result};
use crate::lineshapes::Lineshape;
use crate::lm::{LevenbergMarquardt, LmConfig};
use crate::model::{build_model, CompositeModel, ModelProblem};
use crate::parameters::{build_schema, parameter_key, ParameterSchema};
use crate::uncertainty::{calculate_correlation, parameter_uncertainties};

/// Outcome of a successful fit.
#[derive(Debug, Clone)]
pub struct FitResult {
    /// Whether the optimizer converged
    pub success: bool,

    /// Termination message from the optimizer
    pub message: String,

    /// Number of optimizer iterations
    pub iterations: usize,

    /// Number of residual evaluations
    pub func_evals: usize,

    /// Residuals `y - model(x)` at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub chisqr: f64,

    /// Euclidean norm of the residuals
    pub residual_norm: f64,

    /// Reduced chi-square, `chisqr / max(nfree, 1)`
    pub redchi: f64,

    /// Number of data points
    pub ndata: usize,

    /// Number of varying parameters
    pub nvarys: usize,

    /// Degrees of freedom, `ndata - nvarys`
    pub nfree: usize,

    /// Covariance of the varying parameters, if it could be estimated
    pub covariance: Option<Array2<f64>>,

    /// Names of the varying parameters, in covariance order
    pub var_names: Vec<String>,
}

impl FitResult {
    /// Correlation matrix of the varying parameters.
    pub fn correlation(&self) -> Option<Array2<f64>> {
        self.covariance.as_ref().map(calculate_correlation)
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[[Fit Statistics]]")?;
        writeln!(f, "    # iterations       = {}", self.iterations)?;
        writeln!(f, "    # function evals   = {}", self.func_evals)?;
        writeln!(f, "    # data points      = {}", self.ndata)?;
        writeln!(f, "    # variables        = {}", self.nvarys)?;
        writeln!(f, "    chi-square         = {:.6e}", self.chisqr)?;
        writeln!(f, "    reduced chi-square = {:.6e}", self.redchi)?;
        writeln!(f, "    message            = {}", self.message)?;
        if self.covariance.is_none() {
            writeln!(f, "    uncertainties could not be estimated")?;
        }
        Ok(())
    }
}

/// Fits a sum of `n_peaks` copies of one lineshape to x/y data.
#[derive(Clone)]
pub struct Fitter {
    lineshape: Arc<dyn Lineshape>,
    n_peaks: usize,
    schema: ParameterSchema,
    model: CompositeModel,
    config: LmConfig,
    result: Option<FitResult>,
}

impl Fitter {
    /// Create a fitter with the default optimizer configuration.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` if `n_peaks` is zero or the lineshape's
    /// parameter names are empty, blank, or repeated.
    pub fn new<L: Lineshape + 'static>(lineshape: L, n_peaks: usize) -> Result<Self> {
        Self::from_parts(Arc::new(lineshape), n_peaks, LmConfig::default())
    }

    /// Create a fitter around a lineshape shared with other fitters.
    pub fn with_shared_lineshape(lineshape: Arc<dyn Lineshape>, n_peaks: usize) -> Result<Self> {
        Self::from_parts(lineshape, n_peaks, LmConfig::default())
    }

    pub fn builder() -> FitterBuilder {
        FitterBuilder::default()
    }

    fn from_parts(lineshape: Arc<dyn Lineshape>, n_peaks: usize, config: LmConfig) -> Result<Self> {
        let schema = build_schema(lineshape.as_ref(), n_peaks)?;
        let model = build_model(Arc::clone(&lineshape), n_peaks);
        debug!("{} ({} parameters)", model.description(), schema.len());

        Ok(Self {
            lineshape,
            n_peaks,
            schema,
            model,
            config,
            result: None,
        })
    }

    pub fn lineshape(&self) -> &Arc<dyn Lineshape> {
        &self.lineshape
    }

    pub fn n_peaks(&self) -> usize {
        self.n_peaks
    }

    pub fn params_per_peak(&self) -> usize {
        self.model.params_per_peak()
    }

    pub fn model(&self) -> &CompositeModel {
        &self.model
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    /// Mutable access to the schema, for initial guesses, bounds, and vary flags.
    ///
    /// Adding parameters through this handle makes the next fit fail with
    /// `ShapeMismatchError`.
    pub fn schema_mut(&mut self) -> &mut ParameterSchema {
        &mut self.schema
    }

    /// Replace the schema, e.g. with one restored from serialized form.
    ///
    /// # Errors
    ///
    /// `ShapeMismatchError` if the parameter count differs from
    /// `n_peaks * k`, `ParameterNotFound` if a key of the current schema is
    /// missing or out of order.
    pub fn set_schema(&mut self, schema: ParameterSchema) -> Result<()> {
        if schema.len() != self.schema.len() {
            return Err(MultiPeakError::ShapeMismatchError {
                expected: self.schema.len(),
                actual: schema.len(),
            });
        }
        if let Some((expected, _)) = self
            .schema
            .keys()
            .zip(schema.keys())
            .find(|(expected, actual)| expected != actual)
        {
            return Err(MultiPeakError::ParameterNotFound(expected.to_string()));
        }

        self.schema = schema;
        Ok(())
    }

    /// `(name, value)` pairs of every parameter, in schema order.
    pub fn parameter_values(&self) -> Vec<(String, f64)> {
        self.schema.values_dict()
    }

    /// Values of peak `peak`, in the lineshape's declaration order.
    pub fn peak_values(&self, peak: usize) -> Result<Vec<f64>> {
        self.peak_keys(peak)?
            .iter()
            .map(|key| {
                self.schema
                    .value(key)
                    .ok_or_else(|| MultiPeakError::ParameterNotFound(key.clone()))
            })
            .collect()
    }

    /// Set every value of peak `peak` at once. Nothing is written on error.
    pub fn set_peak_values(&mut self, peak: usize, values: &[f64]) -> Result<()> {
        let keys = self.peak_keys(peak)?;
        if values.len() != keys.len() {
            return Err(MultiPeakError::ShapeMismatchError {
                expected: keys.len(),
                actual: values.len(),
            });
        }

        let mut schema = self.schema.clone();
        for (key, &value) in keys.iter().zip(values) {
            schema.set_value(key, value)?;
        }
        self.schema = schema;
        Ok(())
    }

    fn peak_keys(&self, peak: usize) -> Result<Vec<String>> {
        if peak >= self.n_peaks {
            return Err(MultiPeakError::ParameterNotFound(format!(
                "peak {} (fitter has {} peaks)",
                peak, self.n_peaks
            )));
        }

        Ok(self
            .lineshape
            .parameter_names()
            .iter()
            .map(|base| parameter_key(base, peak))
            .collect())
    }

    /// Evaluate the composite model at `x` with the current values.
    pub fn eval(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        self.model.eval(x, &self.schema)
    }

    /// Evaluate each peak separately with the current values.
    pub fn eval_components(&self, x: &Array1<f64>) -> Result<Vec<Array1<f64>>> {
        self.model.eval_components(x, &self.schema)
    }

    /// Residuals `y - model(x)` with the current values.
    pub fn residuals(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
        validate_data(x, y)?;
        Ok(y - &self.eval(x)?)
    }

    /// Restore every parameter to its initial value and forget the last result.
    pub fn reset(&mut self) {
        self.schema.reset();
        self.result = None;
    }

    /// The last successful fit, if any.
    pub fn result(&self) -> Option<&FitResult> {
        self.result.as_ref()
    }

    /// Schema table followed by the fit statistics of the last fit.
    pub fn report(&self) -> String {
        let mut report = format!("{}\n[[Variables]]\n{}", self.model.description(), self.schema);
        if let Some(result) = &self.result {
            report.push_str(&result.to_string());
        }
        report
    }

    /// Fit the model to `x`/`y`, starting from the schema's current values.
    ///
    /// On success the schema is replaced by the fitted one, with standard
    /// errors attached when the covariance can be estimated, and the result
    /// is stored. On any error the schema and the previous result are left
    /// untouched.
    ///
    /// # Errors
    ///
    /// * `FitError` if the data are invalid (length mismatch, empty,
    ///   non-finite, fewer points than varying parameters), the optimizer
    ///   does not converge, or it fails internally
    /// * `ShapeMismatchError` if the schema or a lineshape output has the
    ///   wrong size
    pub fn fit(&mut self, x: &Array1<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        info!(
            "fitting {} peak(s) of '{}' to {} points",
            self.n_peaks,
            self.lineshape.name(),
            x.len()
        );

        let (schema, result) = self.run_fit(x, y).map_err(|e| {
            let e = match e {
                MultiPeakError::FitError(_) | MultiPeakError::ShapeMismatchError { .. } => e,
                other => MultiPeakError::FitError(other.to_string()),
            };
            warn!("{}", e);
            e
        })?;

        info!(
            "fit converged after {} iterations: chi-square = {:.6e}, reduced chi-square = {:.6e}",
            result.iterations, result.chisqr, result.redchi
        );

        self.schema = schema;
        self.result = Some(result);
        Ok(self)
    }

    fn run_fit(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<(ParameterSchema, FitResult)> {
        validate_data(x, y)?;

        let expected = self.model.parameter_count();
        if self.schema.len() != expected {
            return Err(MultiPeakError::ShapeMismatchError {
                expected,
                actual: self.schema.len(),
            });
        }

        let problem = ModelProblem::new(&self.model, &self.schema, x, y)?;
        let ndata = problem.ndata();
        let nvarys = problem.nvarys();
        if ndata < nvarys {
            return Err(MultiPeakError::FitError(format!(
                "{} data points cannot determine {} varying parameters",
                ndata, nvarys
            )));
        }

        let optimizer = LevenbergMarquardt::with_config(self.config.clone()).with_calc_jacobian(true);
        let lm_result = optimizer.minimize(&problem, problem.initial_params()?)?;
        if !lm_result.success {
            return Err(MultiPeakError::FitError(lm_result.message));
        }

        let internal = lm_result.params.to_vec();
        let mut schema = self.schema.with_internal_values(&internal)?;
        for param in schema.iter_mut() {
            param.set_stderr(None);
        }

        let nfree = ndata - nvarys;
        let chisqr = lm_result.cost;
        let redchi = chisqr / nfree.max(1) as f64;

        let covariance = match &lm_result.jacobian {
            Some(jacobian) if nvarys > 0 && nfree > 0 => {
                match parameter_uncertainties(&self.schema, &internal, jacobian, redchi) {
                    Ok(uncertainties) => {
                        for param in schema.iter_mut() {
                            let stderr = uncertainties.standard_error(param.name());
                            param.set_stderr(stderr);
                        }
                        Some(uncertainties.covariance)
                    }
                    Err(e) => {
                        warn!("uncertainties could not be estimated: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        let result = FitResult {
            success: lm_result.success,
            message: lm_result.message,
            iterations: lm_result.iterations,
            func_evals: lm_result.func_evals,
            residual_norm: chisqr.sqrt(),
            residuals: lm_result.residuals,
            chisqr,
            redchi,
            ndata,
            nvarys,
            nfree,
            covariance,
            var_names: self.schema.varying_names(),
        };

        Ok((schema, result))
    }
}

impl fmt::Debug for Fitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fitter")
            .field("lineshape", &self.lineshape.name())
            .field("n_peaks", &self.n_peaks)
            .field("schema", &self.schema)
            .field("config", &self.config)
            .field("result", &self.result)
            .finish()
    }
}

fn validate_data(x: &Array1<f64>, y: &Array1<f64>) -> Result<()> {
    if x.len() != y.len() {
        return Err(MultiPeakError::FitError(format!(
            "x and y must have the same length (x: {}, y: {})",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Err(MultiPeakError::FitError("no data points".to_string()));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(MultiPeakError::FitError(
            "data contain non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// Builder for [`Fitter`].
///
/// # Examples
///
/// ```
/// use multipeak_rs::{Fitter, Lorentzian};
///
/// let fitter = Fitter::builder()
///     .lineshape(Lorentzian)
///     .n_peaks(3)
///     .max_iterations(500)
///     .build()
///     .unwrap();
///
/// assert_eq!(fitter.schema().len(), 9);
/// assert_eq!(fitter.config().max_iterations, 500);
/// ```
#[derive(Clone, Default)]
pub struct FitterBuilder {
    lineshape: Option<Arc<dyn Lineshape>>,
    n_peaks: Option<usize>,
    config: LmConfig,
}

impl FitterBuilder {
    pub fn lineshape<L: Lineshape + 'static>(mut self, lineshape: L) -> Self {
        self.lineshape = Some(Arc::new(lineshape));
        self
    }

    pub fn shared_lineshape(mut self, lineshape: Arc<dyn Lineshape>) -> Self {
        self.lineshape = Some(lineshape);
        self
    }

    pub fn n_peaks(mut self, n_peaks: usize) -> Self {
        self.n_peaks = Some(n_peaks);
        self
    }

    /// Optimizer configuration used by every fit.
    pub fn config(mut self, config: LmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// # Errors
    ///
    /// `ConfigurationError` if the lineshape or the peak count was not set,
    /// or if [`Fitter::new`] would reject them.
    pub fn build(self) -> Result<Fitter> {
        let lineshape = self.lineshape.ok_or_else(|| {
            MultiPeakError::ConfigurationError("a lineshape must be set".to_string())
        })?;
        let n_peaks = self.n_peaks.ok_or_else(|| {
            MultiPeakError::ConfigurationError("n_peaks must be set".to_string())
        })?;

        Fitter::from_parts(lineshape, n_peaks, self.config)
    }
}

impl fmt::Debug for FitterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitterBuilder")
            .field("lineshape", &self.lineshape.as_ref().map(|l| l.name().to_string()))
            .field("n_peaks", &self.n_peaks)
            .field("config", &self.config)
            .finish()
    }
}
