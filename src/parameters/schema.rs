//! Ordered parameter schema for multi-peak models.
//!
//! A [`ParameterSchema`] keeps its parameters in insertion order. For schemas
//! produced by [`build_schema`] that order is peak-major: all parameters of
//! peak 0 in the lineshape's declaration order, then peak 1, and so on. The
//! composite model slices the flat value vector into contiguous chunks of
//! `k` values per peak, so the order must never change after construction.

use crate::error::{MultiPeakError, Result};
use crate::lineshapes::{declared_parameters, Lineshape};
use crate::parameters::parameter::{Parameter, ParameterError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Default starting value of every synthesized parameter.
pub const DEFAULT_PARAMETER_VALUE: f64 = 1.0;

/// Key of the parameter `base` belonging to peak `peak`, e.g. `center_1`.
pub fn parameter_key(base: &str, peak: usize) -> String {
    format!("{}_{}", base, peak)
}

/// An ordered, uniquely-named collection of parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Parameter>", into = "Vec<Parameter>")]
pub struct ParameterSchema {
    params: Vec<Parameter>,
    index: HashMap<String, usize>,
}

impl ParameterSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append a parameter. Names must be unique.
    pub fn add(&mut self, param: Parameter) -> std::result::Result<(), ParameterError> {
        if self.index.contains_key(param.name()) {
            return Err(ParameterError::DuplicateParameter {
                name: param.name().to_string(),
            });
        }

        self.index.insert(param.name().to_string(), self.params.len());
        self.params.push(param);
        Ok(())
    }

    /// Append an unbounded, varying parameter.
    ///
    /// # Examples
    ///
    /// ```
    /// use multipeak_rs::parameters::ParameterSchema;
    ///
    /// let mut schema = ParameterSchema::new();
    /// schema.add_param("amp_0", 1.0).unwrap();
    /// assert!(schema.add_param("amp_0", 2.0).is_err());
    /// assert_eq!(schema.len(), 1);
    /// ```
    pub fn add_param(&mut self, name: &str, value: f64) -> std::result::Result<(), ParameterError> {
        self.add(Parameter::new(name, value))
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.index.get(name).map(|&i| &self.params[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.params[i]),
            None => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Value of the parameter `name`.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.get(name).map(Parameter::value)
    }

    /// Set the value of the parameter `name`, e.g. to supply an initial guess.
    pub fn set_value(&mut self, name: &str, value: f64) -> std::result::Result<(), ParameterError> {
        self.get_mut(name)
            .ok_or_else(|| ParameterError::ParameterNotFound {
                name: name.to_string(),
            })?
            .set_value(value)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameter names in schema order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(Parameter::name)
    }

    pub fn names(&self) -> Vec<String> {
        self.keys().map(str::to_string).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.params.iter_mut()
    }

    /// Current values in schema order.
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(Parameter::value).collect()
    }

    /// `(name, value)` pairs in schema order.
    pub fn values_dict(&self) -> Vec<(String, f64)> {
        self.params
            .iter()
            .map(|p| (p.name().to_string(), p.value()))
            .collect()
    }

    /// Overwrite every value, in schema order.
    ///
    /// All values are validated before any is written.
    pub fn set_values(&mut self, values: &[f64]) -> std::result::Result<(), ParameterError> {
        if values.len() != self.params.len() {
            return Err(ParameterError::ValueCountMismatch {
                expected: self.params.len(),
                actual: values.len(),
            });
        }

        let mut updated = self.params.clone();
        for (param, &value) in updated.iter_mut().zip(values) {
            param.set_value(value)?;
        }
        self.params = updated;
        Ok(())
    }

    /// Parameters the optimizer may vary, in schema order.
    pub fn varying(&self) -> Vec<&Parameter> {
        self.params.iter().filter(|p| p.vary()).collect()
    }

    /// Parameters held fixed during a fit.
    pub fn fixed(&self) -> Vec<&Parameter> {
        self.params.iter().filter(|p| !p.vary()).collect()
    }

    pub fn varying_names(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|p| p.vary())
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Internal (optimizer-space) values of the varying parameters.
    pub fn varying_internal_values(&self) -> std::result::Result<Vec<f64>, ParameterError> {
        self.params
            .iter()
            .filter(|p| p.vary())
            .map(Parameter::to_internal)
            .collect()
    }

    /// Full value vector, in schema order, with the varying parameters taken
    /// from `internal` and the fixed ones from the schema.
    pub fn values_from_internal(
        &self,
        internal: &[f64],
    ) -> std::result::Result<Vec<f64>, ParameterError> {
        let nvarys = self.params.iter().filter(|p| p.vary()).count();
        if internal.len() != nvarys {
            return Err(ParameterError::ValueCountMismatch {
                expected: nvarys,
                actual: internal.len(),
            });
        }

        let mut internal = internal.iter();
        Ok(self
            .params
            .iter()
            .map(|p| {
                if p.vary() {
                    internal
                        .next()
                        .map_or(p.value(), |&v| p.bounds().clamp(p.from_internal(v)))
                } else {
                    p.value()
                }
            })
            .collect())
    }

    /// A copy of this schema with the varying parameters set from internal values.
    ///
    /// `self` is left untouched, so callers can validate the result before
    /// swapping it in.
    pub fn with_internal_values(
        &self,
        internal: &[f64],
    ) -> std::result::Result<Self, ParameterError> {
        let values = self.values_from_internal(internal)?;
        let mut updated = self.clone();
        for (param, value) in updated.params.iter_mut().zip(values) {
            if param.vary() {
                param.set_value(value)?;
            }
        }
        Ok(updated)
    }

    /// Reset every parameter to its initial value.
    pub fn reset(&mut self) {
        for param in &mut self.params {
            param.reset();
        }
    }
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<Parameter>> for ParameterSchema {
    type Error = ParameterError;

    fn try_from(params: Vec<Parameter>) -> std::result::Result<Self, Self::Error> {
        let mut schema = Self::new();
        for param in params {
            schema.add(param)?;
        }
        Ok(schema)
    }
}

impl From<ParameterSchema> for Vec<Parameter> {
    fn from(schema: ParameterSchema) -> Self {
        schema.params
    }
}

impl fmt::Display for ParameterSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for param in &self.params {
            write!(f, "{:>12} = {:>14.6e}", param.name(), param.value())?;
            if let Some(stderr) = param.stderr() {
                write!(f, " +/- {:.3e}", stderr)?;
            }
            if !param.vary() {
                write!(f, " (fixed)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Build the schema for `n_peaks` copies of `lineshape`.
///
/// Keys are `"{name}_{peak}"`, peak-major, every value starting at
/// [`DEFAULT_PARAMETER_VALUE`].
///
/// # Errors
///
/// `ConfigurationError` if `n_peaks` is zero or the lineshape's parameter
/// descriptor is empty, has blank names, or repeats a name.
///
/// # Examples
///
/// ```
/// use multipeak_rs::lineshapes::Gaussian;
/// use multipeak_rs::parameters::build_schema;
///
/// let schema = build_schema(&Gaussian, 2).unwrap();
/// assert_eq!(
///     schema.names(),
///     ["amp_0", "center_0", "width_0", "amp_1", "center_1", "width_1"]
/// );
/// ```
pub fn build_schema(lineshape: &dyn Lineshape, n_peaks: usize) -> Result<ParameterSchema> {
    if n_peaks == 0 {
        return Err(MultiPeakError::ConfigurationError(
            "n_peaks must be a positive integer".to_string(),
        ));
    }

    let base_names = declared_parameters(lineshape)?;

    let mut schema = ParameterSchema::new();
    for peak in 0..n_peaks {
        for base in &base_names {
            schema
                .add_param(&parameter_key(base, peak), DEFAULT_PARAMETER_VALUE)
                .map_err(|e| MultiPeakError::ConfigurationError(e.to_string()))?;
        }
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineshapes::FnLineshape;
    use ndarray::Array1;

    fn linear_shape(names: &[&str]) -> FnLineshape {
        FnLineshape::new("test", names, |x: &Array1<f64>, _p: &[f64]| Array1::zeros(x.len()))
    }

    #[test]
    fn test_build_schema_layout() {
        let shape = linear_shape(&["a", "b"]);
        let schema = build_schema(&shape, 3).unwrap();

        assert_eq!(schema.len(), 6);
        assert_eq!(schema.names(), ["a_0", "b_0", "a_1", "b_1", "a_2", "b_2"]);
        assert!(schema.iter().all(|p| p.value() == DEFAULT_PARAMETER_VALUE));
        assert!(schema.iter().all(|p| p.vary()));
    }

    #[test]
    fn test_build_schema_rejects_zero_peaks() {
        let shape = linear_shape(&["a"]);
        assert!(matches!(
            build_schema(&shape, 0),
            Err(MultiPeakError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_build_schema_rejects_bad_descriptor() {
        for names in [&[][..], &["a", "a"][..], &["a", ""][..]] {
            let shape = linear_shape(names);
            assert!(matches!(
                build_schema(&shape, 1),
                Err(MultiPeakError::ConfigurationError(_))
            ));
        }
    }

    #[test]
    fn test_lookup_and_set_value() {
        let mut schema = build_schema(&linear_shape(&["a", "b"]), 2).unwrap();

        schema.set_value("b_1", 4.0).unwrap();
        assert_eq!(schema.value("b_1"), Some(4.0));
        assert_eq!(schema.values(), vec![1.0, 1.0, 1.0, 4.0]);

        assert!(matches!(
            schema.set_value("c_0", 1.0),
            Err(ParameterError::ParameterNotFound { .. })
        ));
    }

    #[test]
    fn test_set_values_is_all_or_nothing() {
        let mut schema = ParameterSchema::new();
        schema.add_param("a_0", 1.0).unwrap();
        schema
            .add(Parameter::with_bounds("b_0", 1.0, 0.0, 2.0).unwrap())
            .unwrap();

        assert!(schema.set_values(&[5.0, 3.0]).is_err());
        assert_eq!(schema.values(), vec![1.0, 1.0]);

        assert!(schema.set_values(&[5.0]).is_err());

        schema.set_values(&[5.0, 1.5]).unwrap();
        assert_eq!(schema.values(), vec![5.0, 1.5]);
    }

    #[test]
    fn test_internal_values_skip_fixed_parameters() {
        let mut schema = build_schema(&linear_shape(&["a", "b"]), 2).unwrap();
        schema.get_mut("a_1").unwrap().set_vary(false);
        schema.set_value("a_1", 7.0).unwrap();

        let internal = schema.varying_internal_values().unwrap();
        assert_eq!(internal.len(), 3);
        assert_eq!(schema.varying_names(), ["a_0", "b_0", "b_1"]);
        assert_eq!(schema.fixed().len(), 1);

        let values = schema.values_from_internal(&[2.0, 3.0, 4.0]).unwrap();
        assert_eq!(values, vec![2.0, 3.0, 7.0, 4.0]);

        let updated = schema.with_internal_values(&[2.0, 3.0, 4.0]).unwrap();
        assert_eq!(updated.values(), vec![2.0, 3.0, 7.0, 4.0]);
        assert_eq!(schema.values(), vec![1.0, 1.0, 7.0, 1.0]);

        assert!(schema.values_from_internal(&[1.0]).is_err());
    }

    #[test]
    fn test_reset() {
        let mut schema = build_schema(&linear_shape(&["a"]), 2).unwrap();
        schema.set_values(&[3.0, 4.0]).unwrap();
        schema.reset();
        assert_eq!(schema.values(), vec![1.0, 1.0]);
    }
}
