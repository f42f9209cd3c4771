//! Parameter definition and implementation
//!
//! A [`Parameter`] is one entry of a [`ParameterSchema`](super::ParameterSchema):
//! a named scalar with a current value, optional bounds, and a flag telling
//! the fit driver whether the optimizer may vary it.

use crate::parameters::bounds::{Bounds, BoundsError, BoundsTransform};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when working with parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Bounds error: {0}")]
    BoundsError(#[from] BoundsError),

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Parameter '{name}' already exists")]
    DuplicateParameter { name: String },

    #[error("Expected {expected} values, got {actual}")]
    ValueCountMismatch { expected: usize, actual: usize },
}

/// A named fit parameter.
///
/// Deserialization rejects a value that is not finite or lies outside the
/// bounds, and a non-finite initial value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParameterRepr")]
pub struct Parameter {
    name: String,

    value: f64,

    /// Value at creation, restored by [`Parameter::reset`]
    init_value: f64,

    /// Whether the optimizer may change this parameter
    vary: bool,

    bounds: Bounds,

    /// Standard error from the last successful fit
    stderr: Option<f64>,
}

#[derive(Deserialize)]
struct ParameterRepr {
    name: String,
    value: f64,
    init_value: f64,
    vary: bool,
    #[serde(default)]
    bounds: Bounds,
    #[serde(default)]
    stderr: Option<f64>,
}

impl TryFrom<ParameterRepr> for Parameter {
    type Error = ParameterError;

    fn try_from(repr: ParameterRepr) -> Result<Self, Self::Error> {
        if !repr.init_value.is_finite() {
            return Err(BoundsError::NonFiniteValue.into());
        }

        // init_value may lie outside bounds set later; reset() clamps it
        let mut param = Self {
            name: repr.name,
            value: repr.init_value,
            init_value: repr.init_value,
            vary: repr.vary,
            bounds: repr.bounds,
            stderr: repr.stderr,
        };
        param.set_value(repr.value)?;
        Ok(param)
    }
}

impl Parameter {
    /// Create a new, unbounded, varying parameter.
    ///
    /// # Examples
    ///
    /// ```
    /// use multipeak_rs::parameters::Parameter;
    ///
    /// let param = Parameter::new("amp_0", 1.0);
    /// assert_eq!(param.name(), "amp_0");
    /// assert_eq!(param.value(), 1.0);
    /// assert!(param.vary());
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            init_value: value,
            vary: true,
            bounds: Bounds::default(),
            stderr: None,
        }
    }

    /// Create a new parameter with bounds. The value is clamped into `[min, max]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use multipeak_rs::parameters::Parameter;
    ///
    /// let param = Parameter::with_bounds("width_0", 25.0, 0.0, 20.0).unwrap();
    /// assert_eq!(param.value(), 20.0);
    /// assert_eq!(param.max(), 20.0);
    /// ```
    pub fn with_bounds(name: &str, value: f64, min: f64, max: f64) -> Result<Self, ParameterError> {
        let bounds = Bounds::new(min, max)?;
        let value = bounds.clamp(value);

        Ok(Self {
            name: name.to_string(),
            value,
            init_value: value,
            vary: true,
            bounds,
            stderr: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value of the parameter
    ///
    /// Fails if the value is not finite or lies outside the bounds; the
    /// previous value is kept in that case.
    pub fn set_value(&mut self, value: f64) -> Result<(), ParameterError> {
        if !value.is_finite() {
            return Err(BoundsError::NonFiniteValue.into());
        }
        if !self.bounds.is_within_bounds(value) {
            return Err(BoundsError::ValueOutsideBounds {
                value,
                min: self.bounds.min,
                max: self.bounds.max,
            }
            .into());
        }

        self.value = value;
        Ok(())
    }

    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    /// Reset the parameter to its initial value, clamped into the current bounds.
    pub fn reset(&mut self) {
        self.value = self.bounds.clamp(self.init_value);
        self.stderr = None;
    }

    pub fn vary(&self) -> bool {
        self.vary
    }

    /// Allow or forbid the optimizer to change this parameter.
    pub fn set_vary(&mut self, vary: bool) {
        self.vary = vary;
    }

    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Set the bounds for the parameter, clamping the current value into them.
    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<(), ParameterError> {
        let bounds = Bounds::new(min, max)?;
        self.bounds = bounds;
        self.value = bounds.clamp(self.value);
        Ok(())
    }

    pub fn stderr(&self) -> Option<f64> {
        self.stderr
    }

    pub fn set_stderr(&mut self, stderr: Option<f64>) {
        self.stderr = stderr;
    }

    pub fn bounds_transform(&self) -> BoundsTransform {
        BoundsTransform::new(self.bounds)
    }

    /// The value as seen by the optimizer.
    pub fn to_internal(&self) -> Result<f64, ParameterError> {
        self.bounds_transform()
            .to_internal(self.value)
            .map_err(ParameterError::from)
    }

    /// Convert an optimizer value to a parameter value.
    pub fn from_internal(&self, internal_value: f64) -> f64 {
        self.bounds_transform().to_external(internal_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::{INFINITY, NEG_INFINITY};

    #[test]
    fn test_parameter_creation() {
        let param = Parameter::new("amp_0", 10.0);
        assert_eq!(param.name(), "amp_0");
        assert_eq!(param.value(), 10.0);
        assert_eq!(param.init_value(), 10.0);
        assert!(param.vary());
        assert_eq!(param.min(), NEG_INFINITY);
        assert_eq!(param.max(), INFINITY);
        assert!(param.stderr().is_none());

        let param = Parameter::with_bounds("amp_0", 10.0, 0.0, 20.0).unwrap();
        assert_eq!(param.min(), 0.0);
        assert_eq!(param.max(), 20.0);

        assert!(Parameter::with_bounds("amp_0", 1.0, 5.0, 0.0).is_err());
    }

    #[test]
    fn test_parameter_value() {
        let mut param = Parameter::with_bounds("amp_0", 10.0, 0.0, 20.0).unwrap();

        param.set_value(15.0).unwrap();
        assert_eq!(param.value(), 15.0);

        assert!(param.set_value(25.0).is_err());
        assert!(param.set_value(f64::INFINITY).is_err());
        assert!(param.set_value(f64::NAN).is_err());
        assert_eq!(param.value(), 15.0);
    }

    #[test]
    fn test_parameter_reset() {
        let mut param = Parameter::new("center_0", 10.0);
        param.set_value(15.0).unwrap();
        param.set_stderr(Some(0.1));
        param.reset();
        assert_eq!(param.value(), 10.0);
        assert!(param.stderr().is_none());

        // Initial value outside new bounds is clamped
        let mut param = Parameter::with_bounds("center_0", 10.0, 0.0, 20.0).unwrap();
        param.set_bounds(12.0, 18.0).unwrap();
        param.reset();
        assert_eq!(param.value(), 12.0);
    }

    #[test]
    fn test_deserialize_checks_value_against_bounds() {
        let param = Parameter::with_bounds("width_0", 2.0, 0.5, 3.0).unwrap();
        let json = serde_json::to_string(&param).unwrap();
        let restored: Parameter = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, param);

        let outside = json.replace("\"value\":2.0", "\"value\":10.0");
        assert_ne!(outside, json);
        assert!(serde_json::from_str::<Parameter>(&outside).is_err());

        let bad_bounds = r#"{"name":"amp_0","value":3.0,"init_value":3.0,"vary":true,"bounds":{"min":5.0,"max":1.0},"stderr":null}"#;
        assert!(serde_json::from_str::<Parameter>(bad_bounds).is_err());
    }

    #[test]
    fn test_parameter_bounds() {
        let mut param = Parameter::new("width_0", 10.0);

        param.set_bounds(0.0, 20.0).unwrap();
        assert_eq!(param.min(), 0.0);
        assert_eq!(param.max(), 20.0);

        assert!(param.set_bounds(20.0, 0.0).is_err());
        assert_eq!(param.min(), 0.0);

        let mut param = Parameter::new("width_0", 10.0);
        param.set_bounds(15.0, 25.0).unwrap();
        assert_eq!(param.value(), 15.0);
    }

    #[test]
    fn test_parameter_internal_roundtrip() {
        let param = Parameter::new("amp_0", 10.0);
        assert_eq!(param.to_internal().unwrap(), 10.0);
        assert_eq!(param.from_internal(15.0), 15.0);

        let param = Parameter::with_bounds("amp_0", 10.0, 0.0, 20.0).unwrap();
        let internal = param.to_internal().unwrap();
        assert!((param.from_internal(internal) - 10.0).abs() < 1e-10);
    }
}
