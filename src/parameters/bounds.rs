//! Parameter bounds.
//!
//! Bounded peak parameters (a non-negative amplitude, a width kept inside a
//! physically sensible window) are handed to the optimizer through the
//! Minuit-style transform implemented here, so the optimizer itself only
//! ever sees unbounded values.

use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Parameter value {value} is outside bounds: [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Non-finite parameter value is not allowed")]
    NonFiniteValue,
}

/// Lower and upper limits on a parameter value.
///
/// Infinite limits are serialized as `null`. Deserialization goes through
/// [`Bounds::new`], so `min > max` is rejected on load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoundsRepr", into = "BoundsRepr")]
pub struct Bounds {
    /// Minimum allowed value for the parameter
    pub min: f64,

    /// Maximum allowed value for the parameter
    pub max: f64,
}

#[derive(Serialize, Deserialize)]
struct BoundsRepr {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

impl TryFrom<BoundsRepr> for Bounds {
    type Error = BoundsError;

    fn try_from(repr: BoundsRepr) -> Result<Self, Self::Error> {
        Self::new(
            repr.min.unwrap_or(NEG_INFINITY),
            repr.max.unwrap_or(INFINITY),
        )
    }
}

impl From<Bounds> for BoundsRepr {
    fn from(bounds: Bounds) -> Self {
        Self {
            min: bounds.min.is_finite().then_some(bounds.min),
            max: bounds.max.is_finite().then_some(bounds.max),
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }
}

impl Bounds {
    /// Create bounds from `min` and `max`. `min == max` pins the value.
    ///
    /// # Examples
    ///
    /// ```
    /// use multipeak_rs::parameters::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert!(Bounds::new(10.0, 0.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// Bounds spanning the whole real line.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Only a lower limit, e.g. for amplitudes and widths.
    pub fn min_only(min: f64) -> Self {
        Self { min, max: INFINITY }
    }

    /// Only an upper limit.
    pub fn max_only(max: f64) -> Self {
        Self {
            min: NEG_INFINITY,
            max,
        }
    }

    /// Check if a value is within the bounds (inclusive).
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// `true` if min is finite
    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    /// `true` if max is finite
    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    /// Clamp a value to be within the bounds
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Minuit-style mapping between external (bounded) and internal (unbounded)
/// parameter values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    /// Map an internal optimizer value back into the bounded domain.
    pub fn to_external(&self, internal_value: f64) -> f64 {
        match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => internal_value,
            (true, false) => self.bounds.min - 1.0 + (internal_value * internal_value + 1.0).sqrt(),
            (false, true) => self.bounds.max + 1.0 - (internal_value * internal_value + 1.0).sqrt(),
            (true, true) => {
                let range = self.bounds.max - self.bounds.min;
                self.bounds.min + (internal_value.sin() + 1.0) * range / 2.0
            }
        }
    }

    /// Map a bounded value into the optimizer's unbounded space.
    ///
    /// Fails if the value is not finite or lies outside the bounds.
    pub fn to_internal(&self, external_value: f64) -> Result<f64, BoundsError> {
        if !external_value.is_finite() {
            return Err(BoundsError::NonFiniteValue);
        }

        if !self.bounds.is_within_bounds(external_value) {
            return Err(BoundsError::ValueOutsideBounds {
                value: external_value,
                min: self.bounds.min,
                max: self.bounds.max,
            });
        }

        let internal = match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => external_value,
            (true, false) => ((external_value - self.bounds.min + 1.0).powi(2) - 1.0).sqrt(),
            (false, true) => ((self.bounds.max - external_value + 1.0).powi(2) - 1.0).sqrt(),
            (true, true) => {
                let range = self.bounds.max - self.bounds.min;
                if range == 0.0 {
                    0.0
                } else {
                    (2.0 * (external_value - self.bounds.min) / range - 1.0)
                        .clamp(-1.0, 1.0)
                        .asin()
                }
            }
        };

        Ok(internal)
    }

    /// Derivative of the external value with respect to the internal value,
    /// evaluated at `internal_value`.
    ///
    /// Used to carry standard errors computed in internal space back to the
    /// bounded parameter.
    pub fn external_derivative(&self, internal_value: f64) -> f64 {
        match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => 1.0,
            (true, false) => internal_value / (internal_value * internal_value + 1.0).sqrt(),
            (false, true) => -internal_value / (internal_value * internal_value + 1.0).sqrt(),
            (true, true) => {
                let range = self.bounds.max - self.bounds.min;
                range * internal_value.cos() / 2.0
            }
        }
    }
}
