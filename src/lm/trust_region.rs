//! Damping control for the Levenberg-Marquardt algorithm.
//!
//! Nielsen's schedule: an accepted step scales lambda by
//! `max(1/3, 1 - (2 * rho - 1)^3)` where `rho` is the gain ratio, a rejected
//! step multiplies it by a growth factor that doubles on every consecutive
//! rejection. Lambda therefore changes smoothly with the quality of the
//! linear model instead of bouncing between two fixed values.

use super::config::LmConfig;

/// Damping state of the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone)]
pub struct TrustRegion {
    /// Current value of the damping parameter
    pub lambda: f64,

    /// Minimum allowed value for the damping parameter
    pub lambda_min: f64,

    /// Maximum allowed value for the damping parameter
    pub lambda_max: f64,

    /// Growth applied on the next rejection; doubles while rejections continue
    pub growth: f64,

    /// Growth after an accepted step
    pub initial_growth: f64,

    /// Smallest factor an accepted step may scale lambda by
    pub min_shrink: f64,
}

impl Default for TrustRegion {
    fn default() -> Self {
        Self::from_config(&LmConfig::default())
    }
}

impl TrustRegion {
    pub fn from_config(config: &LmConfig) -> Self {
        Self {
            lambda: config.initial_lambda,
            lambda_min: config.min_lambda,
            lambda_max: config.max_lambda,
            growth: config.lambda_up_factor,
            initial_growth: config.lambda_up_factor,
            min_shrink: config.lambda_down_factor,
        }
    }

    /// Updates the damping parameter based on the gain ratio.
    ///
    /// Returns whether the step is accepted, i.e. whether the cost decreased.
    pub fn update_lambda(&mut self, gain_ratio: f64) -> bool {
        if gain_ratio > 0.0 {
            let factor = (1.0 - (2.0 * gain_ratio - 1.0).powi(3)).max(self.min_shrink);
            self.lambda = (self.lambda * factor).max(self.lambda_min).min(self.lambda_max);
            self.growth = self.initial_growth;
            true
        } else {
            self.increase();
            false
        }
    }

    /// Increase lambda after a rejected or failed step.
    pub fn increase(&mut self) {
        self.lambda = (self.lambda * self.growth).min(self.lambda_max);
        self.growth *= 2.0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.lambda >= self.lambda_max
    }

    /// Calculates the gain ratio between actual and predicted reduction.
    ///
    /// A non-finite `new_cost` yields negative infinity, so the step is rejected.
    ///
    /// # Arguments
    ///
    /// * `current_cost` - The current cost function value
    /// * `new_cost` - The new cost function value after the step
    /// * `predicted_reduction` - The predicted reduction in cost
    pub fn gain_ratio(current_cost: f64, new_cost: f64, predicted_reduction: f64) -> f64 {
        if !new_cost.is_finite() {
            return f64::NEG_INFINITY;
        }

        let actual_reduction = current_cost - new_cost;
        if predicted_reduction <= 0.0 {
            if actual_reduction > 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            actual_reduction / predicted_reduction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_update_lambda() {
        let mut tr = TrustRegion::default();
        assert_eq!(tr.lambda, 1e-3);

        // Perfect agreement shrinks lambda by the largest allowed factor
        assert!(tr.update_lambda(1.0));
        assert_relative_eq!(tr.lambda, 1e-3 / 3.0, epsilon = 1e-15);

        // rho = 0.5 leaves it unchanged
        assert!(tr.update_lambda(0.5));
        assert_relative_eq!(tr.lambda, 1e-3 / 3.0, epsilon = 1e-15);

        // A barely accepted step nearly doubles it
        assert!(tr.update_lambda(0.01));
        assert_relative_eq!(tr.lambda, 1e-3 / 3.0 * (1.0 + 0.98f64.powi(3)), epsilon = 1e-15);
    }

    #[test]
    fn test_consecutive_rejections_grow_geometrically() {
        let mut tr = TrustRegion::default();

        assert!(!tr.update_lambda(-0.5));
        assert_relative_eq!(tr.lambda, 2e-3, epsilon = 1e-15);
        assert!(!tr.update_lambda(0.0));
        assert_relative_eq!(tr.lambda, 8e-3, epsilon = 1e-15);
        assert!(!tr.update_lambda(f64::NEG_INFINITY));
        assert_relative_eq!(tr.lambda, 6.4e-2, epsilon = 1e-15);

        // Acceptance resets the growth factor
        assert!(tr.update_lambda(0.5));
        assert_eq!(tr.growth, 2.0);
        assert!(!tr.update_lambda(-1.0));
        assert_relative_eq!(tr.lambda, 0.128, epsilon = 1e-15);
    }

    #[test]
    fn test_rejection_cycle_does_not_return_to_start() {
        // A rejection followed by a good step must not undo the increase
        let mut tr = TrustRegion::default();
        let start = tr.lambda;
        assert!(!tr.update_lambda(-0.7));
        assert!(tr.update_lambda(0.8));
        assert!(tr.lambda > start);
    }

    #[test]
    fn test_lambda_limits() {
        let config = LmConfig {
            initial_lambda: 1.0,
            max_lambda: 100.0,
            ..LmConfig::default()
        };
        let mut tr = TrustRegion::from_config(&config);
        for _ in 0..4 {
            tr.increase();
        }
        assert!(tr.is_exhausted());
        tr.increase();
        assert_eq!(tr.lambda, 100.0);
    }

    #[test]
    fn test_gain_ratio() {
        assert_relative_eq!(TrustRegion::gain_ratio(10.0, 8.0, 4.0), 0.5);
        assert_eq!(
            TrustRegion::gain_ratio(10.0, f64::NAN, 4.0),
            f64::NEG_INFINITY
        );
        assert_eq!(TrustRegion::gain_ratio(10.0, 9.0, 0.0), 1.0);
        assert_eq!(TrustRegion::gain_ratio(10.0, 11.0, 0.0), 0.0);
    }
}
