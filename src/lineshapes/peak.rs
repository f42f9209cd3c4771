//! Reference peak lineshapes.
//!
//! Both curves use the parameter names `amp`, `center`, `width`.

use super::Lineshape;
use ndarray::Array1;

const PEAK_PARAMETERS: [&str; 3] = ["amp", "center", "width"];

/// A Gaussian peak.
///
/// f(x) = amp * exp(-(x - center)² / (2 * width²))
///
/// `amp` is the peak height and `width` the standard deviation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian;

impl Lineshape for Gaussian {
    fn name(&self) -> &str {
        "gaussian"
    }

    fn parameter_names(&self) -> Vec<&str> {
        PEAK_PARAMETERS.to_vec()
    }

    fn evaluate(&self, x: &Array1<f64>, params: &[f64]) -> Array1<f64> {
        let &[amp, center, width] = params else {
            return Array1::from_elem(x.len(), f64::NAN);
        };

        x.mapv(|x_val| {
            let dx = x_val - center;
            amp * (-dx * dx / (2.0 * width * width)).exp()
        })
    }
}

/// A Lorentzian peak.
///
/// f(x) = amp * (width / 2) / ((x - center)² + (width / 2)²)
///
/// `width` is the full width at half maximum; the peak height is
/// `2 * amp / width`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lorentzian;

impl Lineshape for Lorentzian {
    fn name(&self) -> &str {
        "lorentzian"
    }

    fn parameter_names(&self) -> Vec<&str> {
        PEAK_PARAMETERS.to_vec()
    }

    fn evaluate(&self, x: &Array1<f64>, params: &[f64]) -> Array1<f64> {
        let &[amp, center, width] = params else {
            return Array1::from_elem(x.len(), f64::NAN);
        };

        let hwhm = 0.5 * width;
        x.mapv(|x_val| {
            let dx = x_val - center;
            amp * hwhm / (dx * dx + hwhm * hwhm)
        })
    }
}
