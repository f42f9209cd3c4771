//! Parallel fitting of independent spectra.
//!
//! Fitters share nothing mutable, so a set of fitter/dataset pairs can be fit
//! concurrently with Rayon. Each fit behaves exactly as [`Fitter::fit`] does
//! when called on its own.

use log::info;
use ndarray::Array1;
use rayon::prelude::*;

use crate::error::{MultiPeakError, Result};
use crate::fitter::{FitResult, Fitter};

/// Fit each fitter against the dataset at the same index, in parallel.
///
/// The outer `Result` fails only when the slices differ in length. Each
/// entry of the returned vector is the outcome of one fit: a failed fit
/// leaves its fitter's schema untouched and does not affect the others.
///
/// # Examples
///
/// ```
/// use multipeak_rs::batch::fit_batch;
/// use multipeak_rs::{Fitter, Gaussian};
/// use ndarray::Array1;
///
/// let x = Array1::linspace(-5.0, 5.0, 51);
/// let datasets: Vec<_> = [1.0, 2.0]
///     .iter()
///     .map(|&amp| (x.clone(), x.mapv(|x: f64| amp * (-x * x / 2.0).exp())))
///     .collect();
///
/// let mut fitters = vec![Fitter::new(Gaussian, 1).unwrap(), Fitter::new(Gaussian, 1).unwrap()];
/// let results = fit_batch(&mut fitters, &datasets).unwrap();
///
/// assert!(results.iter().all(|r| r.is_ok()));
/// assert!((fitters[1].schema().value("amp_0").unwrap() - 2.0).abs() < 1e-6);
/// ```
pub fn fit_batch(
    fitters: &mut [Fitter],
    datasets: &[(Array1<f64>, Array1<f64>)],
) -> Result<Vec<Result<FitResult>>> {
    if fitters.len() != datasets.len() {
        return Err(MultiPeakError::ConfigurationError(format!(
            "{} fitters but {} datasets",
            fitters.len(),
            datasets.len()
        )));
    }

    info!("fitting {} spectra in parallel", fitters.len());

    Ok(fitters
        .par_iter_mut()
        .zip(datasets.par_iter())
        .map(|(fitter, (x, y))| {
            fitter.fit(x, y)?;
            fitter.result().cloned().ok_or_else(|| {
                MultiPeakError::FitError("fit finished without a result".to_string())
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineshapes::Gaussian;
    use approx::assert_relative_eq;

    fn gaussian(x: &Array1<f64>, amp: f64, center: f64) -> Array1<f64> {
        x.mapv(|xi| amp * (-(xi - center).powi(2) / 2.0).exp())
    }

    #[test]
    fn test_batch_matches_sequential() {
        let x = Array1::linspace(-8.0, 8.0, 161);
        let datasets: Vec<_> = [(1.0, -1.0), (2.5, 0.5), (0.7, 2.0)]
            .iter()
            .map(|&(amp, center)| (x.clone(), gaussian(&x, amp, center)))
            .collect();

        let make = || {
            let mut fitter = Fitter::new(Gaussian, 1).unwrap();
            fitter.schema_mut().set_value("center_0", 0.0).unwrap();
            fitter
        };

        let mut batch: Vec<_> = (0..3).map(|_| make()).collect();
        let results = fit_batch(&mut batch, &datasets).unwrap();
        assert_eq!(results.len(), 3);

        for (fitter, (x, y)) in batch.iter().zip(&datasets) {
            let mut sequential = make();
            sequential.fit(x, y).unwrap();
            for (a, b) in fitter.schema().values().iter().zip(sequential.schema().values()) {
                assert_relative_eq!(*a, b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_batch_isolates_failures() {
        let x = Array1::linspace(-8.0, 8.0, 161);
        let good = (x.clone(), gaussian(&x, 1.0, 0.5));
        let bad = (x.clone(), Array1::zeros(3));

        let mut fitters = vec![
            Fitter::new(Gaussian, 1).unwrap(),
            Fitter::new(Gaussian, 1).unwrap(),
        ];
        let results = fit_batch(&mut fitters, &[good, bad]).unwrap();

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(MultiPeakError::FitError(_))));
        assert_eq!(fitters[1].schema().values(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_batch_length_mismatch() {
        let mut fitters = vec![Fitter::new(Gaussian, 1).unwrap()];
        assert!(matches!(
            fit_batch(&mut fitters, &[]),
            Err(MultiPeakError::ConfigurationError(_))
        ));
    }
}
