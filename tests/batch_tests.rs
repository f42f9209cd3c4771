//! Parallel batch fitting of many spectra with one shared lineshape.
#![cfg(feature = "parallel")]

mod common;

use approx::assert_relative_eq;
use common::{add_noise, init_logging, synthetic_spectrum};
use multipeak_rs::lineshapes::{Lineshape, Lorentzian};
use multipeak_rs::{fit_batch, Fitter};
use std::sync::Arc;

#[test]
fn test_batch_over_noisy_spectra() {
    init_logging();
    let shape: Arc<dyn Lineshape> = Arc::new(Lorentzian);

    let truths: Vec<[f64; 3]> = (0..8)
        .map(|i| [2.0 + 0.25 * i as f64, -1.0 + 0.3 * i as f64, 1.5])
        .collect();
    let datasets: Vec<_> = truths
        .iter()
        .enumerate()
        .map(|(i, truth)| {
            let (x, y) = synthetic_spectrum(Lorentzian, truth, -10.0, 10.0, 201);
            (x, add_noise(&y, 0.01, i as u64))
        })
        .collect();

    let mut fitters: Vec<Fitter> = truths
        .iter()
        .map(|truth| {
            let mut fitter = Fitter::with_shared_lineshape(Arc::clone(&shape), 1).unwrap();
            fitter
                .set_peak_values(0, &[truth[0] * 0.8, truth[1] + 0.3, 1.2])
                .unwrap();
            fitter
        })
        .collect();

    let results = fit_batch(&mut fitters, &datasets).unwrap();
    assert_eq!(results.len(), truths.len());

    for ((result, fitter), truth) in results.iter().zip(&fitters).zip(&truths) {
        let result = result.as_ref().unwrap();
        assert!(result.success);
        assert_eq!(result.ndata, 201);

        let fitted = fitter.peak_values(0).unwrap();
        assert_relative_eq!(fitted[1], truth[1], epsilon = 0.05);
        assert_relative_eq!(fitted[2].abs(), truth[2], epsilon = 0.1);
    }
}
