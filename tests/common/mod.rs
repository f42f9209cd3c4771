//! Shared helpers for the integration tests.
#![allow(dead_code)]

use multipeak_rs::lineshapes::Lineshape;
use multipeak_rs::model::build_model;
use ndarray::Array1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;

/// Route `log` output through the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Noise-free spectrum of `truth` (flat, peak-major) on `n` points in `[lo, hi]`.
pub fn synthetic_spectrum<L: Lineshape + 'static>(
    lineshape: L,
    truth: &[f64],
    lo: f64,
    hi: f64,
    n: usize,
) -> (Array1<f64>, Array1<f64>) {
    let k = lineshape.parameter_count();
    let model = build_model(Arc::new(lineshape), truth.len() / k);
    let x = Array1::linspace(lo, hi, n);
    let y = model
        .eval_values(&x, truth)
        .expect("truth values must match the model");
    (x, y)
}

/// Add reproducible Gaussian noise with standard deviation `sigma`.
pub fn add_noise(y: &Array1<f64>, sigma: f64, seed: u64) -> Array1<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(0.0, sigma).expect("sigma must be positive");
    y.mapv(|v| v + normal.sample(&mut rng))
}
