//! Fit two overlapping Gaussian peaks in a noisy synthetic spectrum.
//!
//! Run with `RUST_LOG=debug` to watch the optimizer iterate.

use multipeak_rs::lineshapes::Gaussian;
use multipeak_rs::model::build_model;
use multipeak_rs::Fitter;
use ndarray::Array1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // amp, center, width for each peak
    let truth = [4.0, -1.5, 0.8, 2.5, 1.0, 1.1];

    let x = Array1::linspace(-8.0, 8.0, 321);
    let clean = build_model(Arc::new(Gaussian), 2).eval_values(&x, &truth)?;

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let noise = Normal::new(0.0, 0.05)?;
    let y = clean.mapv(|v| v + noise.sample(&mut rng));

    let mut fitter = Fitter::builder()
        .lineshape(Gaussian)
        .n_peaks(2)
        .max_iterations(500)
        .build()?;

    fitter.set_peak_values(0, &[3.0, -2.0, 1.0])?;
    fitter.set_peak_values(1, &[2.0, 1.5, 1.0])?;
    fitter
        .schema_mut()
        .get_mut("width_0")
        .ok_or("missing width_0")?
        .set_bounds(0.1, 5.0)?;

    fitter.fit(&x, &y)?;

    println!("{}", fitter.report());

    if let Some(result) = fitter.result() {
        println!("Correlations between varying parameters:");
        if let Some(correlation) = result.correlation() {
            for (i, a) in result.var_names.iter().enumerate() {
                for (j, b) in result.var_names.iter().enumerate().skip(i + 1) {
                    let c = correlation[[i, j]];
                    if c.abs() > 0.1 {
                        println!("    C({}, {}) = {:+.3}", a, b, c);
                    }
                }
            }
        }
    }

    for (peak, component) in fitter.eval_components(&x)?.iter().enumerate() {
        let max = component.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        println!("peak {}: maximum {:.4}", peak, max);
    }

    Ok(())
}
