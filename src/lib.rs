//! # multipeak-rs
//!
//! `multipeak-rs` fits multi-peak spectral models (sums of Gaussian,
//! Lorentzian, or user-defined lineshapes) to measured x/y data with a
//! Levenberg-Marquardt least-squares optimizer.
//!
//! Pick a lineshape and a peak count; the library builds the flat parameter
//! schema (`amp_0, center_0, width_0, amp_1, ...`) and the composite model
//! for you.
//!
//! The library provides:
//! - [`Lineshape`] implementations and a closure-backed [`FnLineshape`]
//! - A parameter system with bounds, fixed parameters, and standard errors
//! - A composite model that sums `n_peaks` lineshape copies
//! - A [`Fitter`] that drives the optimizer and replaces its parameters only on success
//! - Parallel batch fitting of independent spectra (feature `parallel`)
//!
//! ## Basic Usage
//!
//! ```
//! use multipeak_rs::{Fitter, Gaussian};
//! use ndarray::Array1;
//!
//! // Two well-separated peaks
//! let x = Array1::linspace(-10.0, 10.0, 201);
//! let y = x.mapv(|x: f64| {
//!     3.0 * (-(x + 3.0).powi(2) / 2.0).exp() + 1.5 * (-(x - 4.0).powi(2) / 2.0).exp()
//! });
//!
//! let mut fitter = Fitter::new(Gaussian, 2).unwrap();
//! fitter.set_peak_values(0, &[2.0, -2.5, 1.2]).unwrap();
//! fitter.set_peak_values(1, &[1.0, 3.5, 1.2]).unwrap();
//!
//! fitter.fit(&x, &y).unwrap();
//!
//! let peak = fitter.peak_values(1).unwrap();
//! assert!((peak[1] - 4.0).abs() < 1e-6);
//! ```

// Public modules
pub mod error;

pub mod lineshapes;

// Parameter system
pub mod parameters;

pub mod problem;

pub mod lm;

pub mod model;

pub mod fitter;

pub mod uncertainty;

pub mod utils;

#[cfg(feature = "parallel")]
pub mod batch;

// Re-exports for convenience
pub use error::{MultiPeakError, Result};
pub use fitter::{FitResult, Fitter, FitterBuilder};
pub use lineshapes::{FnLineshape, Gaussian, Lineshape, Lorentzian};
pub use lm::{LevenbergMarquardt, LmConfig};
pub use model::{build_model, CompositeModel};
pub use parameters::{build_schema, Parameter, ParameterSchema};
pub use problem::Problem;

#[cfg(feature = "parallel")]
pub use batch::fit_batch;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
