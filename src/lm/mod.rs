//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides the nonlinear least-squares minimizer behind every
//! fit: Marquardt diagonal scaling, damping adapted from the gain ratio, and
//! Cholesky solves of the normal equations.

pub mod algorithm;
pub mod config;
pub mod convergence;
pub mod step;
pub mod trust_region;

// Re-export key types
pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
pub use step::{LmStep, NormalEquations, StepResult};
pub use trust_region::TrustRegion;
