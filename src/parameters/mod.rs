//! # Parameter System
//!
//! Named parameters for multi-peak models.
//!
//! ## Core Components
//!
//! - [`Parameter`]: a single value with bounds and a vary flag
//! - [`ParameterSchema`]: the ordered, uniquely-named collection a fitter owns
//! - [`build_schema`]: synthesizes `"{name}_{peak}"` parameters for every peak
//! - [`Bounds`] and [`BoundsTransform`]: bounds handling during optimization
//!
//! ## Example Usage
//!
//! ```rust
//! use multipeak_rs::lineshapes::Lorentzian;
//! use multipeak_rs::parameters::build_schema;
//!
//! let mut schema = build_schema(&Lorentzian, 2).unwrap();
//!
//! // Initial guesses are written straight into the schema
//! schema.set_value("center_1", 4.5).unwrap();
//! schema.get_mut("width_0").unwrap().set_bounds(0.0, 5.0).unwrap();
//!
//! // Hold a parameter fixed during the fit
//! schema.get_mut("amp_1").unwrap().set_vary(false);
//!
//! assert_eq!(schema.varying().len(), 5);
//! ```

pub mod bounds;
pub mod parameter;
pub mod schema;

// Re-export key types
pub use bounds::{Bounds, BoundsError, BoundsTransform};
pub use parameter::{Parameter, ParameterError};
pub use schema::{build_schema, parameter_key, ParameterSchema, DEFAULT_PARAMETER_VALUE};
