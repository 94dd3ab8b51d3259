//! Piecewise-linear curve fitting.
//!
//! Responsibilities:
//!
//! - define the point-accumulation fitting capability (`PointFitter`)
//! - provide the default deterministic least-squares implementation
//! - represent finished fits as continuous, evaluable functions

pub mod pwl;

pub use pwl::*;
