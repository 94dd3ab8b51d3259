//! Mathematical utilities: array statistics and weighted least squares.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
