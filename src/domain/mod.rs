//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input configuration enums (`Weighting`, `InputFormat`)
//! - the cross-validation results contract (`FoldRecord`, `ResultsSet`)
//! - run configuration (`EvalConfig`, `SampleConfig`)

pub mod types;

pub use types::*;
