//! Synthetic results generation for demos and self-contained runs.

pub mod sample;

pub use sample::*;
