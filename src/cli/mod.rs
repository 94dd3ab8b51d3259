//! Command-line parsing for the RUL evaluation tool.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the metric/aggregation code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::InputFormat;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rul", version, about = "Cross-validated RUL prediction evaluation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate a results file: binned errors, regression summaries, and
    /// maintenance-metric sweeps; optionally export tables and a debug bundle.
    Eval(EvalArgs),
    /// Generate a synthetic cross-validated results file (seeded), for
    /// trying the tool without a training harness.
    Sample(SampleArgs),
}

/// Options for evaluating a results file.
#[derive(Debug, Parser, Clone)]
pub struct EvalArgs {
    /// Results file (`.json` or `.csv`).
    pub input: PathBuf,

    /// Results file format.
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    pub format: InputFormat,

    /// Number of true-RUL bins for the binned error table.
    #[arg(long, default_value_t = 5)]
    pub nbins: usize,

    /// Fault-horizon sweep upper bound.
    #[arg(long, default_value_t = 30.0)]
    pub window: f64,

    /// Number of evenly spaced horizon points in `[0, window]`.
    #[arg(long, default_value_t = 15)]
    pub horizon_steps: usize,

    /// Unexpected-break weight in the combined cost metric.
    #[arg(long, default_value_t = 1.0)]
    pub q1: f64,

    /// Unexploited-lifetime weight in the combined cost metric.
    #[arg(long, default_value_t = 1.0)]
    pub q2: f64,

    /// Additive guard for the cost-metric max normalization.
    #[arg(long, default_value_t = 1e-10)]
    pub epsilon: f64,

    /// RUL threshold marking the start of known degradation.
    #[arg(long)]
    pub rul_threshold: Option<f64>,

    /// Constrain fitted curves to be non-increasing.
    #[arg(long)]
    pub not_increasing: bool,

    /// Restrict regression summaries to samples with true RUL <= this value.
    #[arg(long)]
    pub error_threshold: Option<f64>,

    /// Fold shown in the hold-out regression table.
    #[arg(long, default_value_t = 0)]
    pub hold_out_fold: usize,

    /// Export the binned error table to CSV.
    #[arg(long = "export-bins")]
    pub export_bins: Option<PathBuf>,

    /// Export the horizon sweep table to CSV.
    #[arg(long = "export-sweeps")]
    pub export_sweeps: Option<PathBuf>,

    /// Write a markdown debug bundle with per-life diagnostics.
    #[arg(long)]
    pub debug_bundle: bool,
}

/// Options for generating a synthetic results file.
#[derive(Debug, Parser, Clone)]
pub struct SampleArgs {
    /// Output results file (JSON).
    pub output: PathBuf,

    /// Number of models to simulate.
    #[arg(long, default_value_t = 2)]
    pub models: usize,

    /// Number of cross-validation folds per model.
    #[arg(long, default_value_t = 3)]
    pub folds: usize,

    /// Number of run-to-failure lives per fold.
    #[arg(long, default_value_t = 5)]
    pub lives: usize,

    /// Minimum life length (samples).
    #[arg(long, default_value_t = 40)]
    pub life_min: usize,

    /// Maximum life length (samples).
    #[arg(long, default_value_t = 120)]
    pub life_max: usize,

    /// Prediction noise standard deviation (for the best model).
    #[arg(long, default_value_t = 2.0)]
    pub noise: f64,

    /// Probability of poisoning a life's predictions with a NaN.
    #[arg(long, default_value_t = 0.0)]
    pub nan_prob: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
