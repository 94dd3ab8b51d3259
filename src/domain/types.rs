//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during evaluation
//! - exported to JSON/CSV
//! - reloaded later for comparisons across runs

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// How per-sample errors are weighted in `rmse` / `mae` style metrics.
///
/// `Relative` emphasizes mistakes made close to failure: each sample is
/// weighted by `|true - pred| / max(true, floor)`, so an error of 5 cycles
/// when 10 cycles remain counts far more than the same error when 200
/// cycles remain. The floor keeps near-zero true values from blowing up
/// the weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// Every sample counts the same.
    #[default]
    Uniform,
    /// Weight each sample by its relative error magnitude.
    Relative,
}

/// Results-file format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Infer from the file extension (`.json` / `.csv`).
    Auto,
    Json,
    Csv,
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InputFormat::Auto => "auto",
            InputFormat::Json => "json",
            InputFormat::Csv => "csv",
        };
        write!(f, "{name}")
    }
}

/// One hold-out fold of a cross validation: the true RUL sequence and the
/// model's predictions over the same concatenated set of lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldRecord {
    #[serde(rename = "true")]
    pub y_true: Vec<f64>,
    #[serde(rename = "predicted")]
    pub y_pred: Vec<f64>,
}

impl FoldRecord {
    pub fn len(&self) -> usize {
        self.y_true.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y_true.is_empty()
    }
}

/// Results of one or more models across cross-validation folds.
///
/// Keyed by model name; `BTreeMap` keeps iteration (and therefore reports
/// and shared bin-edge derivation) deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultsSet {
    pub models: BTreeMap<String, Vec<FoldRecord>>,
}

impl ResultsSet {
    /// Model names in report order.
    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    /// Total number of samples across every model and fold.
    pub fn total_samples(&self) -> usize {
        self.models
            .values()
            .flat_map(|folds| folds.iter())
            .map(FoldRecord::len)
            .sum()
    }

    /// Largest finite true value across every model and fold.
    pub fn max_true_value(&self) -> Option<f64> {
        let mut max = f64::NEG_INFINITY;
        for folds in self.models.values() {
            for fold in folds {
                for &v in &fold.y_true {
                    if v.is_finite() && v > max {
                        max = v;
                    }
                }
            }
        }
        max.is_finite().then_some(max)
    }

    /// Apply `transformation` to every stored true/predicted sequence,
    /// rewriting the results **in place**.
    ///
    /// This is an intentional bulk mutation, not a pure function: callers
    /// hold the only copy and downstream aggregation sees the rewritten
    /// sequences.
    pub fn transform(&mut self, transformation: impl Fn(&[f64]) -> Vec<f64>) {
        for folds in self.models.values_mut() {
            for fold in folds.iter_mut() {
                fold.y_true = transformation(&fold.y_true);
                fold.y_pred = transformation(&fold.y_pred);
            }
        }
    }

    /// Validate the basic shape contract: equal-length sequences per fold.
    pub fn validate(&self) -> Result<(), AppError> {
        for (model, folds) in &self.models {
            for (i, fold) in folds.iter().enumerate() {
                if fold.y_true.len() != fold.y_pred.len() {
                    return Err(AppError::new(
                        2,
                        format!(
                            "Model '{model}' fold {i}: true/predicted length mismatch ({} vs {}).",
                            fold.y_true.len(),
                            fold.y_pred.len()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A full evaluation run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub input: PathBuf,
    pub format: InputFormat,

    /// Number of true-RUL magnitude bins for the binned error table.
    pub nbins: usize,

    /// Fault-horizon sweep upper bound.
    pub window_size: f64,
    /// Number of evenly spaced horizon points in `[0, window_size]`.
    pub horizon_steps: usize,
    /// Unexpected-break weight in the combined cost metric.
    pub q1: f64,
    /// Unexploited-lifetime weight in the combined cost metric.
    pub q2: f64,
    /// Additive guard for the per-horizon max normalization.
    pub epsilon: f64,

    /// RUL threshold marking the start of known degradation (censoring point).
    pub rul_threshold: Option<f64>,
    /// Constrain fitted curves to be non-increasing.
    pub fit_line_not_increasing: bool,

    /// Restrict regression summaries to samples with `true <= threshold`.
    pub error_threshold: Option<f64>,
    /// Designated fold for the hold-out regression table.
    pub hold_out_fold: usize,

    pub export_bins: Option<PathBuf>,
    pub export_sweeps: Option<PathBuf>,
    pub debug_bundle: bool,
}

/// Synthetic sample generation configuration.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub output: PathBuf,
    pub models: usize,
    pub folds: usize,
    pub lives_per_fold: usize,
    pub life_len_min: usize,
    pub life_len_max: usize,
    pub noise_sigma: f64,
    /// Probability that a life's predictions are poisoned with a NaN,
    /// exercising the skip policy downstream.
    pub nan_prob: f64,
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_rewrites_both_sequences_in_place() {
        let mut results = ResultsSet::default();
        results.models.insert(
            "m".to_string(),
            vec![FoldRecord {
                y_true: vec![1.0, 2.0],
                y_pred: vec![3.0, 4.0],
            }],
        );

        results.transform(|xs| xs.iter().map(|x| x * 10.0).collect());

        let fold = &results.models["m"][0];
        assert_eq!(fold.y_true, vec![10.0, 20.0]);
        assert_eq!(fold.y_pred, vec![30.0, 40.0]);
    }

    #[test]
    fn max_true_value_skips_non_finite() {
        let mut results = ResultsSet::default();
        results.models.insert(
            "m".to_string(),
            vec![FoldRecord {
                y_true: vec![5.0, f64::NAN, 12.0],
                y_pred: vec![0.0, 0.0, 0.0],
            }],
        );
        assert_eq!(results.max_true_value(), Some(12.0));
        assert!(ResultsSet::default().max_true_value().is_none());
    }

    #[test]
    fn validate_reports_length_mismatch() {
        let mut results = ResultsSet::default();
        results.models.insert(
            "broken".to_string(),
            vec![FoldRecord {
                y_true: vec![1.0, 2.0],
                y_pred: vec![1.0],
            }],
        );
        let err = results.validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
