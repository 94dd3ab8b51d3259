//! Plain regression summaries per model: MAE/MSE and their relative-weighted
//! variants, per fold and aggregated as `mean ± std` across folds.
//!
//! Weighted variants use normalized weights (`Σ w·e / Σ w`), emphasizing
//! errors made close to failure. Summaries can be restricted to samples
//! below a true-RUL threshold to focus on the end of life.

use std::collections::BTreeMap;

use crate::domain::{FoldRecord, ResultsSet, Weighting};
use crate::error::AppError;
use crate::lives::sample_weights;
use crate::math::{mean, std_dev};

/// The four error figures computed per fold.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegressionMetrics {
    pub mae_weighted: f64,
    pub mae: f64,
    pub mse_weighted: f64,
    pub mse: f64,
}

/// Cross-fold regression summary for one model.
#[derive(Debug, Clone)]
pub struct RegressionSummary {
    pub folds: Vec<RegressionMetrics>,
    pub mean: RegressionMetrics,
    pub std: RegressionMetrics,
}

/// Compute regression metrics for every model of a results set.
///
/// `threshold` restricts the computation to samples with
/// `y_true <= threshold`; pass `None` to use every sample.
pub fn cv_regression_metrics(
    results: &ResultsSet,
    threshold: Option<f64>,
) -> Result<BTreeMap<String, RegressionSummary>, AppError> {
    let mut out = BTreeMap::new();
    for (model, folds) in &results.models {
        let mut per_fold = Vec::with_capacity(folds.len());
        for (i, fold) in folds.iter().enumerate() {
            per_fold.push(fold_metrics(fold, threshold).map_err(|e| {
                AppError::new(e.exit_code(), format!("Model '{model}' fold {i}: {e}"))
            })?);
        }
        if per_fold.is_empty() {
            return Err(AppError::new(3, format!("Model '{model}' has no folds.")));
        }
        out.insert(model.clone(), summarize(per_fold));
    }
    Ok(out)
}

/// Regression metrics of one designated fold per model.
pub fn hold_out_regression_metrics(
    results: &ResultsSet,
    fold: usize,
) -> Result<BTreeMap<String, RegressionMetrics>, AppError> {
    let mut out = BTreeMap::new();
    for (model, folds) in &results.models {
        let record = folds.get(fold).ok_or_else(|| {
            AppError::new(
                2,
                format!("Model '{model}' has {} folds; fold {fold} does not exist.", folds.len()),
            )
        })?;
        out.insert(model.clone(), fold_metrics(record, None)?);
    }
    Ok(out)
}

fn fold_metrics(fold: &FoldRecord, threshold: Option<f64>) -> Result<RegressionMetrics, AppError> {
    if fold.y_true.len() != fold.y_pred.len() {
        return Err(AppError::new(
            2,
            format!(
                "True/predicted length mismatch ({} vs {}).",
                fold.y_true.len(),
                fold.y_pred.len()
            ),
        ));
    }

    let (y_true, y_pred): (Vec<f64>, Vec<f64>) = fold
        .y_true
        .iter()
        .zip(&fold.y_pred)
        .filter(|(t, _)| threshold.is_none_or(|limit| **t <= limit))
        .map(|(t, p)| (*t, *p))
        .unzip();

    if y_true.is_empty() {
        return Err(AppError::new(3, "No samples at or below the error threshold."));
    }

    let weights = sample_weights(Weighting::Relative, &y_true, &y_pred);
    let abs_errors: Vec<f64> = y_true.iter().zip(&y_pred).map(|(t, p)| (t - p).abs()).collect();
    let sq_errors: Vec<f64> = abs_errors.iter().map(|e| e * e).collect();

    Ok(RegressionMetrics {
        mae_weighted: weighted_mean(&abs_errors, &weights),
        mae: mean(&abs_errors),
        mse_weighted: weighted_mean(&sq_errors, &weights),
        mse: mean(&sq_errors),
    })
}

/// `Σ w·x / Σ w`, falling back to the plain mean when the weights sum to
/// zero (perfect predictions make every relative weight zero).
fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return mean(values);
    }
    values
        .iter()
        .zip(weights)
        .map(|(v, w)| v * w)
        .sum::<f64>()
        / total
}

fn summarize(folds: Vec<RegressionMetrics>) -> RegressionSummary {
    let pick = |f: fn(&RegressionMetrics) -> f64| -> Vec<f64> { folds.iter().map(f).collect() };

    let mae_w = pick(|m| m.mae_weighted);
    let mae = pick(|m| m.mae);
    let mse_w = pick(|m| m.mse_weighted);
    let mse = pick(|m| m.mse);

    RegressionSummary {
        mean: RegressionMetrics {
            mae_weighted: mean(&mae_w),
            mae: mean(&mae),
            mse_weighted: mean(&mse_w),
            mse: mean(&mse),
        },
        std: RegressionMetrics {
            mae_weighted: std_dev(&mae_w),
            mae: std_dev(&mae),
            mse_weighted: std_dev(&mse_w),
            mse: std_dev(&mse),
        },
        folds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results_with(folds: Vec<FoldRecord>) -> ResultsSet {
        let mut results = ResultsSet::default();
        results.models.insert("m".to_string(), folds);
        results
    }

    #[test]
    fn perfect_predictions_score_zero_everywhere() {
        let results = results_with(vec![FoldRecord {
            y_true: vec![3.0, 2.0, 1.0],
            y_pred: vec![3.0, 2.0, 1.0],
        }]);
        let summary = &cv_regression_metrics(&results, None).unwrap()["m"];
        assert_eq!(summary.mean.mae, 0.0);
        assert_eq!(summary.mean.mae_weighted, 0.0);
        assert_eq!(summary.mean.mse, 0.0);
        assert_eq!(summary.mean.mse_weighted, 0.0);
    }

    #[test]
    fn weighted_mae_emphasizes_errors_near_failure() {
        // Same absolute error at RUL 100 and RUL 1; the weighted figure
        // should sit far closer to the near-failure error's contribution.
        let results = results_with(vec![FoldRecord {
            y_true: vec![100.0, 1.0],
            y_pred: vec![95.0, 6.0],
        }]);
        let summary = &cv_regression_metrics(&results, None).unwrap()["m"];
        assert!((summary.mean.mae - 5.0).abs() < 1e-12);
        // weights: 5/100 = 0.05 and 5/1 = 5 -> weighted mae still 5, but the
        // weighted mse is dominated by the near-failure sample.
        assert!(summary.mean.mae_weighted > 4.9);
    }

    #[test]
    fn threshold_restricts_the_sample_set() {
        let results = results_with(vec![FoldRecord {
            y_true: vec![100.0, 2.0],
            y_pred: vec![0.0, 2.0],
        }]);
        // Only the (2.0, 2.0) sample is kept: all-zero errors.
        let summary = &cv_regression_metrics(&results, Some(10.0)).unwrap()["m"];
        assert_eq!(summary.mean.mae, 0.0);

        // Without the threshold the 100-unit miss dominates.
        let unrestricted = &cv_regression_metrics(&results, None).unwrap()["m"];
        assert!(unrestricted.mean.mae > 10.0);
    }

    #[test]
    fn cross_fold_mean_and_std() {
        let results = results_with(vec![
            FoldRecord {
                y_true: vec![1.0],
                y_pred: vec![0.0],
            },
            FoldRecord {
                y_true: vec![1.0],
                y_pred: vec![-2.0],
            },
        ]);
        let summary = &cv_regression_metrics(&results, None).unwrap()["m"];
        assert_eq!(summary.folds.len(), 2);
        // fold MAEs: 1 and 3.
        assert!((summary.mean.mae - 2.0).abs() < 1e-12);
        assert!((summary.std.mae - 1.0).abs() < 1e-12);
    }

    #[test]
    fn hold_out_requires_an_existing_fold() {
        let results = results_with(vec![FoldRecord {
            y_true: vec![1.0],
            y_pred: vec![1.0],
        }]);
        assert!(hold_out_regression_metrics(&results, 0).is_ok());
        let err = hold_out_regression_metrics(&results, 3).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
