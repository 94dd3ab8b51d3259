//! Binned error aggregation across cross-validation folds.
//!
//! Errors are stratified by true-RUL magnitude: a model that is accurate far
//! from failure but drifts near zero shows up immediately in the low bins.
//! Bin ranges are inclusive at both edges, so a sample sitting exactly on a
//! shared edge contributes to both neighboring bins; this overlap is
//! tolerated, not deduplicated.

use std::collections::BTreeMap;

use crate::domain::ResultsSet;
use crate::error::AppError;
use crate::math::linspace;

/// Raw errors of one non-empty (fold, bin) cell.
///
/// Cells with no samples have no entry here, which is how an all-zero row in
/// the statistics is distinguished from a genuinely zero-error bin.
#[derive(Debug, Clone)]
pub struct BinErrors {
    pub fold: usize,
    pub bin: usize,
    pub errors: Vec<f64>,
}

/// Per-fold, per-bin error statistics for one model's cross validation.
#[derive(Debug, Clone)]
pub struct CvResults {
    n_folds: usize,
    n_bins: usize,
    bin_edges: Vec<f64>,
    /// `[fold][bin]` mean signed error (`true - pred`).
    mean_error: Vec<Vec<f64>>,
    /// `[fold][bin]` mean absolute error.
    mae: Vec<Vec<f64>>,
    /// `[fold][bin]` mean squared error.
    mse: Vec<Vec<f64>>,
    errors: Vec<BinErrors>,
}

impl CvResults {
    /// Aggregate one model's folds.
    ///
    /// When `bin_edges` is `None`, `nbins` evenly spaced bins are derived
    /// covering `[0, max true value across all folds]`.
    pub fn new(
        y_true: &[Vec<f64>],
        y_pred: &[Vec<f64>],
        nbins: usize,
        bin_edges: Option<Vec<f64>>,
    ) -> Result<Self, AppError> {
        if y_true.len() != y_pred.len() {
            return Err(AppError::new(
                2,
                format!(
                    "Fold count mismatch between true ({}) and predicted ({}) lists.",
                    y_true.len(),
                    y_pred.len()
                ),
            ));
        }

        let bin_edges = match bin_edges {
            Some(edges) => validate_edges(edges)?,
            None => {
                let max_value = y_true
                    .iter()
                    .flat_map(|fold| fold.iter())
                    .copied()
                    .filter(|v| v.is_finite())
                    .fold(f64::NEG_INFINITY, f64::max);
                if !max_value.is_finite() {
                    return Err(AppError::new(3, "No finite true values to derive bin edges from."));
                }
                if nbins == 0 {
                    return Err(AppError::new(2, "Bin count must be > 0."));
                }
                linspace(0.0, max_value, nbins + 1)
            }
        };

        let n_folds = y_true.len();
        let n_bins = bin_edges.len() - 1;

        let mut results = Self {
            n_folds,
            n_bins,
            bin_edges,
            mean_error: vec![vec![0.0; n_bins]; n_folds],
            mae: vec![vec![0.0; n_bins]; n_folds],
            mse: vec![vec![0.0; n_bins]; n_folds],
            errors: Vec::new(),
        };

        for (fold, (t, p)) in y_true.iter().zip(y_pred.iter()).enumerate() {
            if t.len() != p.len() {
                return Err(AppError::new(
                    2,
                    format!(
                        "Fold {fold}: true/predicted length mismatch ({} vs {}).",
                        t.len(),
                        p.len()
                    ),
                ));
            }
            results.add_fold(fold, t, p);
        }

        Ok(results)
    }

    fn add_fold(&mut self, fold: usize, y_true: &[f64], y_pred: &[f64]) {
        for bin in 0..self.n_bins {
            let lo = self.bin_edges[bin];
            let hi = self.bin_edges[bin + 1];

            let errors: Vec<f64> = y_true
                .iter()
                .zip(y_pred)
                .filter(|(t, _)| **t >= lo && **t <= hi)
                .map(|(t, p)| t - p)
                .collect();

            if errors.is_empty() {
                continue;
            }

            self.mean_error[fold][bin] = crate::math::mean(&errors);
            self.mae[fold][bin] =
                crate::math::mean(&errors.iter().map(|e| e.abs()).collect::<Vec<_>>());
            self.mse[fold][bin] =
                crate::math::mean(&errors.iter().map(|e| e * e).collect::<Vec<_>>());
            self.errors.push(BinErrors { fold, bin, errors });
        }
    }

    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn bin_edges(&self) -> &[f64] {
        &self.bin_edges
    }

    pub fn mean_error(&self) -> &[Vec<f64>] {
        &self.mean_error
    }

    pub fn mae(&self) -> &[Vec<f64>] {
        &self.mae
    }

    pub fn mse(&self) -> &[Vec<f64>] {
        &self.mse
    }

    /// Raw error arrays of every non-empty (fold, bin) cell.
    pub fn errors(&self) -> &[BinErrors] {
        &self.errors
    }

    /// MAE of bin `j` averaged over folds that have samples in it.
    pub fn mae_across_folds(&self, bin: usize) -> f64 {
        let populated: Vec<f64> = (0..self.n_folds)
            .filter(|&fold| self.errors.iter().any(|e| e.fold == fold && e.bin == bin))
            .map(|fold| self.mae[fold][bin])
            .collect();
        crate::math::mean(&populated)
    }
}

fn validate_edges(edges: Vec<f64>) -> Result<Vec<f64>, AppError> {
    if edges.len() < 2 {
        return Err(AppError::new(2, "Bin edges need at least two values."));
    }
    if edges.windows(2).any(|w| w[1] <= w[0]) {
        return Err(AppError::new(2, "Bin edges must be strictly increasing."));
    }
    Ok(edges)
}

/// Derive one shared set of bin edges from the global maximum true value
/// across every model, so cross-model comparison at fixed bins is valid.
///
/// This is phase one of the two-phase protocol; `models_cv_results` runs
/// both phases.
pub fn shared_bin_edges(results: &ResultsSet, nbins: usize) -> Result<Vec<f64>, AppError> {
    if nbins == 0 {
        return Err(AppError::new(2, "Bin count must be > 0."));
    }
    let max_value = results
        .max_true_value()
        .ok_or_else(|| AppError::new(3, "No finite true values to derive shared bin edges from."))?;
    Ok(linspace(0.0, max_value, nbins + 1))
}

/// Bin every model of a results set against one shared edge set.
///
/// Returns the shared edges alongside the per-model aggregates.
pub fn models_cv_results(
    results: &ResultsSet,
    nbins: usize,
) -> Result<(Vec<f64>, BTreeMap<String, CvResults>), AppError> {
    let bin_edges = shared_bin_edges(results, nbins)?;

    let mut model_results = BTreeMap::new();
    for (model, folds) in &results.models {
        let trues: Vec<Vec<f64>> = folds.iter().map(|f| f.y_true.clone()).collect();
        let preds: Vec<Vec<f64>> = folds.iter().map(|f| f.y_pred.clone()).collect();
        let cv = CvResults::new(&trues, &preds, nbins, Some(bin_edges.clone()))?;
        model_results.insert(model.clone(), cv);
    }

    Ok((bin_edges, model_results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FoldRecord;

    #[test]
    fn derived_edges_cover_zero_to_max() {
        let y_true = vec![vec![10.0, 5.0, 0.0]];
        let y_pred = vec![vec![9.0, 5.0, 1.0]];
        let cv = CvResults::new(&y_true, &y_pred, 5, None).unwrap();
        assert_eq!(cv.bin_edges(), &[0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(cv.n_bins(), 5);
    }

    #[test]
    fn every_in_range_sample_lands_in_some_bin() {
        let y_true = vec![vec![0.0, 1.5, 3.0, 4.5, 6.0, 7.5, 9.0, 10.0]];
        let y_pred = vec![vec![0.0; 8]];
        let cv = CvResults::new(&y_true, &y_pred, 4, None).unwrap();

        let counted: usize = cv.errors().iter().map(|e| e.errors.len()).sum();
        // Edge-sharing samples may be double counted, never lost.
        assert!(counted >= y_true[0].len());
    }

    #[test]
    fn empty_bins_stay_zero_and_have_no_raw_entry() {
        // All samples fall in the top bin.
        let y_true = vec![vec![9.0, 10.0]];
        let y_pred = vec![vec![8.0, 8.0]];
        let cv = CvResults::new(&y_true, &y_pred, 5, None).unwrap();

        assert_eq!(cv.mae()[0][0], 0.0);
        assert!(!cv.errors().iter().any(|e| e.bin == 0));
        assert!(cv.errors().iter().any(|e| e.bin == 4));
    }

    #[test]
    fn signed_error_is_true_minus_pred() {
        let y_true = vec![vec![10.0, 10.0]];
        let y_pred = vec![vec![8.0, 14.0]];
        let cv = CvResults::new(&y_true, &y_pred, 1, None).unwrap();
        // errors: [2, -4]
        assert!((cv.mean_error()[0][0] - (-1.0)).abs() < 1e-12);
        assert!((cv.mae()[0][0] - 3.0).abs() < 1e-12);
        assert!((cv.mse()[0][0] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn shared_edges_span_the_global_max_across_models() {
        let mut results = ResultsSet::default();
        results.models.insert(
            "a".to_string(),
            vec![FoldRecord {
                y_true: vec![5.0, 0.0],
                y_pred: vec![5.0, 0.0],
            }],
        );
        results.models.insert(
            "b".to_string(),
            vec![FoldRecord {
                y_true: vec![20.0, 0.0],
                y_pred: vec![18.0, 0.0],
            }],
        );

        let (edges, per_model) = models_cv_results(&results, 4).unwrap();
        assert_eq!(edges, vec![0.0, 5.0, 10.0, 15.0, 20.0]);
        assert_eq!(per_model.len(), 2);
        assert_eq!(per_model["a"].bin_edges(), edges.as_slice());
        assert_eq!(per_model["b"].bin_edges(), edges.as_slice());
    }

    #[test]
    fn explicit_edges_must_be_increasing() {
        let err = CvResults::new(
            &[vec![1.0]],
            &[vec![1.0]],
            0,
            Some(vec![0.0, 5.0, 5.0]),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
