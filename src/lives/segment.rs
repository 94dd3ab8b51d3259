//! Split a concatenated RUL signal into per-life index ranges and fit each
//! retained life.
//!
//! Boundary detection: RUL decreases within a life, so a strictly positive
//! first difference means the signal jumped back up and a new life started.
//! The sample sitting exactly on a boundary is dropped from both adjacent
//! lives; empty ranges are skipped.

use std::ops::Range;

use crate::domain::FoldRecord;
use crate::error::AppError;
use crate::fit::FitterFactory;
use crate::lives::fitted::{FittedLife, LifeOptions};

/// Index ranges of the lives detected in a concatenated true-RUL sequence.
pub fn split_lives_indices(y_true: &[f64]) -> Vec<Range<usize>> {
    let mut breakpoints = vec![0usize];
    for (i, w) in y_true.windows(2).enumerate() {
        if w[1] - w[0] > 0.0 {
            breakpoints.push(i);
        }
    }
    breakpoints.push(y_true.len());

    let mut ranges = Vec::new();
    for pair in breakpoints.windows(2) {
        let r = (pair[0] + 1)..pair[1];
        if r.is_empty() {
            continue;
        }
        ranges.push(r);
    }
    ranges
}

/// A life excluded from fitting, with the reason it was dropped.
#[derive(Debug, Clone)]
pub struct SkippedLife {
    /// Ordinal of the life within the sequence (counting every detected
    /// life, retained or not).
    pub life: usize,
    pub range: Range<usize>,
    pub reason: String,
}

/// Outcome of splitting a fold: fitted lives plus an audit trail of the
/// lives that were dropped, so data loss is visible to the caller.
#[derive(Debug, Clone, Default)]
pub struct SplitLives {
    pub lives: Vec<FittedLife>,
    pub skipped: Vec<SkippedLife>,
}

impl SplitLives {
    /// Number of lives detected, retained or not.
    pub fn detected(&self) -> usize {
        self.lives.len() + self.skipped.len()
    }
}

/// Split a concatenated true/predicted pair into fitted lives.
///
/// Lives whose predicted slice contains a non-finite value are excluded and
/// recorded in `skipped` rather than raised as errors: a model that emits a
/// NaN for one life should not abort the evaluation of the others. The same
/// policy applies to lives whose fit fails.
///
/// When `time` is supplied it is sliced per life and used verbatim.
pub fn split_lives(
    y_true: &[f64],
    y_pred: &[f64],
    time: Option<&[f64]>,
    opts: &LifeOptions,
    factory: &dyn FitterFactory,
) -> Result<SplitLives, AppError> {
    if y_true.len() != y_pred.len() {
        return Err(AppError::new(
            2,
            format!(
                "True/predicted length mismatch ({} vs {}).",
                y_true.len(),
                y_pred.len()
            ),
        ));
    }
    if let Some(time) = time {
        if time.len() != y_true.len() {
            return Err(AppError::new(
                2,
                format!(
                    "Time axis length mismatch ({} vs {}).",
                    time.len(),
                    y_true.len()
                ),
            ));
        }
    }

    let mut out = SplitLives::default();
    for (life_idx, r) in split_lives_indices(y_true).into_iter().enumerate() {
        let pred_slice = &y_pred[r.clone()];
        if pred_slice.iter().any(|v| !v.is_finite()) {
            out.skipped.push(SkippedLife {
                life: life_idx,
                range: r,
                reason: "Non-finite predicted value.".to_string(),
            });
            continue;
        }

        let life_time = time.map(|t| t[r.clone()].to_vec());
        match FittedLife::new(
            y_true[r.clone()].to_vec(),
            pred_slice.to_vec(),
            life_time,
            opts,
            factory,
        ) {
            Ok(life) => out.lives.push(life),
            Err(e) => out.skipped.push(SkippedLife {
                life: life_idx,
                range: r,
                reason: e.to_string(),
            }),
        }
    }
    Ok(out)
}

/// Split one cross-validation fold record into fitted lives.
pub fn split_lives_from_fold(
    fold: &FoldRecord,
    opts: &LifeOptions,
    factory: &dyn FitterFactory,
) -> Result<SplitLives, AppError> {
    split_lives(&fold.y_true, &fold.y_pred, None, opts, factory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::SegmentedLeastSquares;

    #[test]
    fn boundaries_follow_positive_jumps() {
        // One jump (1 -> 5) between indices 2 and 3. The boundary sample and
        // the sequence head are dropped from the retained ranges.
        let y_true = [3.0, 2.0, 1.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let ranges = split_lives_indices(&y_true);
        assert_eq!(ranges, vec![1..2, 3..8]);
    }

    #[test]
    fn zero_length_ranges_are_dropped() {
        // Jumps at consecutive positions produce an empty range in between.
        let y_true = [2.0, 3.0, 4.0, 3.0];
        let ranges = split_lives_indices(&y_true);
        // diffs: +1 (idx 0), +1 (idx 1), -1; breakpoints [0, 0, 1, 4].
        assert_eq!(ranges, vec![2..4]);
    }

    #[test]
    fn single_life_keeps_all_but_first_sample() {
        let y_true = [4.0, 3.0, 2.0, 1.0, 0.0];
        let ranges = split_lives_indices(&y_true);
        assert_eq!(ranges, vec![1..5]);
    }

    #[test]
    fn nan_predictions_drop_the_life_with_a_reason() {
        let y_true = [3.0, 2.0, 1.0, 0.0, 3.0, 2.0, 1.0, 0.0];
        let mut y_pred = y_true.to_vec();
        y_pred[2] = f64::NAN;

        let split = split_lives(
            &y_true,
            &y_pred,
            None,
            &LifeOptions::default(),
            &SegmentedLeastSquares::default(),
        )
        .unwrap();

        assert_eq!(split.lives.len(), 1);
        assert_eq!(split.skipped.len(), 1);
        assert_eq!(split.skipped[0].life, 0);
        assert!(split.skipped[0].reason.contains("Non-finite"));
        assert_eq!(split.detected(), 2);
    }

    #[test]
    fn clean_folds_retain_every_detected_life() {
        let y_true = [3.0, 2.0, 1.0, 0.0, 4.0, 3.0, 2.0, 1.0, 0.0];
        let y_pred = y_true;

        let split = split_lives(
            &y_true,
            &y_pred,
            None,
            &LifeOptions::default(),
            &SegmentedLeastSquares::default(),
        )
        .unwrap();

        assert_eq!(split.lives.len(), 2);
        assert!(split.skipped.is_empty());
        // The first life loses its head sample and its boundary sample.
        assert_eq!(split.lives[0].len(), 2);
        assert_eq!(split.lives[1].len(), 5);
    }

    #[test]
    fn length_mismatch_is_an_input_error() {
        let err = split_lives(
            &[1.0, 0.0],
            &[1.0],
            None,
            &LifeOptions::default(),
            &SegmentedLeastSquares::default(),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
