//! A single fitted life: raw sequences, reconstructed time, smoothed curves,
//! and the maintenance point-metrics computed from them.

use crate::domain::Weighting;
use crate::error::AppError;
use crate::fit::{FitterFactory, PiecewiseLinear};
use crate::math::{cumsum, first_diff, mean, median};

/// Floor applied to true values when computing relative sample weights.
///
/// Keeps samples at (or numerically near) zero RUL from receiving an
/// unbounded weight.
pub const RELATIVE_WEIGHT_FLOOR: f64 = 0.9;

/// Per-life fitting options shared by every life of an evaluation run.
#[derive(Debug, Clone, Default)]
pub struct LifeOptions {
    /// RUL value below which the life is considered to be in known
    /// degradation. Above it the true labels are treated as censored.
    pub rul_threshold: Option<f64>,
    /// Constrain the fitted curves to be non-increasing.
    pub fit_line_not_increasing: bool,
}

/// One run-to-failure life with fitted true/predicted curves.
///
/// Immutable after construction: the time axis and both fitted curves are
/// computed in `new` and never rewritten.
#[derive(Debug, Clone)]
pub struct FittedLife {
    y_true: Vec<f64>,
    y_pred: Vec<f64>,
    time: Vec<f64>,
    degrading_start: usize,
    rul_threshold: Option<f64>,
    y_true_fitted: PiecewiseLinear,
    y_pred_fitted: PiecewiseLinear,
}

impl FittedLife {
    /// Construct a life from its true/predicted sequences.
    ///
    /// When `time` is omitted it is reconstructed from the true labels (see
    /// `compute_time`); when supplied it is used verbatim and only the
    /// degrading-start bookkeeping is derived from the threshold.
    pub fn new(
        y_true: Vec<f64>,
        y_pred: Vec<f64>,
        time: Option<Vec<f64>>,
        opts: &LifeOptions,
        factory: &dyn FitterFactory,
    ) -> Result<Self, AppError> {
        if y_true.is_empty() {
            return Err(AppError::new(3, "Cannot fit an empty life."));
        }
        if y_true.len() != y_pred.len() {
            return Err(AppError::new(
                2,
                format!(
                    "Life true/predicted length mismatch ({} vs {}).",
                    y_true.len(),
                    y_pred.len()
                ),
            ));
        }

        let (degrading_start, time) = match time {
            Some(time) => {
                if time.len() != y_true.len() {
                    return Err(AppError::new(
                        2,
                        format!(
                            "Supplied time axis length mismatch ({} vs {}).",
                            time.len(),
                            y_true.len()
                        ),
                    ));
                }
                (degrading_start(&y_true, opts.rul_threshold), time)
            }
            None => compute_time(&y_true, opts.rul_threshold),
        };

        let y_true_fitted = fit_sequence(&time, &y_true, opts.fit_line_not_increasing, factory)?;
        let y_pred_fitted = fit_sequence(&time, &y_pred, opts.fit_line_not_increasing, factory)?;

        Ok(Self {
            y_true,
            y_pred,
            time,
            degrading_start,
            rul_threshold: opts.rul_threshold,
            y_true_fitted,
            y_pred_fitted,
        })
    }

    pub fn len(&self) -> usize {
        self.y_true.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y_true.is_empty()
    }

    pub fn y_true(&self) -> &[f64] {
        &self.y_true
    }

    pub fn y_pred(&self) -> &[f64] {
        &self.y_pred
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Index where the true labels first drop below the threshold (`0` when
    /// no threshold was supplied or it is never crossed).
    pub fn degrading_start(&self) -> usize {
        self.degrading_start
    }

    pub fn rul_threshold(&self) -> Option<f64> {
        self.rul_threshold
    }

    pub fn y_true_fitted(&self) -> &PiecewiseLinear {
        &self.y_true_fitted
    }

    pub fn y_pred_fitted(&self) -> &PiecewiseLinear {
        &self.y_pred_fitted
    }

    /// Root mean squared prediction error under the chosen weighting.
    pub fn rmse(&self, weighting: Weighting) -> f64 {
        let sw = sample_weights(weighting, &self.y_true, &self.y_pred);
        let terms: Vec<f64> = self
            .y_true
            .iter()
            .zip(&self.y_pred)
            .zip(&sw)
            .map(|((t, p), w)| w * (t - p) * (t - p))
            .collect();
        mean(&terms).sqrt()
    }

    /// Mean absolute prediction error under the chosen weighting.
    pub fn mae(&self, weighting: Weighting) -> f64 {
        let sw = sample_weights(weighting, &self.y_true, &self.y_pred);
        let terms: Vec<f64> = self
            .y_true
            .iter()
            .zip(&self.y_pred)
            .zip(&sw)
            .map(|((t, p), w)| w * (t - p).abs())
            .collect();
        mean(&terms)
    }

    /// Time of actual failure: the time at the first sample whose true value
    /// is exactly `0`, else extrapolated as `time[last] + y_true[last]`.
    pub fn end_of_life(&self) -> f64 {
        zero_crossing_time(&self.time, &self.y_true)
    }

    /// Time of predicted failure, same convention as `end_of_life`.
    pub fn predicted_end_of_life(&self) -> f64 {
        zero_crossing_time(&self.time, &self.y_pred)
    }

    /// Time at which maintenance would be scheduled given fault horizon `m`.
    pub fn maintenance_point(&self, m: f64) -> f64 {
        self.predicted_end_of_life() - m
    }

    /// Useful life wasted by maintaining before actual failure.
    ///
    /// Zero when maintenance is scheduled at or after the failure (that case
    /// is an unexpected break instead; the two are mutually exclusive).
    pub fn unexploited_lifetime(&self, m: f64) -> f64 {
        let eol = self.end_of_life();
        let mp = self.maintenance_point(m);
        if mp < eol { eol - mp } else { 0.0 }
    }

    /// True when the asset fails before its scheduled maintenance.
    pub fn unexpected_break(&self, m: f64) -> bool {
        self.maintenance_point(m) >= self.end_of_life()
    }
}

/// Per-sample weights for error metrics.
///
/// `Relative` weighs each sample by `|true - pred| / max(true, floor)`;
/// `Uniform` weighs every sample `1`.
pub fn sample_weights(weighting: Weighting, y_true: &[f64], y_pred: &[f64]) -> Vec<f64> {
    match weighting {
        Weighting::Uniform => vec![1.0; y_true.len()],
        Weighting::Relative => y_true
            .iter()
            .zip(y_pred)
            .map(|(t, p)| (t - p).abs() / t.max(RELATIVE_WEIGHT_FLOOR))
            .collect(),
    }
}

/// Index of the first true value strictly below the threshold.
///
/// `0` when no threshold is supplied or no sample crosses it; the whole
/// life is then treated as known degradation.
pub fn degrading_start(y_true: &[f64], rul_threshold: Option<f64>) -> usize {
    match rul_threshold {
        Some(threshold) => y_true
            .iter()
            .position(|&v| v < threshold)
            .unwrap_or(0),
        None => 0,
    }
}

/// Reconstruct the passage of time from the true RUL labels.
///
/// The time axis is the cumulative sum of per-sample steps. Steps inside the
/// known-degradation zone come from the first difference of the reversed
/// true labels; a censored prefix (before `degrading_start`) is filled with
/// the median of those steps, or `1` when fewer than two samples remain past
/// the threshold.
pub fn compute_time(y_true: &[f64], rul_threshold: Option<f64>) -> (usize, Vec<f64>) {
    let start = degrading_start(y_true, rul_threshold);

    let mut reversed_tail: Vec<f64> = y_true[start..].to_vec();
    reversed_tail.reverse();
    let time_diff = first_diff(&reversed_tail);

    let mut steps = vec![0.0; y_true.len()];
    if start > 0 {
        let fill = median(&time_diff).unwrap_or(1.0);
        for slot in steps.iter_mut().take(start + 1) {
            *slot = fill;
        }
    }
    steps[start + 1..].copy_from_slice(&time_diff);

    (start, cumsum(&steps))
}

fn fit_sequence(
    time: &[f64],
    values: &[f64],
    not_increasing: bool,
    factory: &dyn FitterFactory,
) -> Result<PiecewiseLinear, AppError> {
    let mut fitter = factory.fitter(not_increasing);
    for (&t, &v) in time.iter().zip(values) {
        fitter.add_point(t, v);
    }
    fitter.finish()
}

/// Time of the first exact-zero sample, else `time[last] + value[last]`.
///
/// The extrapolation assumes the sequence keeps descending one RUL unit per
/// time unit past the observed range; an approximation, but it never fails.
fn zero_crossing_time(time: &[f64], values: &[f64]) -> f64 {
    match values.iter().position(|&v| v == 0.0) {
        Some(idx) => time[idx],
        None => time[time.len() - 1] + values[values.len() - 1],
    }
}
