//! Fault-horizon sweeps of maintenance-relevant metrics.
//!
//! Each sweep evaluates a per-life metric at `n` evenly spaced horizons in
//! `[0, window_size]`, takes the mean per fold, then averages across folds.
//! Per-fold standard deviations are retained for diagnostics (the debug
//! bundle prints them) even though the headline value per horizon is the
//! cross-fold mean.
//!
//! The combined cost metric normalizes break and unexploited-lifetime values
//! per fold per horizon by their maximum before weighting, so the two
//! components are comparable regardless of scale. The additive epsilon keeps
//! the division defined when every value in a step is zero; the resulting
//! near-zero (rather than exactly zero) normalized values are a known
//! approximation.

use crate::domain::FoldRecord;
use crate::error::AppError;
use crate::fit::FitterFactory;
use crate::lives::{split_lives_from_fold, FittedLife, LifeOptions};
use crate::math::{finite_max, linspace, mean, std_dev};

/// Mean/std of one fold's per-life values at one horizon.
#[derive(Debug, Clone, Copy)]
pub struct FoldStat {
    pub mean: f64,
    pub std: f64,
}

/// One metric swept over the fault horizon.
#[derive(Debug, Clone)]
pub struct HorizonSweep {
    /// The horizon values, evenly spaced over `[0, window_size]`.
    pub windows: Vec<f64>,
    /// Cross-fold mean per horizon.
    pub values: Vec<f64>,
    /// `[horizon][fold]` per-fold statistics, for diagnostics.
    pub fold_stats: Vec<Vec<FoldStat>>,
}

/// Weights and numerical guard for the combined cost metric.
#[derive(Debug, Clone, Copy)]
pub struct CostParams {
    /// Weight of the (normalized) unexpected-break component.
    pub q1: f64,
    /// Weight of the (normalized) unexploited-lifetime component.
    pub q2: f64,
    /// Additive guard for the per-horizon max normalization.
    pub epsilon: f64,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            q1: 1.0,
            q2: 1.0,
            epsilon: 1e-10,
        }
    }
}

fn sweep_windows(window_size: f64, n: usize) -> Result<Vec<f64>, AppError> {
    if !(window_size.is_finite() && window_size >= 0.0) {
        return Err(AppError::new(2, "Horizon window size must be finite and >= 0."));
    }
    if n == 0 {
        return Err(AppError::new(2, "Horizon steps must be > 0."));
    }
    Ok(linspace(0.0, window_size, n))
}

fn sweep_metric(
    lives: &[Vec<FittedLife>],
    window_size: f64,
    n: usize,
    metric: impl Fn(&FittedLife, f64) -> f64,
) -> Result<HorizonSweep, AppError> {
    let windows = sweep_windows(window_size, n)?;

    let mut values = Vec::with_capacity(windows.len());
    let mut fold_stats = Vec::with_capacity(windows.len());

    for &m in &windows {
        let mut fold_means = Vec::new();
        let mut stats = Vec::new();
        for fold in lives {
            // A fold with no retained lives contributes nothing to the
            // cross-fold average.
            if fold.is_empty() {
                continue;
            }
            let per_life: Vec<f64> = fold.iter().map(|life| metric(life, m)).collect();
            let stat = FoldStat {
                mean: mean(&per_life),
                std: std_dev(&per_life),
            };
            fold_means.push(stat.mean);
            stats.push(stat);
        }
        values.push(mean(&fold_means));
        fold_stats.push(stats);
    }

    Ok(HorizonSweep {
        windows,
        values,
        fold_stats,
    })
}

/// Sweep the mean unexploited lifetime over the fault horizon.
pub fn unexploited_lifetime_from_cv(
    lives: &[Vec<FittedLife>],
    window_size: f64,
    n: usize,
) -> Result<HorizonSweep, AppError> {
    sweep_metric(lives, window_size, n, |life, m| life.unexploited_lifetime(m))
}

/// Sweep the unexpected-break rate over the fault horizon.
pub fn unexpected_breaks_from_cv(
    lives: &[Vec<FittedLife>],
    window_size: f64,
    n: usize,
) -> Result<HorizonSweep, AppError> {
    sweep_metric(lives, window_size, n, |life, m| {
        if life.unexpected_break(m) { 1.0 } else { 0.0 }
    })
}

/// Sweep the combined cost metric over the fault horizon.
///
/// At each horizon, per fold: break indicators and unexploited lifetimes are
/// each normalized by their fold maximum (plus epsilon) and weighted by
/// `q1` / `q2`; the per-life sums are averaged within the fold, then across
/// folds.
pub fn metric_j_from_cv(
    lives: &[Vec<FittedLife>],
    window_size: f64,
    n: usize,
    params: &CostParams,
) -> Result<HorizonSweep, AppError> {
    if !(params.epsilon.is_finite() && params.epsilon > 0.0) {
        return Err(AppError::new(2, "Cost-metric epsilon must be finite and > 0."));
    }
    let windows = sweep_windows(window_size, n)?;

    let mut values = Vec::with_capacity(windows.len());
    let mut fold_stats = Vec::with_capacity(windows.len());

    for &m in &windows {
        let mut fold_means = Vec::new();
        let mut stats = Vec::new();
        for fold in lives {
            if fold.is_empty() {
                continue;
            }
            let breaks: Vec<f64> = fold
                .iter()
                .map(|life| if life.unexpected_break(m) { 1.0 } else { 0.0 })
                .collect();
            let unexploited: Vec<f64> =
                fold.iter().map(|life| life.unexploited_lifetime(m)).collect();

            let break_scale = finite_max(&breaks) + params.epsilon;
            let unexploited_scale = finite_max(&unexploited) + params.epsilon;

            let combined: Vec<f64> = breaks
                .iter()
                .zip(&unexploited)
                .map(|(b, u)| (b / break_scale) * params.q1 + (u / unexploited_scale) * params.q2)
                .collect();

            let stat = FoldStat {
                mean: mean(&combined),
                std: std_dev(&combined),
            };
            fold_means.push(stat.mean);
            stats.push(stat);
        }
        values.push(mean(&fold_means));
        fold_stats.push(stats);
    }

    Ok(HorizonSweep {
        windows,
        values,
        fold_stats,
    })
}

/// Split each fold's results into lives, then sweep unexploited lifetime.
pub fn unexploited_lifetime(
    folds: &[FoldRecord],
    window_size: f64,
    n: usize,
    opts: &LifeOptions,
    factory: &dyn FitterFactory,
) -> Result<HorizonSweep, AppError> {
    let lives = split_fold_lives(folds, opts, factory)?;
    unexploited_lifetime_from_cv(&lives, window_size, n)
}

/// Split each fold's results into lives, then sweep the break rate.
pub fn unexpected_breaks(
    folds: &[FoldRecord],
    window_size: f64,
    n: usize,
    opts: &LifeOptions,
    factory: &dyn FitterFactory,
) -> Result<HorizonSweep, AppError> {
    let lives = split_fold_lives(folds, opts, factory)?;
    unexpected_breaks_from_cv(&lives, window_size, n)
}

/// Split each fold's results into lives, then sweep the combined cost.
pub fn metric_j(
    folds: &[FoldRecord],
    window_size: f64,
    n: usize,
    params: &CostParams,
    opts: &LifeOptions,
    factory: &dyn FitterFactory,
) -> Result<HorizonSweep, AppError> {
    let lives = split_fold_lives(folds, opts, factory)?;
    metric_j_from_cv(&lives, window_size, n, params)
}

fn split_fold_lives(
    folds: &[FoldRecord],
    opts: &LifeOptions,
    factory: &dyn FitterFactory,
) -> Result<Vec<Vec<FittedLife>>, AppError> {
    folds
        .iter()
        .map(|fold| split_lives_from_fold(fold, opts, factory).map(|s| s.lives))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::SegmentedLeastSquares;

    fn lives_from(folds: &[(Vec<f64>, Vec<f64>)]) -> Vec<Vec<FittedLife>> {
        let factory = SegmentedLeastSquares::default();
        folds
            .iter()
            .map(|(t, p)| {
                crate::lives::split_lives(t, p, None, &LifeOptions::default(), &factory)
                    .unwrap()
                    .lives
            })
            .collect()
    }

    #[test]
    fn perfect_predictions_cost_nothing_at_zero_horizon() {
        let seq = vec![4.0, 3.0, 2.0, 1.0, 0.0];
        let lives = lives_from(&[(seq.clone(), seq)]);
        let sweep = unexploited_lifetime_from_cv(&lives, 3.0, 4).unwrap();

        assert_eq!(sweep.windows, vec![0.0, 1.0, 2.0, 3.0]);
        // Perfect prediction, m=0: maintenance exactly at failure (a break,
        // but costing zero lifetime). Growing m schedules earlier and wastes
        // exactly m.
        assert_eq!(sweep.values, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn break_rate_drops_as_horizon_grows() {
        // Optimistic model: predicted end of life one unit late.
        let y_true = vec![4.0, 3.0, 2.0, 1.0, 0.0];
        let y_pred = vec![5.0, 4.0, 3.0, 2.0, 1.0];
        let lives = lives_from(&[(y_true, y_pred)]);
        let sweep = unexpected_breaks_from_cv(&lives, 4.0, 5).unwrap();

        assert_eq!(sweep.windows.len(), 5);
        for w in sweep.values.windows(2) {
            assert!(w[1] <= w[0] + 1e-12, "break rate increased: {:?}", sweep.values);
        }
        assert_eq!(sweep.values[0], 1.0);
        assert_eq!(*sweep.values.last().unwrap(), 0.0);
    }

    #[test]
    fn fold_stats_are_retained_per_horizon() {
        let seq = vec![4.0, 3.0, 2.0, 1.0, 0.0];
        let lives = lives_from(&[(seq.clone(), seq.clone()), (seq.clone(), seq)]);
        let sweep = unexploited_lifetime_from_cv(&lives, 2.0, 3).unwrap();
        assert_eq!(sweep.fold_stats.len(), 3);
        assert_eq!(sweep.fold_stats[0].len(), 2);
    }

    #[test]
    fn metric_j_is_zero_when_both_components_are_zero() {
        // Perfect model at m=0: no unexploited lifetime, but maintenance
        // lands exactly on the failure, which counts as a break. Use a
        // pessimistic model instead so both components vanish at m=0.
        let y_true = vec![4.0, 3.0, 2.0, 1.0, 0.0];
        let y_pred = vec![3.0, 2.0, 1.0, 0.0, 0.0];
        let lives = lives_from(&[(y_true, y_pred)]);

        let sweep = metric_j_from_cv(&lives, 2.0, 3, &CostParams::default()).unwrap();
        // Every life wastes lifetime (pessimistic), no breaks anywhere:
        // normalized unexploited values are ~1 for the single life.
        assert!(sweep.values.iter().all(|v| v.is_finite()));
        assert!(sweep.values[1] > 0.0);
    }

    #[test]
    fn metric_j_epsilon_guards_all_zero_steps() {
        let seq = vec![4.0, 3.0, 2.0, 1.0, 0.0];
        let y_pred = vec![3.0, 2.0, 1.0, 0.0, 0.0];
        let lives = lives_from(&[(seq, y_pred)]);

        // At m=0 the pessimistic model has zero breaks AND zero unexploited
        // lifetime (maintenance at predicted failure = actual failure - 1...
        // which wastes 1). Either way: no division blows up.
        let sweep = metric_j_from_cv(&lives, 0.0, 1, &CostParams::default()).unwrap();
        assert!(sweep.values[0].is_finite());
    }

    #[test]
    fn weights_scale_the_components() {
        let y_true = vec![4.0, 3.0, 2.0, 1.0, 0.0];
        let y_pred = vec![5.0, 4.0, 3.0, 2.0, 1.0];
        let lives = lives_from(&[(y_true, y_pred)]);

        let base = metric_j_from_cv(&lives, 0.0, 1, &CostParams::default()).unwrap();
        let doubled = metric_j_from_cv(
            &lives,
            0.0,
            1,
            &CostParams {
                q1: 2.0,
                q2: 2.0,
                epsilon: 1e-10,
            },
        )
        .unwrap();
        assert!((doubled.values[0] - 2.0 * base.values[0]).abs() < 1e-9);
    }

    #[test]
    fn top_level_wrappers_split_lives_internally() {
        use crate::domain::FoldRecord;

        let folds = vec![
            FoldRecord {
                y_true: vec![4.0, 3.0, 2.0, 1.0, 0.0, 4.0, 3.0, 2.0, 1.0, 0.0],
                y_pred: vec![4.0, 3.0, 2.0, 1.0, 0.0, 4.0, 3.0, 2.0, 1.0, 0.0],
            },
            FoldRecord {
                y_true: vec![5.0, 4.0, 3.0, 2.0, 1.0, 0.0],
                y_pred: vec![5.0, 4.0, 3.0, 2.0, 1.0, 0.0],
            },
        ];
        let opts = LifeOptions::default();
        let factory = SegmentedLeastSquares::default();

        let ul = unexploited_lifetime(&folds, 2.0, 3, &opts, &factory).unwrap();
        let ub = unexpected_breaks(&folds, 2.0, 3, &opts, &factory).unwrap();
        let j = metric_j(&folds, 2.0, 3, &CostParams::default(), &opts, &factory).unwrap();

        assert_eq!(ul.windows, vec![0.0, 1.0, 2.0]);
        // Perfect predictions waste exactly m per life.
        assert_eq!(ul.values, vec![0.0, 1.0, 2.0]);
        // Maintenance lands exactly on failure at m=0, clearing afterwards.
        assert_eq!(ub.values[0], 1.0);
        assert_eq!(ub.values[2], 0.0);
        assert_eq!(j.windows.len(), 3);
    }

    #[test]
    fn invalid_sweep_settings_are_input_errors() {
        let lives: Vec<Vec<FittedLife>> = vec![];
        assert_eq!(
            unexploited_lifetime_from_cv(&lives, -1.0, 3).unwrap_err().exit_code(),
            2
        );
        assert_eq!(
            unexploited_lifetime_from_cv(&lives, 1.0, 0).unwrap_err().exit_code(),
            2
        );
    }
}
