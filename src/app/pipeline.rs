//! Shared evaluation pipeline used by the CLI front-end.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> life splitting -> binned CV -> regression summaries -> horizon sweeps
//!
//! The CLI then focuses on presentation (printing and exports).

use std::collections::BTreeMap;

use crate::domain::{EvalConfig, ResultsSet};
use crate::error::AppError;
use crate::fit::SegmentedLeastSquares;
use crate::io::ingest::{load_results, RowError};
use crate::lives::{split_lives_from_fold, FittedLife, LifeOptions, SplitLives};
use crate::metrics::{
    cv_regression_metrics, hold_out_regression_metrics, metric_j_from_cv, models_cv_results,
    unexpected_breaks_from_cv, unexploited_lifetime_from_cv, CostParams, CvResults, ModelSweeps,
    RegressionMetrics, RegressionSummary,
};
use crate::report::{life_stats, rank_models, ModelLifeStats};

/// All computed outputs of a single `rul eval` run.
#[derive(Debug, Clone)]
pub struct EvalRunOutput {
    pub results: ResultsSet,
    pub ingest_errors: Vec<RowError>,
    pub stats: Vec<ModelLifeStats>,
    pub lives: BTreeMap<String, Vec<SplitLives>>,
    pub bin_edges: Vec<f64>,
    pub cv: BTreeMap<String, CvResults>,
    pub regression: BTreeMap<String, RegressionSummary>,
    pub hold_out: BTreeMap<String, RegressionMetrics>,
    pub sweeps: BTreeMap<String, ModelSweeps>,
    pub ranking: Vec<(String, f64)>,
}

/// Execute the full evaluation pipeline and return the computed outputs.
pub fn run_eval(config: &EvalConfig) -> Result<EvalRunOutput, AppError> {
    // 1) Load and validate the results file.
    let ingested = load_results(&config.input, config.format)?;
    let results = ingested.results;
    results.validate()?;

    run_eval_with_results(config, results, ingested.row_errors)
}

/// Execute the evaluation pipeline on pre-loaded results.
///
/// This is useful for tests and for callers that already hold a
/// `ResultsSet` (e.g. straight from the sample generator).
pub fn run_eval_with_results(
    config: &EvalConfig,
    results: ResultsSet,
    ingest_errors: Vec<RowError>,
) -> Result<EvalRunOutput, AppError> {
    let opts = LifeOptions {
        rul_threshold: config.rul_threshold,
        fit_line_not_increasing: config.fit_line_not_increasing,
    };
    let factory = SegmentedLeastSquares::default();

    // 2) Split every model's folds into fitted lives (with skip audit).
    let mut lives = BTreeMap::new();
    for (model, folds) in &results.models {
        let split = folds
            .iter()
            .map(|fold| split_lives_from_fold(fold, &opts, &factory))
            .collect::<Result<Vec<SplitLives>, AppError>>()?;
        lives.insert(model.clone(), split);
    }

    // 3) Binned errors over one shared edge set, then regression summaries.
    let (bin_edges, cv) = models_cv_results(&results, config.nbins)?;
    let regression = cv_regression_metrics(&results, config.error_threshold)?;
    let hold_out = hold_out_regression_metrics(&results, config.hold_out_fold)?;

    // 4) Maintenance sweeps per model over the shared horizon grid.
    let params = CostParams {
        q1: config.q1,
        q2: config.q2,
        epsilon: config.epsilon,
    };
    let mut sweeps = BTreeMap::new();
    for (model, split) in &lives {
        let fold_lives: Vec<Vec<FittedLife>> =
            split.iter().map(|s| s.lives.clone()).collect();
        sweeps.insert(
            model.clone(),
            ModelSweeps {
                unexploited: unexploited_lifetime_from_cv(
                    &fold_lives,
                    config.window_size,
                    config.horizon_steps,
                )?,
                breaks: unexpected_breaks_from_cv(
                    &fold_lives,
                    config.window_size,
                    config.horizon_steps,
                )?,
                cost: metric_j_from_cv(
                    &fold_lives,
                    config.window_size,
                    config.horizon_steps,
                    &params,
                )?,
            },
        );
    }

    // 5) Headline stats and ranking.
    let stats = life_stats(&results, &lives);
    let ranking = rank_models(&regression);

    Ok(EvalRunOutput {
        results,
        ingest_errors,
        stats,
        lives,
        bin_edges,
        cv,
        regression,
        hold_out,
        sweeps,
        ranking,
    })
}
