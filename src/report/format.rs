//! Formatted terminal output for an evaluation run.
//!
//! We keep formatting code in one place so:
//! - the metric/aggregation code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use std::collections::BTreeMap;

use crate::domain::EvalConfig;
use crate::metrics::{CvResults, ModelSweeps, RegressionMetrics, RegressionSummary};
use crate::report::ModelLifeStats;

/// Format the run header: configuration and per-model dataset stats.
pub fn format_run_summary(stats: &[ModelLifeStats], config: &EvalConfig) -> String {
    let mut out = String::new();

    out.push_str("=== rul - RUL Prediction Evaluation ===\n");
    out.push_str(&format!("Input: {}\n", config.input.display()));
    out.push_str(&format!(
        "Horizon sweep: [0, {:.2}] in {} steps | bins: {}\n",
        config.window_size, config.horizon_steps, config.nbins
    ));
    if let Some(threshold) = config.rul_threshold {
        out.push_str(&format!("RUL threshold: {threshold:.2}\n"));
    }

    out.push_str("\nModels:\n");
    out.push_str(&format!(
        "{:<20} {:>6} {:>9} {:>7} {:>8}\n",
        "model", "folds", "samples", "lives", "skipped"
    ));
    for s in stats {
        out.push_str(&format!(
            "{:<20} {:>6} {:>9} {:>7} {:>8}\n",
            truncate(&s.model, 20),
            s.folds,
            s.samples,
            s.lives,
            s.skipped
        ));
    }

    out
}

/// Format the binned error table: cross-fold MAE per true-RUL bin.
pub fn format_bins_table(cv: &BTreeMap<String, CvResults>) -> String {
    let mut out = String::new();
    out.push_str("MAE by true-RUL bin (mean over folds with samples):\n");

    for (model, results) in cv {
        out.push_str(&format!("- {}\n", truncate(model, 40)));
        let edges = results.bin_edges();
        for bin in 0..results.n_bins() {
            out.push_str(&format!(
                "    [{:>8.2}, {:>8.2}]  {:>10.3}\n",
                edges[bin],
                edges[bin + 1],
                results.mae_across_folds(bin)
            ));
        }
    }

    out
}

/// Format the regression summary as `mean ± std` per model.
pub fn format_regression_table(regression: &BTreeMap<String, RegressionSummary>) -> String {
    let mut out = String::new();
    out.push_str("Regression metrics (mean ± std over folds):\n");
    out.push_str(&format!(
        "{:<20} {:>16} {:>16} {:>16} {:>16}\n",
        "model", "MAE(w)", "MAE", "MSE(w)", "MSE"
    ));
    for (model, s) in regression {
        out.push_str(&format!(
            "{:<20} {:>16} {:>16} {:>16} {:>16}\n",
            truncate(model, 20),
            fmt_pm(s.mean.mae_weighted, s.std.mae_weighted),
            fmt_pm(s.mean.mae, s.std.mae),
            fmt_pm(s.mean.mse_weighted, s.std.mse_weighted),
            fmt_pm(s.mean.mse, s.std.mse),
        ));
    }
    out
}

/// Format the regression metrics of one designated hold-out fold.
pub fn format_hold_out_table(
    hold_out: &BTreeMap<String, RegressionMetrics>,
    fold: usize,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("Hold-out regression metrics (fold {fold}):\n"));
    out.push_str(&format!(
        "{:<20} {:>10} {:>10} {:>12} {:>12}\n",
        "model", "MAE(w)", "MAE", "MSE(w)", "MSE"
    ));
    for (model, m) in hold_out {
        out.push_str(&format!(
            "{:<20} {:>10.3} {:>10.3} {:>12.3} {:>12.3}\n",
            truncate(model, 20),
            m.mae_weighted,
            m.mae,
            m.mse_weighted,
            m.mse,
        ));
    }
    out
}

/// Format the horizon sweep table at a handful of representative horizons.
pub fn format_sweep_table(sweeps: &BTreeMap<String, ModelSweeps>) -> String {
    let mut out = String::new();
    out.push_str("Maintenance metrics by fault horizon:\n");
    out.push_str(&format!(
        "{:<20} {:>9} {:>13} {:>12} {:>10}\n",
        "model", "horizon", "unexploited", "break rate", "cost"
    ));

    for (model, s) in sweeps {
        for i in representative_indices(s.unexploited.windows.len(), 5) {
            out.push_str(&format!(
                "{:<20} {:>9.2} {:>13.3} {:>12.3} {:>10.3}\n",
                truncate(model, 20),
                s.unexploited.windows[i],
                s.unexploited.values[i],
                s.breaks.values[i],
                s.cost.values[i],
            ));
        }
    }

    out
}

/// Format the model ranking (best first by weighted MAE).
pub fn format_ranking(ranked: &[(String, f64)]) -> String {
    let mut out = String::new();
    out.push_str("Ranking (weighted MAE, best first):\n");
    for (i, (model, mae)) in ranked.iter().enumerate() {
        out.push_str(&format!("{:>3}. {:<20} {:>10.3}\n", i + 1, truncate(model, 20), mae));
    }
    out
}

/// Pick up to `k` evenly spread indices over `0..n`, always including the
/// first and last.
fn representative_indices(n: usize, k: usize) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    if n <= k || k < 2 {
        return (0..n).collect();
    }
    let mut out: Vec<usize> = (0..k)
        .map(|i| (i as f64 / (k as f64 - 1.0) * (n as f64 - 1.0)).round() as usize)
        .collect();
    out.dedup();
    out
}

fn fmt_pm(mean: f64, std: f64) -> String {
    format!("{mean:.2} +/- {std:.2}")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn representative_indices_cover_endpoints() {
        assert_eq!(representative_indices(3, 5), vec![0, 1, 2]);
        let idx = representative_indices(30, 5);
        assert_eq!(idx.first(), Some(&0));
        assert_eq!(idx.last(), Some(&29));
        assert!(idx.len() <= 5);
    }

    #[test]
    fn truncate_marks_shortened_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-model-name", 10), "a-very-lo.");
    }
}
