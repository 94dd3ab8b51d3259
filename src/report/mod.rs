//! Reporting utilities: per-model life statistics and model ranking.

use std::collections::BTreeMap;

use crate::domain::ResultsSet;
use crate::lives::SplitLives;
use crate::metrics::RegressionSummary;

pub mod format;

pub use format::*;

/// Headline counts for one model's evaluation.
#[derive(Debug, Clone)]
pub struct ModelLifeStats {
    pub model: String,
    pub folds: usize,
    pub samples: usize,
    pub lives: usize,
    pub skipped: usize,
}

/// Gather per-model counts from the split outcome.
pub fn life_stats(
    results: &ResultsSet,
    lives: &BTreeMap<String, Vec<SplitLives>>,
) -> Vec<ModelLifeStats> {
    results
        .models
        .iter()
        .map(|(model, folds)| {
            let split = lives.get(model);
            ModelLifeStats {
                model: model.clone(),
                folds: folds.len(),
                samples: folds.iter().map(|f| f.len()).sum(),
                lives: split.map_or(0, |s| s.iter().map(|f| f.lives.len()).sum()),
                skipped: split.map_or(0, |s| s.iter().map(|f| f.skipped.len()).sum()),
            }
        })
        .collect()
}

/// Rank models by cross-fold weighted MAE, best first.
pub fn rank_models(regression: &BTreeMap<String, RegressionSummary>) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = regression
        .iter()
        .map(|(model, summary)| (model.clone(), summary.mean.mae_weighted))
        .collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::RegressionMetrics;

    #[test]
    fn rank_models_orders_by_weighted_mae() {
        let mut regression = BTreeMap::new();
        for (name, mae_weighted) in [("worse", 4.0), ("better", 1.0)] {
            regression.insert(
                name.to_string(),
                RegressionSummary {
                    folds: vec![],
                    mean: RegressionMetrics {
                        mae_weighted,
                        ..Default::default()
                    },
                    std: RegressionMetrics::default(),
                },
            );
        }
        let ranked = rank_models(&regression);
        assert_eq!(ranked[0].0, "better");
        assert_eq!(ranked[1].0, "worse");
    }
}
