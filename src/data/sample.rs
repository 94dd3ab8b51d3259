//! Synthetic run-to-failure results generation.
//!
//! Produces a `ResultsSet` that looks like the output of a cross-validated
//! training harness: per model, per fold, a concatenated true-RUL signal of
//! several lives plus noisy predictions of it. Deterministic given the seed.
//!
//! Each successive model gets a larger noise scale, so the generated set
//! always contains a clear ranking for reports to show.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{FoldRecord, ResultsSet, SampleConfig};
use crate::error::AppError;

pub fn generate_results(config: &SampleConfig) -> Result<ResultsSet, AppError> {
    if config.models == 0 || config.folds == 0 || config.lives_per_fold == 0 {
        return Err(AppError::new(2, "Model, fold, and life counts must all be > 0."));
    }
    if config.life_len_min < 2 || config.life_len_max < config.life_len_min {
        return Err(AppError::new(2, "Invalid life length range (need max >= min >= 2)."));
    }
    if !(config.noise_sigma.is_finite() && config.noise_sigma >= 0.0) {
        return Err(AppError::new(2, "Noise sigma must be finite and >= 0."));
    }
    if !(0.0..=1.0).contains(&config.nan_prob) {
        return Err(AppError::new(2, "NaN probability must be in [0, 1]."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut results = ResultsSet::default();

    for model_idx in 0..config.models {
        // Noise grows with the model index so "model-1" is the best.
        let sigma = config.noise_sigma * (1.0 + model_idx as f64 * 0.75);
        let normal = Normal::new(0.0, sigma.max(1e-9))
            .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

        let mut folds = Vec::with_capacity(config.folds);
        for _ in 0..config.folds {
            folds.push(generate_fold(config, &normal, &mut rng));
        }

        results
            .models
            .insert(format!("model-{}", model_idx + 1), folds);
    }

    Ok(results)
}

fn generate_fold(config: &SampleConfig, normal: &Normal<f64>, rng: &mut StdRng) -> FoldRecord {
    let mut y_true = Vec::new();
    let mut y_pred = Vec::new();

    for _ in 0..config.lives_per_fold {
        let len = rng.gen_range(config.life_len_min..=config.life_len_max);

        // True RUL descends one unit per sample down to zero.
        let life_true: Vec<f64> = (0..len).rev().map(|v| v as f64).collect();

        // Predictions: noisy descent, clamped at zero so a predicted end of
        // life exists inside the observed range most of the time.
        let mut life_pred: Vec<f64> = life_true
            .iter()
            .map(|&v| (v + normal.sample(rng)).max(0.0))
            .collect();

        // Optionally poison one prediction, exercising the life-skip policy.
        if config.nan_prob > 0.0 && rng.r#gen::<f64>() < config.nan_prob {
            let idx = rng.gen_range(0..life_pred.len());
            life_pred[idx] = f64::NAN;
        }

        y_true.extend(life_true);
        y_pred.extend(life_pred);
    }

    FoldRecord { y_true, y_pred }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn base_config() -> SampleConfig {
        SampleConfig {
            output: PathBuf::from("unused.json"),
            models: 2,
            folds: 3,
            lives_per_fold: 4,
            life_len_min: 10,
            life_len_max: 20,
            noise_sigma: 1.0,
            nan_prob: 0.0,
            seed: 7,
        }
    }

    #[test]
    fn generation_is_deterministic_given_the_seed() {
        let config = base_config();
        let a = generate_results(&config).unwrap();
        let b = generate_results(&config).unwrap();
        assert_eq!(a.models["model-1"][0].y_pred, b.models["model-1"][0].y_pred);
    }

    #[test]
    fn generated_lives_descend_to_zero() {
        let results = generate_results(&base_config()).unwrap();
        let fold = &results.models["model-1"][0];
        assert_eq!(fold.y_true.len(), fold.y_pred.len());
        // Every life ends at exactly zero; count the zeros.
        let zeros = fold.y_true.iter().filter(|&&v| v == 0.0).count();
        assert_eq!(zeros, 4);
        // The concatenated signal splits back into the generated lives.
        let ranges = crate::lives::split_lives_indices(&fold.y_true);
        assert_eq!(ranges.len(), 4);
    }

    #[test]
    fn nan_injection_poisons_predictions_only() {
        let mut config = base_config();
        config.nan_prob = 1.0;
        let results = generate_results(&config).unwrap();
        let fold = &results.models["model-1"][0];
        assert!(fold.y_pred.iter().any(|v| v.is_nan()));
        assert!(fold.y_true.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut config = base_config();
        config.life_len_min = 1;
        assert_eq!(generate_results(&config).unwrap_err().exit_code(), 2);

        let mut config = base_config();
        config.models = 0;
        assert_eq!(generate_results(&config).unwrap_err().exit_code(), 2);
    }
}
