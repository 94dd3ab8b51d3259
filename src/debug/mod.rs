//! Debug bundle writer for inspecting per-life fits and sweep diagnostics.

use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;

use crate::app::pipeline::EvalRunOutput;
use crate::domain::{EvalConfig, Weighting};
use crate::error::AppError;
use crate::lives::rul_reference_line;

pub fn write_debug_bundle(output: &EvalRunOutput, config: &EvalConfig) -> Result<PathBuf, AppError> {
    let dir = PathBuf::from("debug");
    create_dir_all(&dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("rul_debug_{ts}.md"));

    let mut file = File::create(&path)
        .map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;

    writeln!(file, "# rul debug bundle")
        .map_err(|e| AppError::new(4, format!("Failed to write debug header: {e}")))?;
    writeln!(file, "- generated: {}", Local::now().to_rfc3339())
        .map_err(|e| AppError::new(4, format!("Failed to write debug header: {e}")))?;
    writeln!(file, "- input: {}", config.input.display())
        .map_err(|e| AppError::new(4, format!("Failed to write debug header: {e}")))?;
    writeln!(
        file,
        "- horizons: [0, {:.2}] x {} | bins: {} | q1={:.2} q2={:.2} eps={:.1e}",
        config.window_size, config.horizon_steps, config.nbins, config.q1, config.q2, config.epsilon
    )
    .map_err(|e| AppError::new(4, format!("Failed to write debug header: {e}")))?;
    if let Some(threshold) = config.rul_threshold {
        writeln!(file, "- rul_threshold: {threshold:.2}")
            .map_err(|e| AppError::new(4, format!("Failed to write debug header: {e}")))?;
    }

    if !output.ingest_errors.is_empty() {
        writeln!(file, "\n## Ingest problems")
            .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
        for err in &output.ingest_errors {
            writeln!(
                file,
                "- [{}] {}: {}",
                err.location,
                err.model.as_deref().unwrap_or("-"),
                err.message
            )
            .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
        }
    }

    for (model, split_folds) in &output.lives {
        writeln!(file, "\n## Model: {model}")
            .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;

        writeln!(file, "\n### Lives")
            .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
        writeln!(file, "| fold | life | samples | degrading_start | eol | predicted_eol | rmse | mae(rel) |")
            .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
        writeln!(file, "| - | - | - | - | - | - | - | - |")
            .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
        for (fold, split) in split_folds.iter().enumerate() {
            for (i, life) in split.lives.iter().enumerate() {
                writeln!(
                    file,
                    "| {} | {} | {} | {} | {:.3} | {:.3} | {:.3} | {:.3} |",
                    fold,
                    i,
                    life.len(),
                    life.degrading_start(),
                    life.end_of_life(),
                    life.predicted_end_of_life(),
                    life.rmse(Weighting::Uniform),
                    life.mae(Weighting::Relative),
                )
                .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
            }
            for skipped in &split.skipped {
                writeln!(
                    file,
                    "- skipped fold {} life {} (samples {}..{}): {}",
                    fold, skipped.life, skipped.range.start, skipped.range.end, skipped.reason
                )
                .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
            }
        }

        if let Some(sweeps) = output.sweeps.get(model) {
            writeln!(file, "\n### Horizon sweep (per-fold mean ± std)")
                .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
            writeln!(file, "| horizon | unexploited | breaks | cost |")
                .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
            writeln!(file, "| - | - | - | - |")
                .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
            for (i, &m) in sweeps.unexploited.windows.iter().enumerate() {
                writeln!(
                    file,
                    "| {:.2} | {} | {} | {} |",
                    m,
                    fmt_fold_stats(&sweeps.unexploited.fold_stats[i]),
                    fmt_fold_stats(&sweeps.breaks.fold_stats[i]),
                    fmt_fold_stats(&sweeps.cost.fold_stats[i]),
                )
                .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
            }
        }

        // Ideal-descent comparison for the first retained life.
        if let Some(life) = split_folds.iter().flat_map(|s| s.lives.first()).next() {
            let reference = rul_reference_line(life.y_true()[0], life.len(), None);
            writeln!(file, "\n### First life vs ideal descent")
                .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
            writeln!(file, "| time | y_true | reference | y_pred | pred_fitted |")
                .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
            writeln!(file, "| - | - | - | - | - |")
                .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
            for j in 0..life.len() {
                let t = life.time()[j];
                writeln!(
                    file,
                    "| {:.2} | {:.3} | {:.3} | {:.3} | {:.3} |",
                    t,
                    life.y_true()[j],
                    reference[j],
                    life.y_pred()[j],
                    life.y_pred_fitted().value_at(t),
                )
                .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;
            }
        }
    }

    Ok(path)
}

fn fmt_fold_stats(stats: &[crate::metrics::FoldStat]) -> String {
    let parts: Vec<String> = stats
        .iter()
        .map(|s| format!("{:.3}±{:.3}", s.mean, s.std))
        .collect();
    parts.join(", ")
}
