//! Export metric tables to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts (one row per cell, no nested structure).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::AppError;
use crate::metrics::{CvResults, ModelSweeps};

/// Write the binned error table: one row per model/fold/bin.
pub fn write_bins_csv(
    path: &Path,
    cv: &BTreeMap<String, CvResults>,
) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display()))
    })?;

    writeln!(file, "model,fold,bin_lo,bin_hi,n_samples,mean_error,mae,mse")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (model, results) in cv {
        let edges = results.bin_edges();
        for fold in 0..results.n_folds() {
            for bin in 0..results.n_bins() {
                let n_samples = results
                    .errors()
                    .iter()
                    .find(|e| e.fold == fold && e.bin == bin)
                    .map(|e| e.errors.len())
                    .unwrap_or(0);
                writeln!(
                    file,
                    "{},{},{:.6},{:.6},{},{:.6},{:.6},{:.6}",
                    model,
                    fold,
                    edges[bin],
                    edges[bin + 1],
                    n_samples,
                    results.mean_error()[fold][bin],
                    results.mae()[fold][bin],
                    results.mse()[fold][bin],
                )
                .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
            }
        }
    }

    Ok(())
}

/// Write the horizon sweep table: one row per model/horizon.
pub fn write_sweeps_csv(
    path: &Path,
    sweeps: &BTreeMap<String, ModelSweeps>,
) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display()))
    })?;

    writeln!(file, "model,horizon,unexploited_lifetime,unexpected_break_rate,cost")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (model, s) in sweeps {
        for (i, &m) in s.unexploited.windows.iter().enumerate() {
            writeln!(
                file,
                "{},{:.6},{:.6},{:.6},{:.6}",
                model, m, s.unexploited.values[i], s.breaks.values[i], s.cost.values[i],
            )
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
        }
    }

    Ok(())
}
