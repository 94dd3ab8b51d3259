//! Results-file ingest and normalization.
//!
//! This module turns a results file produced by a training harness into a
//! validated `ResultsSet` that is safe to aggregate.
//!
//! Design goals:
//! - **Strict shape contract** (equal-length sequences; clear errors + exit code 2)
//! - **Record-level validation** (drop bad folds/rows, but report what happened)
//! - **Deterministic behavior** (model order is sorted, fold order preserved)
//! - **Separation of concerns**: no metric computation here
//!
//! Two formats are supported:
//! - JSON: `{ "<model>": [ { "true": [..], "predicted": [..] }, .. ], .. }`
//! - CSV (long format): `model,fold,y_true,y_pred`, one sample per row,
//!   grouped into folds per model by the `fold` column

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{FoldRecord, InputFormat, ResultsSet};
use crate::error::AppError;

/// A record- or row-level problem encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    /// CSV line number, or fold index for JSON records.
    pub location: usize,
    pub model: Option<String>,
    pub message: String,
}

/// Ingest output: validated results + per-record problems.
#[derive(Debug, Clone)]
pub struct IngestedResults {
    pub results: ResultsSet,
    pub row_errors: Vec<RowError>,
}

/// Load a results file, resolving `Auto` format from the file extension.
pub fn load_results(path: &Path, format: InputFormat) -> Result<IngestedResults, AppError> {
    let format = resolve_format(path, format)?;
    let ingested = match format {
        InputFormat::Json => load_json(path)?,
        InputFormat::Csv => load_csv(path)?,
        InputFormat::Auto => unreachable!("resolved above"),
    };

    if ingested.results.models.is_empty() {
        return Err(AppError::new(
            3,
            "No usable model results remain after validation.",
        ));
    }
    Ok(ingested)
}

fn resolve_format(path: &Path, format: InputFormat) -> Result<InputFormat, AppError> {
    if format != InputFormat::Auto {
        return Ok(format);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(InputFormat::Json),
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(InputFormat::Csv),
        _ => Err(AppError::new(
            2,
            format!(
                "Cannot infer results format from '{}'; pass --format json|csv.",
                path.display()
            ),
        )),
    }
}

fn load_json(path: &Path) -> Result<IngestedResults, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open results file '{}': {e}", path.display()))
    })?;

    let raw: BTreeMap<String, Vec<FoldRecord>> = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid results JSON: {e}")))?;

    let mut results = ResultsSet::default();
    let mut row_errors = Vec::new();

    for (model, folds) in raw {
        let mut kept = Vec::with_capacity(folds.len());
        for (i, fold) in folds.into_iter().enumerate() {
            if fold.y_true.len() != fold.y_pred.len() {
                row_errors.push(RowError {
                    location: i,
                    model: Some(model.clone()),
                    message: format!(
                        "true/predicted length mismatch ({} vs {})",
                        fold.y_true.len(),
                        fold.y_pred.len()
                    ),
                });
                continue;
            }
            if fold.is_empty() {
                row_errors.push(RowError {
                    location: i,
                    model: Some(model.clone()),
                    message: "empty fold".to_string(),
                });
                continue;
            }
            kept.push(fold);
        }
        if kept.is_empty() {
            row_errors.push(RowError {
                location: 0,
                model: Some(model),
                message: "model dropped: no valid folds".to_string(),
            });
            continue;
        }
        results.models.insert(model, kept);
    }

    Ok(IngestedResults { results, row_errors })
}

fn load_csv(path: &Path) -> Result<IngestedResults, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open results file '{}': {e}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for required in ["model", "fold", "y_true", "y_pred"] {
        if !header_map.contains_key(required) {
            return Err(AppError::new(2, format!("Missing required column: `{required}`")));
        }
    }

    // model -> fold index -> accumulated record. BTreeMaps keep both model
    // and fold order deterministic regardless of row order.
    let mut accum: BTreeMap<String, BTreeMap<usize, FoldRecord>> = BTreeMap::new();
    let mut row_errors = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header row and lines are 1-based.
        let line = idx + 2;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    location: line,
                    model: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok((model, fold, y_true, y_pred)) => {
                let entry = accum
                    .entry(model)
                    .or_default()
                    .entry(fold)
                    .or_insert_with(|| FoldRecord {
                        y_true: Vec::new(),
                        y_pred: Vec::new(),
                    });
                entry.y_true.push(y_true);
                entry.y_pred.push(y_pred);
            }
            Err(message) => row_errors.push(RowError {
                location: line,
                model: None,
                message,
            }),
        }
    }

    let mut results = ResultsSet::default();
    for (model, folds) in accum {
        results
            .models
            .insert(model, folds.into_values().collect());
    }

    Ok(IngestedResults { results, row_errors })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on
    // the first header. If we don't strip it, schema validation incorrectly
    // reports a missing `model` column.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
) -> Result<(String, usize, f64, f64), String> {
    let model = get_required(record, header_map, "model")?.to_string();
    let fold = get_required(record, header_map, "fold")?
        .parse::<usize>()
        .map_err(|_| "Invalid `fold` value (expected a non-negative integer).".to_string())?;
    let y_true = parse_f64(get_required(record, header_map, "y_true")?)?;
    // Predictions may legitimately be NaN (the life-skip policy handles
    // them downstream), so `y_pred` only has to parse, not be finite.
    let y_pred = get_required(record, header_map, "y_pred")?
        .parse::<f64>()
        .map_err(|_| "Invalid `y_pred` value.".to_string())?;
    Ok((model, fold, y_true, y_pred))
}

fn parse_f64(s: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid numeric value '{s}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite value '{s}'."))
    }
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("rul-eval-test-{name}"));
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn json_roundtrip_with_true_predicted_keys() {
        let path = temp_file(
            "basic.json",
            r#"{"lstm": [{"true": [3.0, 2.0, 1.0], "predicted": [3.0, 2.1, 0.9]}]}"#,
        );
        let ingested = load_results(&path, InputFormat::Auto).unwrap();
        assert_eq!(ingested.results.models.len(), 1);
        assert_eq!(ingested.results.models["lstm"][0].y_pred[1], 2.1);
        assert!(ingested.row_errors.is_empty());
    }

    #[test]
    fn json_mismatched_fold_is_dropped_with_row_error() {
        let path = temp_file(
            "mismatch.json",
            r#"{"m": [
                {"true": [1.0], "predicted": [1.0, 2.0]},
                {"true": [2.0, 1.0], "predicted": [2.0, 1.0]}
            ]}"#,
        );
        let ingested = load_results(&path, InputFormat::Auto).unwrap();
        assert_eq!(ingested.results.models["m"].len(), 1);
        assert_eq!(ingested.row_errors.len(), 1);
        assert!(ingested.row_errors[0].message.contains("length mismatch"));
    }

    #[test]
    fn json_with_no_usable_models_is_a_no_data_error() {
        let path = temp_file("empty.json", r#"{"m": [{"true": [], "predicted": []}]}"#);
        let err = load_results(&path, InputFormat::Auto).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn csv_rows_group_into_folds_per_model() {
        let path = temp_file(
            "basic.csv",
            "model,fold,y_true,y_pred\n\
             gru,0,2.0,2.0\n\
             gru,0,1.0,1.1\n\
             gru,1,3.0,2.9\n\
             tcn,0,2.0,1.8\n",
        );
        let ingested = load_results(&path, InputFormat::Auto).unwrap();
        assert_eq!(ingested.results.models.len(), 2);
        assert_eq!(ingested.results.models["gru"].len(), 2);
        assert_eq!(ingested.results.models["gru"][0].y_true, vec![2.0, 1.0]);
        assert_eq!(ingested.results.models["tcn"][0].y_pred, vec![1.8]);
    }

    #[test]
    fn csv_nan_predictions_are_accepted() {
        let path = temp_file(
            "nan.csv",
            "model,fold,y_true,y_pred\n\
             m,0,2.0,NaN\n\
             m,0,1.0,1.0\n",
        );
        let ingested = load_results(&path, InputFormat::Auto).unwrap();
        assert!(ingested.results.models["m"][0].y_pred[0].is_nan());
        assert!(ingested.row_errors.is_empty());
    }

    #[test]
    fn csv_bad_rows_are_reported_not_fatal() {
        let path = temp_file(
            "bad-rows.csv",
            "model,fold,y_true,y_pred\n\
             m,0,2.0,2.0\n\
             m,zero,1.0,1.0\n\
             m,0,oops,1.0\n",
        );
        let ingested = load_results(&path, InputFormat::Auto).unwrap();
        assert_eq!(ingested.results.models["m"][0].y_true.len(), 1);
        assert_eq!(ingested.row_errors.len(), 2);
        assert_eq!(ingested.row_errors[0].location, 3);
    }

    #[test]
    fn unknown_extension_requires_explicit_format() {
        let path = temp_file("data.bin", "");
        let err = load_results(&path, InputFormat::Auto).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
