//! Array reduction primitives used throughout the evaluation pipeline.
//!
//! Sequence lengths are small (one life is tens to low thousands of samples),
//! so these are plain single-pass loops. All functions are deterministic and
//! NaN-tolerant only where documented; callers are expected to filter
//! non-finite values before aggregating.

/// Arithmetic mean. Returns `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation. Returns `0.0` for fewer than 2 samples.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Median of a slice (averaging the two middle values for even lengths).
///
/// Returns `None` for an empty slice. The input is copied; NaN values sort
/// as equal to their neighbors, so callers should strip them first.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// First difference: `out[i] = values[i+1] - values[i]`.
///
/// One element shorter than the input; empty for inputs of length < 2.
pub fn first_diff(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// In-order cumulative sum.
pub fn cumsum(values: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    values
        .iter()
        .map(|v| {
            acc += v;
            acc
        })
        .collect()
}

/// `n` evenly spaced points covering `[start, stop]` inclusive.
///
/// `n == 0` yields an empty vector and `n == 1` yields `[start]`, matching
/// the conventions of the horizon sweep and bin-edge derivation.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as f64 - 1.0);
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Maximum of a slice, ignoring non-finite values. `0.0` when nothing is left.
pub fn finite_max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max)
}
