//! Piecewise-linear fitting of a life's RUL trajectory.
//!
//! Fitting is exposed as a small capability so alternative smoothers can be
//! swapped in without touching the segmentation or aggregation code:
//!
//! - `PointFitter`: accept `(time, value)` points one at a time in
//!   non-decreasing time order, then `finish()` into a `PiecewiseLinear`
//! - `FitterFactory`: construct a fresh fitter per sequence, carrying the
//!   non-increasing shape flag
//!
//! The default implementation (`SegmentedLeastSquares`) works in two stages:
//!
//! 1. knot placement: start with the end points only, then repeatedly insert
//!    a knot at the worst residual until the fit is within tolerance or the
//!    knot budget is exhausted
//! 2. knot heights: solve a hat-basis least squares problem over the knot
//!    grid, which yields a continuous piecewise-linear function directly
//!
//! Both stages are deterministic given the same inputs/flags.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::math::solve_least_squares;

/// A continuous piecewise-linear function defined by its knots.
///
/// Evaluable at arbitrary times: inside the knot range values are linearly
/// interpolated; outside it the first/last segment is extended.
#[derive(Debug, Clone)]
pub struct PiecewiseLinear {
    knot_t: Vec<f64>,
    knot_y: Vec<f64>,
}

impl PiecewiseLinear {
    /// Build directly from knots. Times must be non-decreasing.
    pub fn from_knots(knot_t: Vec<f64>, knot_y: Vec<f64>) -> Result<Self, AppError> {
        if knot_t.is_empty() || knot_t.len() != knot_y.len() {
            return Err(AppError::new(4, "Piecewise fit produced an empty or mismatched knot set."));
        }
        if knot_t.windows(2).any(|w| w[1] < w[0]) {
            return Err(AppError::new(4, "Piecewise knots must be in non-decreasing time order."));
        }
        Ok(Self { knot_t, knot_y })
    }

    pub fn knot_times(&self) -> &[f64] {
        &self.knot_t
    }

    pub fn knot_values(&self) -> &[f64] {
        &self.knot_y
    }

    /// Evaluate the fitted function at time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        let n = self.knot_t.len();
        if n == 1 {
            return self.knot_y[0];
        }

        // Extend the edge segments beyond the fitted range.
        if t <= self.knot_t[0] {
            return self.extend(0, 1, t);
        }
        if t >= self.knot_t[n - 1] {
            return self.extend(n - 2, n - 1, t);
        }

        // First knot strictly beyond t; the segment starts one before it.
        let hi = self.knot_t.partition_point(|&k| k <= t);
        let lo = hi - 1;
        self.extend(lo, hi, t)
    }

    fn extend(&self, lo: usize, hi: usize, t: f64) -> f64 {
        let (t0, y0) = (self.knot_t[lo], self.knot_y[lo]);
        let (t1, y1) = (self.knot_t[hi], self.knot_y[hi]);
        if (t1 - t0).abs() < 1e-12 {
            return y0;
        }
        y0 + (t - t0) / (t1 - t0) * (y1 - y0)
    }

    /// True if no knot value is above the one before it (within `eps`).
    pub fn is_non_increasing(&self, eps: f64) -> bool {
        self.knot_y.windows(2).all(|w| w[1] <= w[0] + eps)
    }
}

/// Point-accumulation fitting capability.
///
/// Points must be added in non-decreasing time order; `finish` consumes the
/// accumulated points and returns the fitted continuous function.
pub trait PointFitter {
    fn add_point(&mut self, time: f64, value: f64);
    fn finish(&mut self) -> Result<PiecewiseLinear, AppError>;
}

/// Constructs a fresh `PointFitter` per sequence.
pub trait FitterFactory {
    fn fitter(&self, not_increasing: bool) -> Box<dyn PointFitter>;
}

/// Default fitter configuration: hat-basis least squares over a greedily
/// refined knot grid.
#[derive(Debug, Clone)]
pub struct SegmentedLeastSquares {
    /// Maximum number of knots (segments + 1).
    pub max_knots: usize,
    /// Stop refining once the worst residual is below this fraction of the
    /// observed value range.
    pub rel_tolerance: f64,
}

impl Default for SegmentedLeastSquares {
    fn default() -> Self {
        Self {
            max_knots: 8,
            rel_tolerance: 0.02,
        }
    }
}

impl FitterFactory for SegmentedLeastSquares {
    fn fitter(&self, not_increasing: bool) -> Box<dyn PointFitter> {
        Box::new(SegmentedLsFit {
            times: Vec::new(),
            values: Vec::new(),
            not_increasing,
            max_knots: self.max_knots.max(2),
            rel_tolerance: self.rel_tolerance.max(0.0),
            out_of_order: false,
        })
    }
}

struct SegmentedLsFit {
    times: Vec<f64>,
    values: Vec<f64>,
    not_increasing: bool,
    max_knots: usize,
    rel_tolerance: f64,
    out_of_order: bool,
}

impl PointFitter for SegmentedLsFit {
    fn add_point(&mut self, time: f64, value: f64) {
        if let Some(&last) = self.times.last() {
            if time < last {
                self.out_of_order = true;
            }
        }
        self.times.push(time);
        self.values.push(value);
    }

    fn finish(&mut self) -> Result<PiecewiseLinear, AppError> {
        if self.out_of_order {
            return Err(AppError::new(
                2,
                "Fitter points must be added in non-decreasing time order.",
            ));
        }
        if self.times.is_empty() {
            return Err(AppError::new(3, "No points to fit."));
        }
        if self.times.iter().any(|t| !t.is_finite()) || self.values.iter().any(|v| !v.is_finite()) {
            return Err(AppError::new(2, "Non-finite point passed to the fitter."));
        }

        let t0 = self.times[0];
        let t1 = self.times[self.times.len() - 1];

        // Degenerate time span: every sample shares a time stamp.
        if (t1 - t0).abs() < 1e-12 {
            let level = crate::math::mean(&self.values);
            return PiecewiseLinear::from_knots(vec![t0], vec![level]);
        }

        let y_min = self.values.iter().copied().fold(f64::INFINITY, f64::min);
        let y_max = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let tol_abs = (self.rel_tolerance * (y_max - y_min)).max(1e-9);

        let mut knots = vec![t0, t1];
        let mut heights = self.solve_heights(&knots)?;

        while knots.len() < self.max_knots {
            let (worst_idx, worst_abs) = self.worst_residual(&knots, &heights);
            if worst_abs <= tol_abs {
                break;
            }
            let candidate = self.times[worst_idx];
            if !insert_knot(&mut knots, candidate) {
                break;
            }
            heights = self.solve_heights(&knots)?;
        }

        if self.not_increasing {
            pool_non_increasing(&mut heights);
        }

        PiecewiseLinear::from_knots(knots, heights)
    }
}

impl SegmentedLsFit {
    /// Solve hat-basis least squares for the knot heights.
    fn solve_heights(&self, knots: &[f64]) -> Result<Vec<f64>, AppError> {
        let n = self.times.len();
        let k = knots.len();

        let mut x = DMatrix::<f64>::zeros(n, k);
        for (i, &t) in self.times.iter().enumerate() {
            let (lo, w) = hat_coords(knots, t);
            x[(i, lo)] = 1.0 - w;
            if lo + 1 < k {
                x[(i, lo + 1)] = w;
            }
        }
        let y = DVector::from_row_slice(&self.values);

        match solve_least_squares(&x, &y) {
            Some(beta) => Ok(beta.iter().copied().collect()),
            // Ill-conditioned knot grid: fall back to the straight line through
            // the end points rather than failing the whole life.
            None => {
                let t0 = self.times[0];
                let t1 = self.times[n - 1];
                let slope = (self.values[n - 1] - self.values[0]) / (t1 - t0);
                Ok(knots
                    .iter()
                    .map(|&kt| self.values[0] + slope * (kt - t0))
                    .collect())
            }
        }
    }

    fn worst_residual(&self, knots: &[f64], heights: &[f64]) -> (usize, f64) {
        let fit = PiecewiseLinear {
            knot_t: knots.to_vec(),
            knot_y: heights.to_vec(),
        };
        let mut worst_idx = 0;
        let mut worst_abs = 0.0;
        for (i, (&t, &v)) in self.times.iter().zip(self.values.iter()).enumerate() {
            let r = (v - fit.value_at(t)).abs();
            if r > worst_abs {
                worst_abs = r;
                worst_idx = i;
            }
        }
        (worst_idx, worst_abs)
    }
}

/// Locate `t` on the knot grid: returns the lower knot index and the
/// interpolation weight toward the upper knot.
fn hat_coords(knots: &[f64], t: f64) -> (usize, f64) {
    let k = knots.len();
    if t <= knots[0] {
        return (0, 0.0);
    }
    if t >= knots[k - 1] {
        return (k - 1, 0.0);
    }
    let hi = knots.partition_point(|&x| x <= t);
    let lo = hi - 1;
    let span = knots[hi] - knots[lo];
    if span.abs() < 1e-12 {
        return (lo, 0.0);
    }
    (lo, (t - knots[lo]) / span)
}

/// Insert a candidate knot keeping the grid sorted.
///
/// Rejects candidates that collide with (or sit numerically on top of) an
/// existing knot, which would create zero-width segments.
fn insert_knot(knots: &mut Vec<f64>, candidate: f64) -> bool {
    let pos = knots.partition_point(|&x| x < candidate);
    let too_close = |a: f64, b: f64| (a - b).abs() < 1e-9;
    if pos > 0 && too_close(knots[pos - 1], candidate) {
        return false;
    }
    if pos < knots.len() && too_close(knots[pos], candidate) {
        return false;
    }
    knots.insert(pos, candidate);
    true
}

/// Project knot heights onto the non-increasing cone (pool adjacent
/// violators). Deterministic, order-preserving.
fn pool_non_increasing(heights: &mut [f64]) {
    // Blocks of (pooled value, width); a new element that rises above the
    // last block's level is merged into it by weighted average, cascading.
    let mut blocks: Vec<(f64, usize)> = Vec::with_capacity(heights.len());
    for &h in heights.iter() {
        let mut value = h;
        let mut width = 1usize;
        while let Some(&(prev_value, prev_width)) = blocks.last() {
            if value <= prev_value {
                break;
            }
            value = (prev_value * prev_width as f64 + value * width as f64)
                / (prev_width + width) as f64;
            width += prev_width;
            blocks.pop();
        }
        blocks.push((value, width));
    }

    let mut i = 0;
    for (value, width) in blocks {
        for _ in 0..width {
            heights[i] = value;
            i += 1;
        }
    }
}
