//! NaN-aware descriptive statistics.
//!
//! `NaN` marks "not computable"; every function here skips it rather than
//! letting it poison the aggregate. An input with no finite values yields `NaN`.

use std::cmp::Ordering;

use crate::error::{CoreError, CoreResult};

fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite())
}

/// Mean of the finite values.
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = finite(values).fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population standard deviation of the finite values.
pub fn nan_std(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    let (sq, count) = finite(values).fold((0.0, 0usize), |(s, c), v| (s + (v - mean).powi(2), c + 1));
    (sq / count as f64).sqrt()
}

/// Minimum of the finite values.
pub fn nan_min(values: &[f64]) -> f64 {
    finite(values).fold(f64::NAN, |acc, v| if acc.is_nan() || v < acc { v } else { acc })
}

/// Maximum of the finite values.
pub fn nan_max(values: &[f64]) -> f64 {
    finite(values).fold(f64::NAN, |acc, v| if acc.is_nan() || v > acc { v } else { acc })
}

/// Median of the finite values.
pub fn nan_median(values: &[f64]) -> f64 {
    percentile_sorted(&sorted_finite(values), 50.0)
}

/// Count of finite values.
pub fn finite_count(values: &[f64]) -> usize {
    finite(values).count()
}

/// `q`-th percentile (0..=100) of the finite values using linear interpolation
/// between closest ranks.
///
/// # Errors
/// `InvalidParameter` when `q` is not finite or outside `[0, 100]`.
pub fn percentile(values: &[f64], q: f64) -> CoreResult<f64> {
    validate_percentile(q)?;
    Ok(percentile_sorted(&sorted_finite(values), q))
}

/// Reject percentiles outside `[0, 100]`.
pub fn validate_percentile(q: f64) -> CoreResult<()> {
    if q.is_finite() && (0.0..=100.0).contains(&q) {
        Ok(())
    } else {
        Err(CoreError::InvalidParameter(format!(
            "percentile must lie in [0, 100], got {q}"
        )))
    }
}

fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = finite(values).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = q / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// `steps` evenly spaced values from `min` to `max`, both inclusive.
///
/// One step yields `[min]`.
pub fn linspace(min: f64, max: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![min],
        n => {
            let delta = (max - min) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { max } else { min + delta * i as f64 })
                .collect()
        }
    }
}

/// Integer grid: [`linspace`] truncated toward zero, consecutive duplicates removed.
pub fn linspace_int(min: usize, max: usize, steps: usize) -> Vec<usize> {
    let mut out: Vec<usize> = linspace(min as f64, max as f64, steps)
        .into_iter()
        .map(|v| v.trunc() as usize)
        .collect();
    out.dedup();
    out
}
