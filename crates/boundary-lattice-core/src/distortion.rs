//! Quantization-error metrics.
//!
//! These measure how far compressed vectors moved from the originals, split by
//! boundary label, plus how well local neighbourhoods survive compression.

use std::collections::{HashMap, HashSet};

use crate::compression::CompressionResult;
use crate::error::{CoreError, CoreResult};
use crate::types::{metric_names, MetricRecord, Vector, VectorSet};
use crate::util::{knn_indices, squared_l2};

/// Squared-error breakdown for one compression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationError {
    /// Mean over every coordinate of every vector.
    pub mse_global: f64,
    /// Same, boundary vectors only; `NaN` when there are none.
    pub mse_boundary: f64,
    /// Same, bulk vectors only; `NaN` when there are none.
    pub mse_bulk: f64,
}

impl QuantizationError {
    /// `mse_boundary - mse_bulk`; `NaN` when either side is not computable.
    pub fn delta_boundary(&self) -> f64 {
        self.mse_boundary - self.mse_bulk
    }
}

fn ensure_paired(original: &[Vector], compressed: &[Vector]) -> CoreResult<()> {
    if original.len() != compressed.len() {
        return Err(CoreError::InvalidParameter(format!(
            "{} original vectors but {} compressed",
            original.len(),
            compressed.len()
        )));
    }
    Ok(())
}

/// Per-coordinate mean squared error over the pairs selected by `keep`.
fn masked_mse(original: &[Vector], compressed: &[Vector], keep: impl Fn(usize) -> bool) -> f64 {
    let mut total = 0.0;
    let mut coords = 0usize;
    for (i, (o, c)) in original.iter().zip(compressed.iter()).enumerate() {
        if keep(i) {
            total += squared_l2(o, c);
            coords += o.len();
        }
    }
    if coords == 0 {
        f64::NAN
    } else {
        total / coords as f64
    }
}

/// Global, boundary and bulk squared error.
///
/// # Errors
/// `InvalidParameter` when the three slices differ in length.
pub fn quantization_error(original: &[Vector], compressed: &[Vector], boundary_mask: &[bool]) -> CoreResult<QuantizationError> {
    ensure_paired(original, compressed)?;
    if boundary_mask.len() != original.len() {
        return Err(CoreError::InvalidParameter(format!(
            "boundary mask has {} entries for {} vectors",
            boundary_mask.len(),
            original.len()
        )));
    }
    Ok(QuantizationError {
        mse_global: masked_mse(original, compressed, |_| true),
        mse_boundary: masked_mse(original, compressed, |i| boundary_mask[i]),
        mse_bulk: masked_mse(original, compressed, |i| !boundary_mask[i]),
    })
}

/// Mean Jaccard overlap between each vector's `k` nearest neighbours in the
/// original and compressed spaces, self excluded.
///
/// Fewer than `k + 1` vectors (or `k == 0`) returns 1.0.
pub fn neighborhood_overlap(original: &[Vector], compressed: &[Vector], k: usize) -> CoreResult<f64> {
    ensure_paired(original, compressed)?;
    let n = original.len();
    if k == 0 || n < k + 1 {
        return Ok(1.0);
    }

    let total: f64 = (0..n)
        .map(|i| {
            let a: HashSet<usize> = knn_indices(original, i, k).into_iter().collect();
            let b: HashSet<usize> = knn_indices(compressed, i, k).into_iter().collect();
            let union = a.union(&b).count();
            if union == 0 {
                1.0
            } else {
                a.intersection(&b).count() as f64 / union as f64
            }
        })
        .sum();
    Ok(total / n as f64)
}

/// Purity of the codewords against known class labels.
///
/// Vectors compressed to the same codeword form one group; purity is the sum
/// over groups of the largest single-label count, over `n`. 1.0 means no
/// codeword mixes classes. `NaN` for empty input.
///
/// # Errors
/// `InvalidParameter` when `labels` and `compressed` differ in length.
pub fn label_purity(compressed: &[Vector], labels: &[usize]) -> CoreResult<f64> {
    if compressed.len() != labels.len() {
        return Err(CoreError::InvalidParameter(format!(
            "{} labels for {} compressed vectors",
            labels.len(),
            compressed.len()
        )));
    }
    if compressed.is_empty() {
        return Ok(f64::NAN);
    }

    let mut counts: HashMap<Vec<u32>, HashMap<usize, usize>> = HashMap::new();
    for (v, &label) in compressed.iter().zip(labels) {
        let key = v.iter().map(|x| x.to_bits()).collect();
        *counts.entry(key).or_default().entry(label).or_insert(0) += 1;
    }

    let majority: usize = counts
        .values()
        .map(|per_label| per_label.values().copied().max().unwrap_or(0))
        .sum();
    Ok(majority as f64 / compressed.len() as f64)
}

/// Lattice Stability Index for error `mse_global` at `step`.
///
/// Pure uniform rounding at step `s` leaves `s^2 / 12` error per coordinate; the
/// index is that reference over itself plus the observed error, in `(0, 1]`.
pub fn lattice_stability_index(step: f64, mse_global: f64) -> f64 {
    let reference = step * step / 12.0;
    let denom = reference + mse_global;
    if !denom.is_finite() || denom <= 0.0 {
        f64::NAN
    } else {
        reference / denom
    }
}

/// Every distortion metric for one compression, keyed by [`metric_names`].
pub fn distortion_metrics(original: &VectorSet, result: &CompressionResult, neighbor_k: usize) -> CoreResult<MetricRecord> {
    let error = quantization_error(original.vectors(), &result.vectors, &result.boundary_mask)?;
    let overlap = neighborhood_overlap(original.vectors(), &result.vectors, neighbor_k)?;
    let meta = &result.metadata;

    Ok(MetricRecord::new()
        .with(metric_names::MSE_GLOBAL, error.mse_global)
        .with(metric_names::MSE_BOUNDARY, error.mse_boundary)
        .with(metric_names::MSE_BULK, error.mse_bulk)
        .with(metric_names::DELTA_BOUNDARY, error.delta_boundary())
        .with(metric_names::NEIGHBORHOOD_OVERLAP, overlap)
        .with(metric_names::LSI, lattice_stability_index(meta.step, error.mse_global))
        .with(metric_names::UNIQUE_CENTROIDS, meta.num_unique_centroids as f64)
        .with(metric_names::BOUNDARY_VECTORS, meta.num_boundary_vectors as f64)
        .with(metric_names::COMPRESSION_TIME, meta.compression_time_seconds))
}
