//! Lattice Quantizer.
//!
//! Snaps coordinates to the nearest multiple of a step on an axis-aligned grid.
//! Halfway cases round to the even multiple (`f64::round_ties_even`), so
//! `0.5 * step` maps to `0` and `1.5 * step` maps to `2 * step`.

use crate::error::{CoreError, CoreResult};
use crate::types::Vector;
use crate::util::lexicographic_cmp;

/// Default per-coordinate tolerance under which two lattice points are treated as one.
pub const DEFAULT_DEDUP_TOLERANCE: f64 = 1e-6;

fn validate_step(step: f64) -> CoreResult<()> {
    if step.is_finite() && step > 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidParameter(format!(
            "lattice step must be positive and finite, got {step}"
        )))
    }
}

fn snap(x: f32, step: f64) -> f32 {
    ((x as f64 / step).round_ties_even() * step) as f32
}

/// Quantize one vector at `step`.
///
/// Idempotent: quantizing an already quantized vector returns it unchanged.
///
/// # Errors
/// `InvalidParameter` when `step <= 0` or is not finite.
pub fn quantize(vector: &[f32], step: f64) -> CoreResult<Vector> {
    validate_step(step)?;
    Ok(vector.iter().map(|&x| snap(x, step)).collect())
}

/// Quantize every vector at `step`.
pub fn quantize_all(vectors: &[Vector], step: f64) -> CoreResult<Vec<Vector>> {
    validate_step(step)?;
    Ok(vectors
        .iter()
        .map(|v| v.iter().map(|&x| snap(x, step)).collect())
        .collect())
}

/// Collapse vectors that agree on every coordinate within `tolerance`.
///
/// The result is sorted lexicographically. When several inputs collapse, the
/// lexicographically smallest is kept.
pub fn deduplicate(vectors: &[Vector], tolerance: f64) -> Vec<Vector> {
    let mut sorted: Vec<&Vector> = vectors.iter().collect();
    sorted.sort_by(|a, b| lexicographic_cmp(a, b));

    let mut kept: Vec<Vector> = Vec::with_capacity(sorted.len());
    for v in sorted {
        let duplicate = kept.iter().any(|k| within_tolerance(k, v, tolerance));
        if !duplicate {
            kept.push(v.clone());
        }
    }
    kept
}

/// Quantize `vectors` at `step`, then [`deduplicate`] the result.
pub fn quantize_unique(vectors: &[Vector], step: f64, tolerance: f64) -> CoreResult<Vec<Vector>> {
    Ok(deduplicate(&quantize_all(vectors, step)?, tolerance))
}

/// Replace each vector by the first `codebook` entry within `tolerance` of it.
///
/// Vectors with no such entry are returned unchanged.
pub fn canonicalize(vectors: &[Vector], codebook: &[Vector], tolerance: f64) -> Vec<Vector> {
    vectors
        .iter()
        .map(|v| {
            codebook
                .iter()
                .find(|c| within_tolerance(c, v, tolerance))
                .unwrap_or(v)
                .clone()
        })
        .collect()
}

fn within_tolerance(a: &[f32], b: &[f32], tolerance: f64) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b.iter())
            .all(|(x, y)| ((*x as f64) - (*y as f64)).abs() <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_nearest_multiple() {
        let q = quantize(&[0.26, -0.74, 1.0], 0.5).unwrap();
        assert_eq!(q, vec![0.5, -0.5, 1.0]);
    }

    #[test]
    fn test_quantize_ties_to_even() {
        let q = quantize(&[0.25, 0.75, -0.25], 0.5).unwrap();
        assert_eq!(q, vec![0.0, 1.0, -0.0]);
    }

    #[test]
    fn test_quantize_idempotent() {
        for step in [0.01, 0.1, 0.3, 0.5, 1.7] {
            let v = vec![0.123_f32, -3.456, 7.89, 0.0, 1e-3];
            let once = quantize(&v, step).unwrap();
            let twice = quantize(&once, step).unwrap();
            assert_eq!(once, twice, "step {step}");
        }
    }

    #[test]
    fn test_quantize_rejects_non_positive_step() {
        assert!(matches!(quantize(&[1.0], 0.0), Err(CoreError::InvalidParameter(_))));
        assert!(matches!(quantize(&[1.0], -0.1), Err(CoreError::InvalidParameter(_))));
        assert!(quantize_all(&[vec![1.0]], f64::NAN).is_err());
    }

    #[test]
    fn test_deduplicate_sorted_and_unique() {
        let input = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0 + 1e-9],
            vec![-1.0, 5.0],
        ];
        let out = deduplicate(&input, DEFAULT_DEDUP_TOLERANCE);
        assert_eq!(out, vec![vec![-1.0, 5.0], vec![0.0, 1.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_canonicalize_maps_to_codebook() {
        let codebook = vec![vec![0.0, 1.0]];
        let out = canonicalize(&[vec![0.0, 1.0 + 1e-8], vec![5.0, 5.0]], &codebook, DEFAULT_DEDUP_TOLERANCE);
        assert_eq!(out, vec![vec![0.0, 1.0], vec![5.0, 5.0]]);
    }

    #[test]
    fn test_quantize_unique_collapses_same_cell() {
        let centroids = vec![vec![0.11, 0.21], vec![0.09, 0.19], vec![0.5, 0.5]];
        let out = quantize_unique(&centroids, 0.1, DEFAULT_DEDUP_TOLERANCE).unwrap();
        assert_eq!(out.len(), 2);
    }
}
