//! Boundary Classifier.
//!
//! A vector's ambiguity is `d2 - d1`, the gap between its distances to the two
//! nearest centroids. Vectors whose ambiguity falls at or below the chosen
//! percentile of the set's ambiguity scores are labelled boundary.

use crate::error::CoreResult;
use crate::stats;
use crate::types::{Vector, VectorSet};
use crate::util::l2_distance;

/// Default ambiguity percentile for boundary labelling.
pub const DEFAULT_PERCENTILE: f64 = 10.0;

/// Ambiguity score of every vector against `centroids`.
///
/// With a single centroid `d2 = d1` and every score is 0. With no centroids
/// every score is `NaN`.
pub fn ambiguity_scores(vectors: &[Vector], centroids: &[Vector]) -> Vec<f64> {
    vectors
        .iter()
        .map(|v| {
            let mut d1 = f64::INFINITY;
            let mut d2 = f64::INFINITY;
            for c in centroids {
                let d = l2_distance(v, c);
                if d < d1 {
                    d2 = d1;
                    d1 = d;
                } else if d < d2 {
                    d2 = d;
                }
            }
            match centroids.len() {
                0 => f64::NAN,
                1 => 0.0,
                _ => d2 - d1,
            }
        })
        .collect()
}

/// Boundary mask for `set` (true = boundary).
///
/// * Fewer than two centroids: no vector is boundary.
/// * `percentile == 0`: no vector is boundary.
/// * `percentile == 100`: every vector is boundary.
///
/// # Errors
/// `InvalidParameter` when `percentile` lies outside `[0, 100]`.
pub fn classify(set: &VectorSet, centroids: &[Vector], percentile: f64) -> CoreResult<Vec<bool>> {
    classify_vectors(set.vectors(), centroids, percentile)
}

/// [`classify`] over a bare slice of vectors.
pub fn classify_vectors(vectors: &[Vector], centroids: &[Vector], percentile: f64) -> CoreResult<Vec<bool>> {
    stats::validate_percentile(percentile)?;
    if centroids.len() < 2 || percentile == 0.0 || vectors.is_empty() {
        return Ok(vec![false; vectors.len()]);
    }

    let scores = ambiguity_scores(vectors, centroids);
    let threshold = stats::percentile(&scores, percentile)?;
    Ok(scores.into_iter().map(|s| s <= threshold).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> (Vec<Vector>, Vec<Vector>) {
        let vectors = (0..11).map(|i| vec![i as f32]).collect();
        let centroids = vec![vec![0.0], vec![10.0]];
        (vectors, centroids)
    }

    #[test]
    fn test_ambiguity_lowest_at_midpoint() {
        let (vectors, centroids) = line();
        let scores = ambiguity_scores(&vectors, &centroids);
        assert_eq!(scores[5], 0.0);
        assert_eq!(scores[0], 10.0);
        assert_eq!(scores[10], 10.0);
    }

    #[test]
    fn test_classify_marks_low_ambiguity() {
        let (vectors, centroids) = line();
        let mask = classify_vectors(&vectors, &centroids, 10.0).unwrap();
        assert!(mask[5]);
        assert!(!mask[0]);
        assert!(!mask[10]);
    }

    #[test]
    fn test_percentile_extremes() {
        let (vectors, centroids) = line();
        let none = classify_vectors(&vectors, &centroids, 0.0).unwrap();
        assert!(none.iter().all(|b| !b));
        let all = classify_vectors(&vectors, &centroids, 100.0).unwrap();
        assert!(all.iter().all(|b| *b));
    }

    #[test]
    fn test_monotonic_in_percentile() {
        let (vectors, centroids) = line();
        let mut last = 0;
        for p in [0.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0] {
            let count = classify_vectors(&vectors, &centroids, p)
                .unwrap()
                .iter()
                .filter(|b| **b)
                .count();
            assert!(count >= last, "percentile {p}");
            last = count;
        }
    }

    #[test]
    fn test_single_centroid_has_no_boundary() {
        let (vectors, _) = line();
        let mask = classify_vectors(&vectors, &[vec![5.0]], 50.0).unwrap();
        assert!(mask.iter().all(|b| !b));
    }

    #[test]
    fn test_invalid_percentile() {
        let (vectors, centroids) = line();
        assert!(classify_vectors(&vectors, &centroids, 101.0).is_err());
    }
}
