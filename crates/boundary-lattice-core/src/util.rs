//! Shared vector math and ordering helpers.

use std::cmp::Ordering;

/// Norm guard for cosine similarity.
pub const NORM_EPSILON: f64 = 1e-10;

/// Compute cosine similarity between two vectors.
///
/// Norms are clamped to [`NORM_EPSILON`] so a zero vector scores 0.0 against
/// everything instead of producing NaN. Returns 0.0 for mismatched lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    dot / (norm_a.max(NORM_EPSILON) * norm_b.max(NORM_EPSILON))
}

/// Squared Euclidean distance.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum()
}

/// Euclidean distance.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    squared_l2(a, b).sqrt()
}

/// Index of the centroid nearest to `v`; ties go to the lower index.
///
/// Returns `None` when `centroids` is empty.
pub fn nearest_index(v: &[f32], centroids: &[Vec<f32>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, c) in centroids.iter().enumerate() {
        let d = squared_l2(v, c);
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((idx, d)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Sort comparator for `(index, score)` pairs by score descending.
///
/// Uses the index as tiebreaker for deterministic ordering when scores are equal.
pub fn score_sort_desc(a: &(usize, f64), b: &(usize, f64)) -> Ordering {
    match b.1.partial_cmp(&a.1) {
        Some(Ordering::Equal) | None => a.0.cmp(&b.0),
        Some(ord) => ord,
    }
}

/// Sort comparator for `(index, distance)` pairs by distance ascending, index tiebreak.
pub fn distance_sort_asc(a: &(usize, f64), b: &(usize, f64)) -> Ordering {
    match a.1.partial_cmp(&b.1) {
        Some(Ordering::Equal) | None => a.0.cmp(&b.0),
        Some(ord) => ord,
    }
}

/// Lexicographic comparison of two vectors, treating incomparable values as equal.
pub fn lexicographic_cmp(a: &[f32], b: &[f32]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.partial_cmp(y).unwrap_or(Ordering::Equal) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    a.len().cmp(&b.len())
}

/// Indices of the `k` nearest neighbours of `vectors[query]`, self excluded.
///
/// Ordered by ascending Euclidean distance with index tiebreak.
pub fn knn_indices(vectors: &[Vec<f32>], query: usize, k: usize) -> Vec<usize> {
    let mut dists: Vec<(usize, f64)> = vectors
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != query)
        .map(|(idx, v)| (idx, squared_l2(&vectors[query], v)))
        .collect();
    dists.sort_by(distance_sort_asc);
    dists.truncate(k);
    dists.into_iter().map(|(idx, _)| idx).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 0.0];
        let s = cosine_similarity(&a, &b);
        assert!(s.is_finite());
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_cosine_similarity_different_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_nearest_index_ties_to_lower() {
        let centroids = vec![vec![-1.0], vec![1.0]];
        assert_eq!(nearest_index(&[0.0], &centroids), Some(0));
        assert_eq!(nearest_index(&[0.9], &centroids), Some(1));
        assert_eq!(nearest_index(&[0.0], &[]), None);
    }

    #[test]
    fn test_score_sort_desc() {
        let mut items = vec![(2, 0.5), (0, 0.8), (1, 0.5)];
        items.sort_by(score_sort_desc);
        assert_eq!(items, vec![(0, 0.8), (1, 0.5), (2, 0.5)]);
    }

    #[test]
    fn test_knn_excludes_self() {
        let vectors = vec![vec![0.0], vec![1.0], vec![3.0], vec![0.5]];
        assert_eq!(knn_indices(&vectors, 0, 2), vec![3, 1]);
    }

    #[test]
    fn test_lexicographic_cmp() {
        assert_eq!(lexicographic_cmp(&[0.0, 1.0], &[0.0, 2.0]), Ordering::Less);
        assert_eq!(lexicographic_cmp(&[1.0, 0.0], &[0.0, 2.0]), Ordering::Greater);
        assert_eq!(lexicographic_cmp(&[1.0], &[1.0]), Ordering::Equal);
    }
}
