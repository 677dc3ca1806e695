//! Retrieval Evaluator: Recall@K, MRR, NDCG@K.
//!
//! Two evaluation modes produce the same [`RetrievalMetrics`] shape:
//!
//! - [`evaluate_ground_truth`] ranks a corpus by cosine similarity for each
//!   judged query and scores the ranking against qrels. This is retrieval quality.
//! - [`evaluate_neighbor_preservation`] treats each vector's neighbours in the
//!   original space as pseudo ground truth and scores how well the compressed
//!   space reproduces them. This measures self-consistency of a compression,
//!   not task relevance, and is labelled as such in every record it produces.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{metric_names, MetricRecord, Qrels, Vector, VectorSet};
use crate::util::{cosine_similarity, distance_sort_asc, l2_distance, score_sort_desc};

/// Offset added to original-space distances before inverting them into relevance.
pub const RELEVANCE_EPSILON: f64 = 1e-10;

/// How a [`RetrievalMetrics`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Scored against relevance judgments.
    GroundTruth,
    /// Scored against the uncompressed space's own neighbourhoods.
    NeighborPreservation,
}

/// Rank cutoffs for evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cutoffs {
    /// Cutoffs for Recall@K.
    pub recall_at: Vec<usize>,
    /// Cutoff for NDCG@K. In neighbour-preservation mode it also bounds the MRR window.
    pub ndcg_at: usize,
}

impl Default for Cutoffs {
    fn default() -> Self {
        Self {
            recall_at: vec![10, 100],
            ndcg_at: 10,
        }
    }
}

impl Cutoffs {
    /// Deepest rank any metric inspects.
    pub fn depth(&self) -> usize {
        self.recall_at.iter().copied().chain([self.ndcg_at]).max().unwrap_or(0)
    }

    /// Reject zero cutoffs.
    pub fn validate(&self) -> CoreResult<()> {
        if self.ndcg_at == 0 || self.recall_at.iter().any(|k| *k == 0) {
            return Err(CoreError::InvalidParameter(
                "retrieval cutoffs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Aggregate ranking-quality metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    /// Evaluation mode.
    pub mode: EvaluationMode,
    /// Recall at each cutoff.
    pub recall_at: BTreeMap<usize, f64>,
    /// Mean reciprocal rank.
    pub mrr: f64,
    /// NDCG cutoff.
    pub ndcg_k: usize,
    /// NDCG at `ndcg_k`.
    pub ndcg: f64,
    /// Queries (or anchor vectors) scored.
    pub query_count: usize,
}

impl RetrievalMetrics {
    /// Metrics for a mode with nothing to score; every value is `NaN`.
    fn not_computable(mode: EvaluationMode, cutoffs: &Cutoffs) -> Self {
        Self {
            mode,
            recall_at: cutoffs.recall_at.iter().map(|k| (*k, f64::NAN)).collect(),
            mrr: f64::NAN,
            ndcg_k: cutoffs.ndcg_at,
            ndcg: f64::NAN,
            query_count: 0,
        }
    }

    /// Perfect score, used for degenerate inputs.
    fn perfect(mode: EvaluationMode, cutoffs: &Cutoffs, query_count: usize) -> Self {
        Self {
            mode,
            recall_at: cutoffs.recall_at.iter().map(|k| (*k, 1.0)).collect(),
            mrr: 1.0,
            ndcg_k: cutoffs.ndcg_at,
            ndcg: 1.0,
            query_count,
        }
    }

    /// Recall at `k`, `NaN` if that cutoff was not evaluated.
    pub fn recall(&self, k: usize) -> f64 {
        self.recall_at.get(&k).copied().unwrap_or(f64::NAN)
    }

    /// Flatten into metric-name keys (`recall@10`, `mrr`, `ndcg@10`, ...).
    pub fn to_metric_record(&self) -> MetricRecord {
        let mut record = MetricRecord::new();
        for (k, v) in &self.recall_at {
            record.insert(metric_names::recall_at(*k), *v);
        }
        record.insert(metric_names::MRR, self.mrr);
        record.insert(metric_names::ndcg_at(self.ndcg_k), self.ndcg);
        record
    }
}

/// Recall@K: relevant items in the top `k` over all relevant items.
///
/// 0.0 when there are no relevant items.
pub fn recall_at_k<T: Eq + Hash>(retrieved: &[T], relevant: &HashSet<T>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let hits = retrieved.iter().take(k).filter(|doc| relevant.contains(doc)).count();
    hits as f64 / relevant.len() as f64
}

/// Reciprocal rank of the first relevant item, 0.0 if none is retrieved.
pub fn reciprocal_rank<T: Eq + Hash>(retrieved: &[T], relevant: &HashSet<T>) -> f64 {
    retrieved
        .iter()
        .position(|doc| relevant.contains(doc))
        .map(|pos| 1.0 / (pos + 1) as f64)
        .unwrap_or(0.0)
}

fn discount(rank: usize) -> f64 {
    (rank as f64 + 2.0).log2()
}

/// Binary-relevance NDCG@K.
///
/// The ideal ranking places `min(|relevant|, k)` relevant items first. Returns
/// 0.0 when the ideal DCG is 0.
pub fn ndcg_at_k<T: Eq + Hash>(retrieved: &[T], relevant: &HashSet<T>, k: usize) -> f64 {
    let dcg: f64 = retrieved
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, doc)| relevant.contains(doc))
        .map(|(i, _)| 1.0 / discount(i))
        .sum();
    let idcg: f64 = (0..relevant.len().min(k)).map(|i| 1.0 / discount(i)).sum();

    if idcg <= 0.0 {
        0.0
    } else {
        dcg / idcg
    }
}

/// Graded NDCG@K over a relevance map; missing items score 0.
pub fn graded_ndcg_at_k<T: Eq + Hash>(retrieved: &[T], relevance: &HashMap<T, f64>, k: usize) -> f64 {
    let dcg: f64 = retrieved
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, doc)| relevance.get(doc).copied().unwrap_or(0.0) / discount(i))
        .sum();

    let mut ideal: Vec<f64> = relevance.values().copied().collect();
    ideal.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let idcg: f64 = ideal.iter().take(k).enumerate().map(|(i, rel)| rel / discount(i)).sum();

    if idcg <= 0.0 {
        0.0
    } else {
        dcg / idcg
    }
}

/// Corpus indices ranked by cosine similarity to `query`, best first, truncated to `depth`.
pub fn rank_by_cosine(query: &[f32], corpus: &[Vector], depth: usize) -> Vec<usize> {
    let mut scored: Vec<(usize, f64)> = corpus
        .iter()
        .enumerate()
        .map(|(idx, doc)| (idx, cosine_similarity(query, doc)))
        .collect();
    scored.sort_by(score_sort_desc);
    scored.truncate(depth);
    scored.into_iter().map(|(idx, _)| idx).collect()
}

/// Score rankings of `corpus` for every query in `queries` that has judgments.
///
/// Queries without judgments are skipped. When no query can be scored every
/// metric is `NaN`.
///
/// # Errors
/// * `DimensionMismatch` - queries and corpus differ in dimensionality
/// * `InvalidParameter` - a cutoff is zero
pub fn evaluate_ground_truth(queries: &VectorSet, corpus: &VectorSet, qrels: &Qrels, cutoffs: &Cutoffs) -> CoreResult<RetrievalMetrics> {
    cutoffs.validate()?;
    corpus.ensure_same_dimension(queries)?;

    let depth = cutoffs.depth();
    let rankings: BTreeMap<String, Vec<String>> = queries
        .iter()
        .filter(|(query_id, _)| qrels.relevant(query_id).is_some())
        .map(|(query_id, query)| {
            let retrieved = rank_by_cosine(query, corpus.vectors(), depth)
                .into_iter()
                .map(|idx| corpus.ids()[idx].clone())
                .collect();
            (query_id.to_string(), retrieved)
        })
        .collect();

    evaluate_rankings(&rankings, qrels, cutoffs)
}

/// Score pre-computed rankings against qrels.
///
/// `rankings` maps query id to retrieved passage ids, best first.
pub fn evaluate_rankings(rankings: &BTreeMap<String, Vec<String>>, qrels: &Qrels, cutoffs: &Cutoffs) -> CoreResult<RetrievalMetrics> {
    cutoffs.validate()?;
    let mut recall_sums: BTreeMap<usize, f64> = cutoffs.recall_at.iter().map(|k| (*k, 0.0)).collect();
    let mut rr_sum = 0.0;
    let mut ndcg_sum = 0.0;
    let mut scored = 0usize;

    for (query_id, retrieved) in rankings {
        let Some(relevant) = qrels.relevant(query_id) else {
            continue;
        };
        let relevant: HashSet<&String> = relevant.iter().collect();
        let retrieved: Vec<&String> = retrieved.iter().collect();
        for (k, sum) in recall_sums.iter_mut() {
            *sum += recall_at_k(&retrieved, &relevant, *k);
        }
        rr_sum += reciprocal_rank(&retrieved, &relevant);
        ndcg_sum += ndcg_at_k(&retrieved, &relevant, cutoffs.ndcg_at);
        scored += 1;
    }

    if scored == 0 {
        return Ok(RetrievalMetrics::not_computable(EvaluationMode::GroundTruth, cutoffs));
    }
    let n = scored as f64;
    Ok(RetrievalMetrics {
        mode: EvaluationMode::GroundTruth,
        recall_at: recall_sums.into_iter().map(|(k, s)| (k, s / n)).collect(),
        mrr: rr_sum / n,
        ndcg_k: cutoffs.ndcg_at,
        ndcg: ndcg_sum / n,
        query_count: scored,
    })
}

/// Neighbours of `vectors[anchor]` by ascending Euclidean distance, self excluded.
fn ranked_neighbors(vectors: &[Vector], anchor: usize) -> Vec<(usize, f64)> {
    let mut dists: Vec<(usize, f64)> = vectors
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != anchor)
        .map(|(idx, v)| (idx, l2_distance(&vectors[anchor], v)))
        .collect();
    dists.sort_by(distance_sort_asc);
    dists
}

/// Score how well `compressed` reproduces the neighbourhoods of `original`.
///
/// Per anchor vector, self excluded:
/// - Recall@K: overlap of the two K-nearest sets over K.
/// - MRR: reciprocal rank, in compressed space, of the nearest original-space
///   neighbour; 0 beyond the NDCG cutoff.
/// - NDCG: relevance `1 / (original distance + 1e-10)`.
///
/// With fewer than `K + 1` vectors a cutoff scores a perfect 1.0.
pub fn evaluate_neighbor_preservation(original: &[Vector], compressed: &[Vector], cutoffs: &Cutoffs) -> CoreResult<RetrievalMetrics> {
    cutoffs.validate()?;
    if original.len() != compressed.len() {
        return Err(CoreError::InvalidParameter(format!(
            "{} original vectors but {} compressed",
            original.len(),
            compressed.len()
        )));
    }

    let n = original.len();
    let mode = EvaluationMode::NeighborPreservation;
    if n < 2 {
        return Ok(RetrievalMetrics::perfect(mode, cutoffs, n));
    }

    let window = cutoffs.ndcg_at;
    let mut recall_sums: BTreeMap<usize, f64> = cutoffs.recall_at.iter().map(|k| (*k, 0.0)).collect();
    let mut rr_sum = 0.0;
    let mut ndcg_sum = 0.0;

    for anchor in 0..n {
        let orig = ranked_neighbors(original, anchor);
        let comp: Vec<usize> = ranked_neighbors(compressed, anchor)
            .into_iter()
            .map(|(idx, _)| idx)
            .collect();

        for (k, sum) in recall_sums.iter_mut() {
            if n < *k + 1 {
                *sum += 1.0;
                continue;
            }
            let truth: BTreeSet<usize> = orig.iter().take(*k).map(|(idx, _)| *idx).collect();
            let hits = comp.iter().take(*k).filter(|idx| truth.contains(idx)).count();
            *sum += hits as f64 / *k as f64;
        }

        let nearest = orig[0].0;
        rr_sum += comp
            .iter()
            .take(window)
            .position(|idx| *idx == nearest)
            .map(|pos| 1.0 / (pos + 1) as f64)
            .unwrap_or(0.0);

        if n < window + 1 {
            ndcg_sum += 1.0;
        } else {
            let relevance: HashMap<usize, f64> = orig
                .iter()
                .map(|(idx, d)| (*idx, 1.0 / (d + RELEVANCE_EPSILON)))
                .collect();
            ndcg_sum += graded_ndcg_at_k(&comp, &relevance, window);
        }
    }

    let count = n as f64;
    Ok(RetrievalMetrics {
        mode,
        recall_at: recall_sums.into_iter().map(|(k, s)| (k, s / count)).collect(),
        mrr: rr_sum / count,
        ndcg_k: window,
        ndcg: ndcg_sum / count,
        query_count: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&'static str]) -> HashSet<&'static str> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_recall_at_k() {
        let retrieved = vec![1, 2, 3, 4, 5];
        let relevant: HashSet<i32> = [1, 3, 5, 7, 9].into_iter().collect();
        assert!((recall_at_k(&retrieved, &relevant, 5) - 0.6).abs() < 1e-12);
        assert_eq!(recall_at_k(&retrieved, &HashSet::new(), 5), 0.0);
    }

    #[test]
    fn test_recall_monotonic_in_k() {
        let retrieved = vec!["a", "x", "b", "y", "c"];
        let relevant = set(&["a", "b", "c", "d"]);
        let mut last = 0.0;
        for k in 0..8 {
            let r = recall_at_k(&retrieved, &relevant, k);
            assert!(r >= last);
            assert!((0.0..=1.0).contains(&r));
            last = r;
        }
    }

    #[test]
    fn test_reciprocal_rank() {
        let retrieved = vec![2, 1, 3, 4, 5];
        let relevant: HashSet<i32> = [1, 3, 5].into_iter().collect();
        assert!((reciprocal_rank(&retrieved, &relevant) - 0.5).abs() < 1e-12);
        assert_eq!(reciprocal_rank(&retrieved, &HashSet::from([9])), 0.0);
    }

    #[test]
    fn test_binary_ndcg_known_value() {
        let retrieved = vec!["p3", "p1", "p2"];
        let relevant = set(&["p1", "p2"]);
        let dcg = 1.0 / 3f64.log2() + 1.0 / 4f64.log2();
        let idcg = 1.0 + 1.0 / 3f64.log2();
        let ndcg = ndcg_at_k(&retrieved, &relevant, 10);
        assert!((ndcg - dcg / idcg).abs() < 1e-12);
        assert!((ndcg - 0.6934).abs() < 1e-3);
    }

    #[test]
    fn test_ndcg_perfect_and_empty() {
        let relevant = set(&["a", "b"]);
        assert!((ndcg_at_k(&["a", "b", "c"], &relevant, 10) - 1.0).abs() < 1e-12);
        assert_eq!(ndcg_at_k(&["a"], &HashSet::new(), 10), 0.0);
    }

    #[test]
    fn test_ground_truth_cosine_ranking() {
        let corpus = VectorSet::new(vec![
            ("p1".to_string(), vec![1.0, 0.0]),
            ("p2".to_string(), vec![0.0, 1.0]),
            ("p3".to_string(), vec![0.7, 0.7]),
        ])
        .unwrap();
        let queries = VectorSet::new(vec![
            ("q1".to_string(), vec![1.0, 0.1]),
            ("q_unjudged".to_string(), vec![0.0, 1.0]),
        ])
        .unwrap();
        let qrels = Qrels::from_triples(vec![("q1", "p1", 1)]);

        let metrics = evaluate_ground_truth(&queries, &corpus, &qrels, &Cutoffs::default()).unwrap();
        assert_eq!(metrics.query_count, 1);
        assert_eq!(metrics.mrr, 1.0);
        assert_eq!(metrics.recall(10), 1.0);
        assert_eq!(metrics.ndcg, 1.0);
    }

    #[test]
    fn test_ground_truth_matches_explicit_rankings() {
        let corpus = VectorSet::new(vec![
            ("p1".to_string(), vec![1.0, 0.0]),
            ("p2".to_string(), vec![0.0, 1.0]),
            ("p3".to_string(), vec![0.7, 0.7]),
        ])
        .unwrap();
        let queries = VectorSet::new(vec![("q1".to_string(), vec![0.7, 0.75])]).unwrap();
        let qrels = Qrels::from_triples(vec![("q1", "p1", 1), ("q1", "p2", 1)]);
        let cutoffs = Cutoffs::default();

        let mut rankings = BTreeMap::new();
        rankings.insert(
            "q1".to_string(),
            vec!["p3".to_string(), "p2".to_string(), "p1".to_string()],
        );
        let expected = evaluate_rankings(&rankings, &qrels, &cutoffs).unwrap();
        let metrics = evaluate_ground_truth(&queries, &corpus, &qrels, &cutoffs).unwrap();
        assert_eq!(metrics, expected);
        assert_eq!(metrics.mrr, 0.5);
    }

    #[test]
    fn test_ground_truth_dimension_mismatch() {
        let corpus = VectorSet::from_vectors(vec![vec![1.0, 0.0]]).unwrap();
        let queries = VectorSet::from_vectors(vec![vec![1.0]]).unwrap();
        let err = evaluate_ground_truth(&queries, &corpus, &Qrels::new(), &Cutoffs::default()).unwrap_err();
        assert!(matches!(err, CoreError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_ground_truth_without_judged_queries_is_nan() {
        let corpus = VectorSet::from_vectors(vec![vec![1.0, 0.0]]).unwrap();
        let metrics = evaluate_ground_truth(&corpus, &corpus, &Qrels::new(), &Cutoffs::default()).unwrap();
        assert!(metrics.mrr.is_nan());
        assert_eq!(metrics.query_count, 0);
    }

    #[test]
    fn test_neighbor_preservation_identity() {
        let vectors: Vec<Vector> = (0..15).map(|i| vec![i as f32, (i % 4) as f32]).collect();
        let cutoffs = Cutoffs { recall_at: vec![3], ndcg_at: 3 };
        let metrics = evaluate_neighbor_preservation(&vectors, &vectors, &cutoffs).unwrap();
        assert_eq!(metrics.mode, EvaluationMode::NeighborPreservation);
        assert!((metrics.recall(3) - 1.0).abs() < 1e-12);
        assert!((metrics.mrr - 1.0).abs() < 1e-12);
        assert!((metrics.ndcg - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_neighbor_preservation_degenerate_is_perfect() {
        let original = vec![vec![0.0], vec![1.0], vec![2.0]];
        let compressed = vec![vec![0.0], vec![0.0], vec![0.0]];
        let metrics = evaluate_neighbor_preservation(&original, &compressed, &Cutoffs::default()).unwrap();
        assert_eq!(metrics.recall(10), 1.0);
        assert_eq!(metrics.recall(100), 1.0);
        assert_eq!(metrics.ndcg, 1.0);
    }

    #[test]
    fn test_neighbor_preservation_bounds() {
        let original: Vec<Vector> = (0..30).map(|i| vec![(i as f32 * 0.37).sin(), (i as f32 * 0.11).cos()]).collect();
        let compressed: Vec<Vector> = original.iter().map(|v| vec![v[0].round(), v[1].round()]).collect();
        let cutoffs = Cutoffs { recall_at: vec![5, 10], ndcg_at: 10 };
        let metrics = evaluate_neighbor_preservation(&original, &compressed, &cutoffs).unwrap();
        for value in [metrics.recall(5), metrics.recall(10), metrics.mrr, metrics.ndcg] {
            assert!((0.0..=1.0).contains(&value), "{value}");
        }
    }

    #[test]
    fn test_metric_record_keys() {
        let metrics = RetrievalMetrics::perfect(EvaluationMode::GroundTruth, &Cutoffs::default(), 1);
        let record = metrics.to_metric_record();
        assert_eq!(record.get(metric_names::RECALL_10), Some(1.0));
        assert_eq!(record.get(metric_names::RECALL_100), Some(1.0));
        assert_eq!(record.get(metric_names::NDCG_10), Some(1.0));
        assert_eq!(record.get(metric_names::MRR), Some(1.0));
    }
}
