//! Cluster Engine: seeded Lloyd's k-means.
//!
//! Deterministic for a fixed seed and input order. When the input holds no
//! more vectors than requested clusters, every input becomes its own centroid
//! and no iteration runs; downstream code relies on this to avoid empty
//! clusters on tiny sets.

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{Vector, VectorSet};
use crate::util::{nearest_index, squared_l2};

/// Default number of Lloyd iterations.
pub const DEFAULT_ITERATIONS: usize = 10;

/// Centroid initialization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStrategy {
    /// k distinct input vectors drawn uniformly.
    #[default]
    RandomSubsample,
    /// k-means++ seeding, sampling proportional to squared distance.
    KMeansPlusPlus,
}

/// Parameters for [`cluster`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Requested number of clusters.
    pub k: usize,
    /// RNG seed for initialization.
    pub seed: u64,
    /// Maximum Lloyd iterations; stops earlier when assignments settle.
    pub iterations: usize,
    /// Initialization strategy.
    pub init: InitStrategy,
}

impl ClusterParams {
    /// Parameters with default iteration count and initialization.
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            iterations: DEFAULT_ITERATIONS,
            init: InitStrategy::default(),
        }
    }

    /// Override the iteration cap.
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Override the initialization strategy.
    #[must_use]
    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }
}

/// Compute up to `params.k` centroids for `set`.
///
/// # Errors
/// `InvalidParameter` when `k == 0`.
pub fn cluster(set: &VectorSet, params: &ClusterParams) -> CoreResult<Vec<Vector>> {
    cluster_vectors(set.vectors(), params)
}

/// [`cluster`] over a bare slice of vectors.
pub fn cluster_vectors(vectors: &[Vector], params: &ClusterParams) -> CoreResult<Vec<Vector>> {
    if params.k == 0 {
        return Err(CoreError::InvalidParameter(
            "cluster count k must be positive".to_string(),
        ));
    }
    if vectors.len() <= params.k {
        return Ok(vectors.to_vec());
    }

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut centroids = match params.init {
        InitStrategy::RandomSubsample => random_subsample(vectors, params.k, &mut rng),
        InitStrategy::KMeansPlusPlus => kmeans_plus_plus(vectors, params.k, &mut rng),
    };

    let mut previous: Option<Vec<usize>> = None;
    for _ in 0..params.iterations {
        let assignments = assign(vectors, &centroids);
        if previous.as_ref() == Some(&assignments) {
            break;
        }
        centroids = update_centroids(vectors, &assignments, &centroids);
        previous = Some(assignments);
    }

    Ok(centroids)
}

/// Nearest-centroid index for every vector.
pub fn assign(vectors: &[Vector], centroids: &[Vector]) -> Vec<usize> {
    vectors
        .iter()
        .map(|v| nearest_index(v, centroids).unwrap_or(0))
        .collect()
}

fn random_subsample(vectors: &[Vector], k: usize, rng: &mut ChaCha8Rng) -> Vec<Vector> {
    index::sample(rng, vectors.len(), k)
        .into_iter()
        .map(|i| vectors[i].clone())
        .collect()
}

fn kmeans_plus_plus(vectors: &[Vector], k: usize, rng: &mut ChaCha8Rng) -> Vec<Vector> {
    let n = vectors.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(vectors[rng.gen_range(0..n)].clone());

    // Squared distance from each vector to its nearest chosen centroid.
    let mut min_dist: Vec<f64> = vectors.iter().map(|v| squared_l2(v, &centroids[0])).collect();

    while centroids.len() < k {
        let total: f64 = min_dist.iter().sum();
        let chosen = if total > 0.0 {
            let threshold = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = n - 1;
            for (i, &d) in min_dist.iter().enumerate() {
                cumulative += d;
                if cumulative >= threshold && d > 0.0 {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            // Every remaining vector coincides with a centroid.
            rng.gen_range(0..n)
        };

        let next = vectors[chosen].clone();
        for (d, v) in min_dist.iter_mut().zip(vectors.iter()) {
            *d = d.min(squared_l2(v, &next));
        }
        centroids.push(next);
    }
    centroids
}

fn update_centroids(vectors: &[Vector], assignments: &[usize], previous: &[Vector]) -> Vec<Vector> {
    let dim = previous.first().map(Vec::len).unwrap_or(0);
    let mut sums = vec![vec![0.0f64; dim]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (v, &c) in vectors.iter().zip(assignments.iter()) {
        counts[c] += 1;
        for (s, &x) in sums[c].iter_mut().zip(v.iter()) {
            *s += x as f64;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous.iter())
        .map(|((sum, count), old)| {
            if count == 0 {
                old.clone()
            } else {
                sum.into_iter().map(|s| (s / count as f64) as f32).collect()
            }
        })
        .collect()
}
