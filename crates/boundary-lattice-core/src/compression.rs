//! Compression Strategies.
//!
//! Both strategies cluster the input once, snap the centroids to a lattice and
//! replace every input vector with its nearest snapped centroid:
//!
//! - [`Strategy::Baseline`] ("lattice-hybrid"): one lattice at `step` for every vector.
//! - [`Strategy::BoundaryAware`]: boundary vectors use a strictly finer lattice
//!   at `step * fine_step_ratio`; bulk vectors use `step`.
//!
//! A compressed vector is always bitwise a member of the result's
//! [`codebook`](CompressionResult::codebook).

use std::fmt;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::boundary::{self, DEFAULT_PERCENTILE};
use crate::clustering::{self, ClusterParams, InitStrategy, DEFAULT_ITERATIONS};
use crate::error::{CoreError, CoreResult};
use crate::lattice::{self, DEFAULT_DEDUP_TOLERANCE};
use crate::stats;
use crate::types::{Vector, VectorSet};
use crate::util::nearest_index;

/// Default ratio between the boundary lattice step and the bulk step.
pub const DEFAULT_FINE_STEP_RATIO: f64 = 0.5;

/// Which compression to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Uniform lattice for every vector.
    Baseline,
    /// Finer lattice for boundary vectors.
    BoundaryAware,
}

impl Strategy {
    /// Both strategies, baseline first.
    pub const ALL: [Strategy; 2] = [Strategy::Baseline, Strategy::BoundaryAware];

    /// Stable short name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Baseline => "baseline",
            Strategy::BoundaryAware => "boundary_aware",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How centroids are materialised before lattice snapping.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CentroidBackend {
    /// Use the k-means centroids as computed.
    #[default]
    Exact,
    /// Add seeded Gaussian noise with `sigma = noise_fraction * std(centroid)`,
    /// emulating an approximate index's quantization noise.
    Perturbed {
        /// Noise scale relative to each centroid's coordinate spread.
        noise_fraction: f64,
    },
}

impl CentroidBackend {
    fn validate(&self) -> CoreResult<()> {
        match self {
            CentroidBackend::Exact => Ok(()),
            CentroidBackend::Perturbed { noise_fraction } => {
                if noise_fraction.is_finite() && *noise_fraction >= 0.0 {
                    Ok(())
                } else {
                    Err(CoreError::InvalidParameter(format!(
                        "noise_fraction must be non-negative, got {noise_fraction}"
                    )))
                }
            }
        }
    }

    fn apply(&self, centroids: Vec<Vector>, seed: u64) -> CoreResult<Vec<Vector>> {
        let noise_fraction = match self {
            CentroidBackend::Exact => return Ok(centroids),
            CentroidBackend::Perturbed { noise_fraction } if *noise_fraction == 0.0 => {
                return Ok(centroids)
            }
            CentroidBackend::Perturbed { noise_fraction } => *noise_fraction,
        };

        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(0x9E37_79B9));
        centroids
            .into_iter()
            .map(|c| {
                let coords: Vec<f64> = c.iter().map(|x| *x as f64).collect();
                let spread = stats::nan_std(&coords);
                let sigma = if spread > 0.0 {
                    noise_fraction * spread
                } else {
                    noise_fraction
                };
                let normal = Normal::new(0.0, sigma)
                    .map_err(|e| CoreError::InvalidParameter(format!("noise sigma {sigma}: {e}")))?;
                Ok(c.iter()
                    .map(|x| (*x as f64 + normal.sample(&mut rng)) as f32)
                    .collect())
            })
            .collect()
    }
}

/// Explicit parameters for one compression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionParams {
    /// Bulk lattice step.
    pub step: f64,
    /// Requested cluster count.
    pub k: usize,
    /// Seed for clustering and centroid perturbation.
    pub seed: u64,
    /// Ambiguity percentile at or below which a vector is boundary.
    pub boundary_percentile: f64,
    /// Boundary lattice step as a fraction of `step`, in `(0, 1)`.
    pub fine_step_ratio: f64,
    /// Lloyd iteration cap.
    pub cluster_iterations: usize,
    /// k-means initialization.
    pub init: InitStrategy,
    /// Centroid backend.
    pub backend: CentroidBackend,
    /// Per-coordinate tolerance for centroid deduplication.
    pub dedup_tolerance: f64,
}

impl CompressionParams {
    /// Parameters with default percentile, fine-step ratio, iterations and backend.
    pub fn new(step: f64, k: usize, seed: u64) -> Self {
        Self {
            step,
            k,
            seed,
            boundary_percentile: DEFAULT_PERCENTILE,
            fine_step_ratio: DEFAULT_FINE_STEP_RATIO,
            cluster_iterations: DEFAULT_ITERATIONS,
            init: InitStrategy::default(),
            backend: CentroidBackend::default(),
            dedup_tolerance: DEFAULT_DEDUP_TOLERANCE,
        }
    }

    /// Override the boundary percentile.
    #[must_use]
    pub fn with_percentile(mut self, percentile: f64) -> Self {
        self.boundary_percentile = percentile;
        self
    }

    /// Override the centroid backend.
    #[must_use]
    pub fn with_backend(mut self, backend: CentroidBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Boundary lattice step.
    pub fn boundary_step(&self) -> f64 {
        self.step * self.fine_step_ratio
    }

    /// Clustering parameters derived from these.
    pub fn cluster_params(&self) -> ClusterParams {
        ClusterParams::new(self.k, self.seed)
            .with_iterations(self.cluster_iterations)
            .with_init(self.init)
    }

    /// Check every field.
    ///
    /// # Errors
    /// `InvalidParameter` for a non-positive step or k, a percentile outside
    /// `[0, 100]`, a fine-step ratio outside `(0, 1)`, a negative tolerance,
    /// or an invalid backend.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(CoreError::InvalidParameter(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        if self.k == 0 {
            return Err(CoreError::InvalidParameter("k must be positive".to_string()));
        }
        stats::validate_percentile(self.boundary_percentile)?;
        if !(self.fine_step_ratio > 0.0 && self.fine_step_ratio < 1.0) {
            return Err(CoreError::InvalidParameter(format!(
                "fine_step_ratio must lie in (0, 1), got {}",
                self.fine_step_ratio
            )));
        }
        if !(self.dedup_tolerance.is_finite() && self.dedup_tolerance >= 0.0) {
            return Err(CoreError::InvalidParameter(format!(
                "dedup_tolerance must be non-negative, got {}",
                self.dedup_tolerance
            )));
        }
        self.backend.validate()
    }
}

/// Metadata describing one compression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionMetadata {
    /// Strategy that produced the result.
    pub strategy: Strategy,
    /// Bulk lattice step.
    pub step: f64,
    /// Requested cluster count.
    pub k: usize,
    /// Seed used.
    pub seed: u64,
    /// Boundary lattice step; `None` for the baseline.
    pub boundary_step: Option<f64>,
    /// Vectors labelled boundary.
    pub num_boundary_vectors: usize,
    /// Centroids returned by the cluster engine.
    pub num_centroids: usize,
    /// Unique lattice centroids after deduplication (union of both lattices
    /// for boundary-aware).
    pub num_unique_centroids: usize,
    /// Wall-clock seconds spent clustering, snapping and assigning.
    pub compression_time_seconds: f64,
}

/// Output of [`compress`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    /// One compressed vector per input, in input order.
    pub vectors: Vec<Vector>,
    /// Boundary label per input. For the baseline this is computed after
    /// timing stops and is used only for error reporting.
    pub boundary_mask: Vec<bool>,
    /// Deduplicated lattice centroids every compressed vector is drawn from.
    pub codebook: Vec<Vector>,
    /// Summary metadata.
    pub metadata: CompressionMetadata,
}

impl CompressionResult {
    /// Number of compressed vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the result is empty.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Compress `set` with `strategy`.
///
/// An empty `set` yields an empty result.
///
/// # Errors
/// `InvalidParameter` when `params` fail [`CompressionParams::validate`].
pub fn compress(strategy: Strategy, set: &VectorSet, params: &CompressionParams) -> CoreResult<CompressionResult> {
    params.validate()?;

    let boundary_step = match strategy {
        Strategy::Baseline => None,
        Strategy::BoundaryAware => Some(params.boundary_step()),
    };

    if set.is_empty() {
        return Ok(CompressionResult {
            vectors: Vec::new(),
            boundary_mask: Vec::new(),
            codebook: Vec::new(),
            metadata: CompressionMetadata {
                strategy,
                step: params.step,
                k: params.k,
                seed: params.seed,
                boundary_step,
                num_boundary_vectors: 0,
                num_centroids: 0,
                num_unique_centroids: 0,
                compression_time_seconds: 0.0,
            },
        });
    }

    let vectors = set.vectors();
    let start = Instant::now();

    let centroids = clustering::cluster(set, &params.cluster_params())?;
    let materialised = params.backend.apply(centroids.clone(), params.seed)?;

    let (compressed, boundary_mask, codebook, elapsed) = match strategy {
        Strategy::Baseline => {
            let codebook = lattice::quantize_unique(&materialised, params.step, params.dedup_tolerance)?;
            let compressed = snap_to(vectors, &codebook, None)?;
            let elapsed = start.elapsed().as_secs_f64();
            let mask = boundary::classify(set, &centroids, params.boundary_percentile)?;
            (compressed, mask, codebook, elapsed)
        }
        Strategy::BoundaryAware => {
            let mask = boundary::classify(set, &centroids, params.boundary_percentile)?;
            let bulk = lattice::quantize_unique(&materialised, params.step, params.dedup_tolerance)?;
            let fine = lattice::quantize_unique(&materialised, params.boundary_step(), params.dedup_tolerance)?;
            let codebook = lattice::deduplicate(&[bulk.as_slice(), fine.as_slice()].concat(), params.dedup_tolerance);
            let bulk = lattice::canonicalize(&bulk, &codebook, params.dedup_tolerance);
            let fine = lattice::canonicalize(&fine, &codebook, params.dedup_tolerance);
            let compressed = snap_to(vectors, &bulk, Some((&fine, &mask)))?;
            let elapsed = start.elapsed().as_secs_f64();
            (compressed, mask, codebook, elapsed)
        }
    };

    let metadata = CompressionMetadata {
        strategy,
        step: params.step,
        k: params.k,
        seed: params.seed,
        boundary_step,
        num_boundary_vectors: boundary_mask.iter().filter(|b| **b).count(),
        num_centroids: centroids.len(),
        num_unique_centroids: codebook.len(),
        compression_time_seconds: elapsed,
    };

    debug!(
        strategy = %strategy,
        step = params.step,
        k = params.k,
        unique_centroids = metadata.num_unique_centroids,
        boundary_vectors = metadata.num_boundary_vectors,
        "Compression complete"
    );

    Ok(CompressionResult {
        vectors: compressed,
        boundary_mask,
        codebook,
        metadata,
    })
}

/// Replace each vector by its nearest entry in `bulk`, or in the fine
/// codebook when its mask bit is set.
fn snap_to(vectors: &[Vector], bulk: &[Vector], fine: Option<(&[Vector], &[bool])>) -> CoreResult<Vec<Vector>> {
    vectors
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let codebook = match fine {
                Some((fine, mask)) if mask[i] => fine,
                _ => bulk,
            };
            nearest_index(v, codebook)
                .map(|idx| codebook[idx].clone())
                .ok_or_else(|| CoreError::InvalidParameter("empty centroid codebook".to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> VectorSet {
        let mut vectors = Vec::new();
        for i in 0..30 {
            let t = i as f32 * 0.013;
            vectors.push(vec![t, 0.2 - t]);
            vectors.push(vec![3.0 + t, 3.1 - t]);
            vectors.push(vec![1.5 + t, 1.4 + t]);
        }
        VectorSet::from_vectors(vectors).unwrap()
    }

    #[test]
    fn test_empty_input_is_empty_result() {
        let result = compress(Strategy::BoundaryAware, &VectorSet::empty(), &CompressionParams::new(0.1, 3, 1)).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.metadata.num_unique_centroids, 0);
        assert_eq!(result.metadata.boundary_step, Some(0.05));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let set = sample_set();
        for params in [
            CompressionParams::new(0.0, 3, 1),
            CompressionParams::new(-1.0, 3, 1),
            CompressionParams::new(0.1, 0, 1),
            CompressionParams::new(0.1, 3, 1).with_percentile(150.0),
        ] {
            let err = compress(Strategy::Baseline, &set, &params).unwrap_err();
            assert!(matches!(err, CoreError::InvalidParameter(_)));
        }
        // Empty input still validates parameters.
        assert!(compress(Strategy::Baseline, &VectorSet::empty(), &CompressionParams::new(0.0, 3, 1)).is_err());
    }

    #[test]
    fn test_outputs_are_codebook_members() {
        let set = sample_set();
        for strategy in Strategy::ALL {
            let result = compress(strategy, &set, &CompressionParams::new(0.2, 3, 11)).unwrap();
            assert_eq!(result.len(), set.len());
            assert!(result.vectors.iter().all(|v| result.codebook.contains(v)), "{strategy}");
            assert_eq!(result.metadata.num_unique_centroids, result.codebook.len());
        }
    }

    #[test]
    fn test_boundary_aware_uses_fine_lattice_for_boundary() {
        let set = sample_set();
        let params = CompressionParams::new(0.4, 3, 5).with_percentile(50.0);
        let result = compress(Strategy::BoundaryAware, &set, &params).unwrap();
        let fine = params.boundary_step();
        for (v, is_boundary) in result.vectors.iter().zip(&result.boundary_mask) {
            if *is_boundary {
                for x in v {
                    let r = *x as f64 / fine;
                    assert!((r - r.round()).abs() < 1e-3);
                }
            }
        }
        assert_eq!(
            result.metadata.num_boundary_vectors,
            result.boundary_mask.iter().filter(|b| **b).count()
        );
    }

    #[test]
    fn test_reproducible_for_seed() {
        let set = sample_set();
        let params = CompressionParams::new(0.1, 3, 99)
            .with_backend(CentroidBackend::Perturbed { noise_fraction: 0.05 });
        let a = compress(Strategy::BoundaryAware, &set, &params).unwrap();
        let b = compress(Strategy::BoundaryAware, &set, &params).unwrap();
        assert_eq!(a.vectors, b.vectors);
        assert_eq!(a.codebook, b.codebook);
    }

    #[test]
    fn test_percentile_zero_marks_no_boundary() {
        let set = sample_set();
        let params = CompressionParams::new(0.1, 3, 2).with_percentile(0.0);
        let result = compress(Strategy::BoundaryAware, &set, &params).unwrap();
        assert_eq!(result.metadata.num_boundary_vectors, 0);

        let params = params.with_percentile(100.0);
        let result = compress(Strategy::BoundaryAware, &set, &params).unwrap();
        assert_eq!(result.metadata.num_boundary_vectors, set.len());
    }

    #[test]
    fn test_metadata_serde_round_trip() {
        let set = sample_set();
        let result = compress(Strategy::Baseline, &set, &CompressionParams::new(0.1, 3, 2)).unwrap();
        let json = serde_json::to_string(&result.metadata).unwrap();
        let back: CompressionMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result.metadata);
        assert!(json.contains("\"baseline\""));
    }
}
