//! Evaluation configuration: sweep grid, repeated runs, thresholds and datasets.
//!
//! Everything the pipeline needs is carried here and passed down explicitly;
//! the core crate never reads configuration on its own. A config is loaded
//! from TOML with [`EvalConfig::from_file`] and then overridden by CLI flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use boundary_lattice_core::clustering::InitStrategy;
use boundary_lattice_core::retrieval::Cutoffs;
use boundary_lattice_core::stats;
use boundary_lattice_core::types::metric_names;
use boundary_lattice_core::{CentroidBackend, CompressionParams, CoreError, CoreResult};

/// Inclusive range of lattice steps, linearly spaced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRange {
    /// Smallest step.
    pub min: f64,
    /// Largest step.
    pub max: f64,
    /// Number of values, both ends included.
    pub steps: usize,
}

impl StepRange {
    /// Grid values, ascending.
    pub fn values(&self) -> Vec<f64> {
        stats::linspace(self.min, self.max, self.steps)
    }
}

/// Inclusive range of cluster counts, linearly spaced and truncated to integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KRange {
    /// Smallest k.
    pub min: usize,
    /// Largest k.
    pub max: usize,
    /// Number of values before duplicate removal.
    pub steps: usize,
}

impl KRange {
    /// Grid values, ascending, without duplicates.
    pub fn values(&self) -> Vec<usize> {
        stats::linspace_int(self.min, self.max, self.steps)
    }
}

/// Parameter grid for one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Lattice step range.
    pub step: StepRange,
    /// Cluster count range.
    pub k: KRange,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            step: StepRange { min: 0.01, max: 0.5, steps: 15 },
            k: KRange { min: 3, max: 15, steps: 5 },
        }
    }
}

/// Repeated-run settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunsConfig {
    /// Number of seeded repetitions per dataset and strategy.
    pub count: usize,
    /// Seed of the first run; run `i` uses `base_seed + i`.
    pub base_seed: u64,
}

impl Default for RunsConfig {
    fn default() -> Self {
        Self { count: 5, base_seed: 42 }
    }
}

impl RunsConfig {
    /// Seed of every run, in order.
    pub fn seeds(&self) -> Vec<u64> {
        (0..self.count as u64).map(|i| self.base_seed.wrapping_add(i)).collect()
    }
}

/// Compression knobs shared by every sweep point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Ambiguity percentile for boundary labelling.
    pub boundary_percentile: f64,
    /// Boundary lattice step as a fraction of the bulk step.
    pub fine_step_ratio: f64,
    /// Lloyd iteration cap.
    pub cluster_iterations: usize,
    /// k-means initialization.
    pub init: InitStrategy,
    /// Centroid backend.
    pub backend: CentroidBackend,
    /// Deduplication tolerance.
    pub dedup_tolerance: f64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        let defaults = CompressionParams::new(1.0, 1, 0);
        Self {
            boundary_percentile: defaults.boundary_percentile,
            fine_step_ratio: defaults.fine_step_ratio,
            cluster_iterations: defaults.cluster_iterations,
            init: defaults.init,
            backend: defaults.backend,
            dedup_tolerance: defaults.dedup_tolerance,
        }
    }
}

impl CompressionConfig {
    /// Full parameters for one sweep point.
    pub fn params(&self, step: f64, k: usize, seed: u64) -> CompressionParams {
        CompressionParams {
            step,
            k,
            seed,
            boundary_percentile: self.boundary_percentile,
            fine_step_ratio: self.fine_step_ratio,
            cluster_iterations: self.cluster_iterations,
            init: self.init,
            backend: self.backend,
            dedup_tolerance: self.dedup_tolerance,
        }
    }
}

/// Retrieval evaluation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Neighbour count for the neighbourhood-overlap metric.
    pub neighbor_k: usize,
    /// Recall cutoffs.
    pub recall_at: Vec<usize>,
    /// NDCG cutoff.
    pub ndcg_at: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let cutoffs = Cutoffs::default();
        Self {
            neighbor_k: 10,
            recall_at: cutoffs.recall_at,
            ndcg_at: cutoffs.ndcg_at,
        }
    }
}

impl RetrievalConfig {
    /// Cutoffs for the retrieval evaluator.
    pub fn cutoffs(&self) -> Cutoffs {
        Cutoffs {
            recall_at: self.recall_at.clone(),
            ndcg_at: self.ndcg_at,
        }
    }
}

/// Stability analysis thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Metric aggregated per step.
    pub target_metric: String,
    /// A step is high-variance when its std exceeds this multiple of the median std.
    pub variance_factor: f64,
    /// Collapse when mean global MSE exceeds this.
    pub collapse_mse: f64,
    /// Collapse when mean delta exceeds this.
    pub collapse_delta: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            target_metric: metric_names::DELTA_BOUNDARY.to_string(),
            variance_factor: 1.5,
            collapse_mse: 0.5,
            collapse_delta: 1.0,
        }
    }
}

/// Threshold-verdict settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerdictConfig {
    /// Minimum |relative improvement| for a metric to count as significant (0.02 = 2%).
    pub significance: f64,
    /// Largest acceptable time overhead, in percent.
    pub max_overhead_pct: f64,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            significance: 0.02,
            max_overhead_pct: 100.0,
        }
    }
}

/// Execution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Evaluate sweep points on the rayon pool.
    pub parallel: bool,
    /// Wall-clock budget for the whole evaluation; `None` for no limit.
    pub timeout_secs: Option<u64>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            timeout_secs: None,
        }
    }
}

/// Shape of a generated dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyntheticKind {
    /// Gaussian blobs around centres drawn from `[-2, 2]^dim`.
    Clusters {
        /// Number of blobs.
        clusters: usize,
        /// Standard deviation around each centre.
        spread: f64,
    },
    /// Points on a circle in the first two coordinates.
    Ring {
        /// Circle radius.
        radius: f64,
        /// Gaussian noise added to every coordinate.
        noise: f64,
    },
    /// A 3-D swiss roll padded with noise dimensions.
    SwissRoll {
        /// Number of turns of the spiral.
        turns: f64,
        /// Gaussian noise added to every coordinate.
        noise: f64,
    },
}

/// Where a dataset's vectors come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DatasetSpec {
    /// Generated in memory.
    Synthetic {
        /// Dataset name used in reports.
        name: String,
        /// Number of vectors.
        n: usize,
        /// Dimensionality.
        dim: usize,
        /// Generator seed.
        seed: u64,
        /// Generator shape.
        shape: SyntheticKind,
    },
    /// Loaded from disk.
    Files {
        /// Dataset name used in reports.
        name: String,
        /// Corpus vectors (`.json` array or `.jsonl`).
        vectors: PathBuf,
        /// Optional query vectors, same formats.
        #[serde(default)]
        queries: Option<PathBuf>,
        /// Optional qrels TSV.
        #[serde(default)]
        qrels: Option<PathBuf>,
    },
}

impl DatasetSpec {
    /// Dataset name.
    pub fn name(&self) -> &str {
        match self {
            DatasetSpec::Synthetic { name, .. } | DatasetSpec::Files { name, .. } => name,
        }
    }

    /// The three generated datasets used by default.
    pub fn default_synthetic() -> Vec<DatasetSpec> {
        vec![
            DatasetSpec::Synthetic {
                name: "clusters".to_string(),
                n: 500,
                dim: 8,
                seed: 42,
                shape: SyntheticKind::Clusters { clusters: 5, spread: 0.5 },
            },
            DatasetSpec::Synthetic {
                name: "ring".to_string(),
                n: 500,
                dim: 8,
                seed: 42,
                shape: SyntheticKind::Ring { radius: 1.0, noise: 0.05 },
            },
            DatasetSpec::Synthetic {
                name: "swiss_roll".to_string(),
                n: 500,
                dim: 8,
                seed: 42,
                shape: SyntheticKind::SwissRoll { turns: 1.5, noise: 0.05 },
            },
        ]
    }
}

/// Complete evaluation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Directory receiving reports.
    pub output_dir: PathBuf,
    /// Parameter grid.
    pub sweep: SweepConfig,
    /// Repeated runs.
    pub runs: RunsConfig,
    /// Compression knobs.
    pub compression: CompressionConfig,
    /// Retrieval evaluation.
    pub retrieval: RetrievalConfig,
    /// Stability thresholds.
    pub stability: StabilityConfig,
    /// Verdict thresholds.
    pub verdict: VerdictConfig,
    /// Execution settings.
    pub execution: ExecutionConfig,
    /// Datasets to evaluate.
    pub datasets: Vec<DatasetSpec>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("results/boundary_eval"),
            sweep: SweepConfig::default(),
            runs: RunsConfig::default(),
            compression: CompressionConfig::default(),
            retrieval: RetrievalConfig::default(),
            stability: StabilityConfig::default(),
            verdict: VerdictConfig::default(),
            execution: ExecutionConfig::default(),
            datasets: DatasetSpec::default_synthetic(),
        }
    }
}

impl EvalConfig {
    /// Small grid for smoke runs.
    pub fn quick() -> Self {
        Self {
            sweep: SweepConfig {
                step: StepRange { min: 0.05, max: 0.5, steps: 4 },
                k: KRange { min: 3, max: 9, steps: 3 },
            },
            runs: RunsConfig { count: 2, base_seed: 42 },
            ..Default::default()
        }
    }

    /// Load and validate a TOML file. Missing sections take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&contents).map_err(|e| {
            CoreError::ConfigError(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> CoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    /// Check the whole configuration.
    pub fn validate(&self) -> CoreResult<()> {
        let step = &self.sweep.step;
        if !(step.min.is_finite() && step.min > 0.0) || !(step.max >= step.min) || step.steps == 0 {
            return Err(CoreError::InvalidParameter(format!(
                "step range must satisfy 0 < min <= max with at least one value, got {step:?}"
            )));
        }
        let k = &self.sweep.k;
        if k.min == 0 || k.max < k.min || k.steps == 0 {
            return Err(CoreError::InvalidParameter(format!(
                "k range must satisfy 0 < min <= max with at least one value, got {k:?}"
            )));
        }
        if self.runs.count == 0 {
            return Err(CoreError::ConfigError("runs.count must be at least 1".to_string()));
        }

        // Validates percentile, ratio, tolerance and backend in one place.
        self.compression.params(step.min, k.min, self.runs.base_seed).validate()?;

        if self.retrieval.neighbor_k == 0 {
            return Err(CoreError::InvalidParameter("retrieval.neighbor_k must be positive".to_string()));
        }
        self.retrieval.cutoffs().validate()?;

        if !(self.stability.variance_factor > 0.0) {
            return Err(CoreError::ConfigError("stability.variance_factor must be positive".to_string()));
        }
        if !(self.verdict.significance >= 0.0) || !(self.verdict.max_overhead_pct > 0.0) {
            return Err(CoreError::ConfigError(
                "verdict thresholds must be non-negative and overhead positive".to_string(),
            ));
        }

        if self.datasets.is_empty() {
            return Err(CoreError::ConfigError("at least one dataset is required".to_string()));
        }
        let mut names = std::collections::HashSet::new();
        for spec in &self.datasets {
            let name = spec.name();
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(CoreError::ConfigError(format!(
                    "dataset name '{name}' must be non-empty and contain no path separator"
                )));
            }
            if !names.insert(name) {
                return Err(CoreError::ConfigError(format!("duplicate dataset name '{}'", spec.name())));
            }
        }
        Ok(())
    }
}
