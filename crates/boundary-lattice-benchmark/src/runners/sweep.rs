//! Sweep harness.
//!
//! Evaluates every `(step, k)` grid point of one dataset for one strategy and
//! seed. Points are independent; with `execution.parallel` they run on the
//! rayon pool, each task owning its result, and are sorted by `(step, k)`
//! after the join.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use boundary_lattice_core::distortion::{distortion_metrics, label_purity};
use boundary_lattice_core::retrieval::{evaluate_ground_truth, evaluate_neighbor_preservation, EvaluationMode};
use boundary_lattice_core::types::metric_names;
use boundary_lattice_core::{compress, CompressionMetadata, CoreResult, MetricRecord, Strategy};

use crate::config::EvalConfig;
use crate::datasets::Dataset;

/// Result of one `(step, k, seed)` evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Bulk lattice step.
    pub step: f64,
    /// Cluster count.
    pub k: usize,
    /// Seed.
    pub seed: u64,
    /// Distortion and retrieval metrics.
    pub metrics: MetricRecord,
    /// Compression metadata.
    pub compression: CompressionMetadata,
}

/// All points of one dataset / strategy / seed combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRun {
    /// Dataset name.
    pub dataset: String,
    /// Strategy evaluated.
    pub strategy: Strategy,
    /// Seed shared by every point.
    pub seed: u64,
    /// How retrieval was scored.
    pub mode: EvaluationMode,
    /// Points in ascending `(step, k)` order.
    pub points: Vec<SweepPoint>,
    /// True when the deadline passed before every point was started.
    pub timed_out: bool,
    /// Wall-clock seconds for the run.
    pub elapsed_seconds: f64,
}

impl SweepRun {
    /// Distinct step values present in this run, ascending.
    pub fn steps(&self) -> Vec<f64> {
        let mut steps: Vec<f64> = self.points.iter().map(|p| p.step).collect();
        steps.dedup();
        steps
    }
}

/// Drives sweeps over the configured grid.
pub struct SweepHarness {
    config: EvalConfig,
    deadline: Option<Instant>,
}

impl SweepHarness {
    /// Create a harness. The wall-clock budget starts now.
    pub fn new(config: EvalConfig) -> Self {
        let deadline = config
            .execution
            .timeout_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        Self { config, deadline }
    }

    /// Replace the deadline.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Evaluate a single grid point.
    pub fn evaluate_point(
        &self,
        dataset: &Dataset,
        strategy: Strategy,
        step: f64,
        k: usize,
        seed: u64,
    ) -> CoreResult<SweepPoint> {
        let params = self.config.compression.params(step, k, seed);
        let result = compress(strategy, &dataset.corpus, &params)?;

        let mut metrics = distortion_metrics(&dataset.corpus, &result, self.config.retrieval.neighbor_k)?;
        if let Some(labels) = &dataset.labels {
            metrics.insert(metric_names::LABEL_PURITY, label_purity(&result.vectors, labels)?);
        }

        let cutoffs = self.config.retrieval.cutoffs();
        let retrieval = match (&dataset.queries, &dataset.qrels) {
            (Some(queries), Some(qrels)) if dataset.has_ground_truth() => {
                let compressed = dataset.corpus.with_vectors(result.vectors.clone())?;
                evaluate_ground_truth(queries, &compressed, qrels, &cutoffs)?
            }
            _ => evaluate_neighbor_preservation(dataset.corpus.vectors(), &result.vectors, &cutoffs)?,
        };
        metrics.extend(&retrieval.to_metric_record());

        debug!(
            dataset = %dataset.name,
            %strategy,
            step,
            k,
            seed,
            mse_global = metrics.value(metric_names::MSE_GLOBAL),
            "Evaluated sweep point"
        );

        Ok(SweepPoint {
            step,
            k,
            seed,
            metrics,
            compression: result.metadata,
        })
    }

    /// Run the full grid for one seed.
    ///
    /// Points not started before the deadline are skipped and the run is
    /// flagged `timed_out`; completed points are kept.
    pub fn run_sweep(&self, dataset: &Dataset, strategy: Strategy, seed: u64) -> CoreResult<SweepRun> {
        let start = Instant::now();
        let grid: Vec<(f64, usize)> = self
            .config
            .sweep
            .step
            .values()
            .into_iter()
            .flat_map(|step| self.config.sweep.k.values().into_iter().map(move |k| (step, k)))
            .collect();

        let evaluate = |&(step, k): &(f64, usize)| -> Option<CoreResult<SweepPoint>> {
            if self.expired() {
                return None;
            }
            Some(self.evaluate_point(dataset, strategy, step, k, seed))
        };

        let outcomes: Vec<Option<CoreResult<SweepPoint>>> = if self.config.execution.parallel {
            grid.par_iter().map(evaluate).collect()
        } else {
            grid.iter().map(evaluate).collect()
        };

        let total = outcomes.len();
        let mut points = Vec::with_capacity(total);
        for outcome in outcomes.into_iter().flatten() {
            points.push(outcome?);
        }
        let timed_out = points.len() < total;

        points.sort_by(|a, b| a.step.total_cmp(&b.step).then(a.k.cmp(&b.k)));

        let mode = if dataset.has_ground_truth() {
            EvaluationMode::GroundTruth
        } else {
            EvaluationMode::NeighborPreservation
        };

        let elapsed_seconds = start.elapsed().as_secs_f64();
        if timed_out {
            warn!(
                dataset = %dataset.name,
                %strategy,
                seed,
                completed = points.len(),
                total,
                "Sweep hit its deadline, reporting partial results"
            );
        } else {
            info!(
                dataset = %dataset.name,
                %strategy,
                seed,
                points = points.len(),
                elapsed_seconds,
                "Sweep complete"
            );
        }

        Ok(SweepRun {
            dataset: dataset.name.clone(),
            strategy,
            seed,
            mode,
            points,
            timed_out,
            elapsed_seconds,
        })
    }

    /// Run the grid once per configured seed.
    ///
    /// Stops early once a run times out; later seeds would be empty.
    pub fn run_repeated(&self, dataset: &Dataset, strategy: Strategy) -> CoreResult<Vec<SweepRun>> {
        let mut runs = Vec::with_capacity(self.config.runs.count);
        for seed in self.config.runs.seeds() {
            let run = self.run_sweep(dataset, strategy, seed)?;
            let timed_out = run.timed_out;
            runs.push(run);
            if timed_out {
                break;
            }
        }
        Ok(runs)
    }
}
