//! Stability analysis across repeated sweeps.
//!
//! Groups a target metric by lattice step over every run and k, then looks for
//! sign changes of the mean, steps with unusually high spread, and the first
//! step at which compression collapses.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use boundary_lattice_core::stats::{nan_max, nan_mean, nan_median, nan_min, nan_std};
use boundary_lattice_core::types::{metric_names, nan_as_null};

use crate::config::StabilityConfig;
use crate::runners::SweepRun;

/// Target-metric statistics at one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    /// Lattice step.
    pub step: f64,
    /// Mean over runs and k.
    #[serde(with = "nan_as_null")]
    pub mean: f64,
    /// Population standard deviation over runs and k.
    #[serde(with = "nan_as_null")]
    pub std: f64,
    /// Runs contributing at least one point.
    pub run_count: usize,
    /// `std` above `variance_factor` times the median std.
    pub high_variance: bool,
}

/// Steps grouped by distance from the collapse threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Regions {
    /// Below half the collapse threshold, or every step when there is none.
    pub stable: Vec<f64>,
    /// From half the threshold up to it.
    pub ridge: Vec<f64>,
    /// At or above the threshold.
    pub instability: Vec<f64>,
}

/// Spread of the per-step means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaRange {
    /// Smallest per-step mean.
    #[serde(with = "nan_as_null")]
    pub min: f64,
    /// Largest per-step mean.
    #[serde(with = "nan_as_null")]
    pub max: f64,
    /// Mean of the per-step means.
    #[serde(with = "nan_as_null")]
    pub mean: f64,
    /// Standard deviation of the per-step means.
    #[serde(with = "nan_as_null")]
    pub std: f64,
}

/// Output of [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilitySummary {
    /// Metric the statistics describe.
    pub target_metric: String,
    /// Runs analyzed.
    pub run_count: usize,
    /// Per-step statistics, ascending.
    pub steps: Vec<StepStats>,
    /// Adjacent step pairs between which the mean changes sign.
    pub zero_crossings: Vec<(f64, f64)>,
    /// Median of the per-step standard deviations.
    #[serde(with = "nan_as_null")]
    pub median_std: f64,
    /// Mean of the per-step standard deviations.
    #[serde(with = "nan_as_null")]
    pub average_std: f64,
    /// First step where compression collapses, if any.
    pub collapse_threshold: Option<f64>,
    /// Stable, ridge and instability steps.
    pub regions: Regions,
    /// Range of the per-step means.
    pub delta_range: DeltaRange,
}

impl StabilitySummary {
    /// Steps flagged high-variance.
    pub fn high_variance_steps(&self) -> Vec<f64> {
        self.steps.iter().filter(|s| s.high_variance).map(|s| s.step).collect()
    }
}

/// Per-step values of `metric` across runs, keyed by `f64::to_bits(step)`.
fn values_by_step(runs: &[SweepRun], metric: &str) -> BTreeMap<u64, (Vec<f64>, BTreeSet<usize>)> {
    let mut by_step: BTreeMap<u64, (Vec<f64>, BTreeSet<usize>)> = BTreeMap::new();
    for (run_idx, run) in runs.iter().enumerate() {
        for point in &run.points {
            let entry = by_step.entry(point.step.to_bits()).or_default();
            entry.0.push(point.metrics.value(metric));
            entry.1.insert(run_idx);
        }
    }
    by_step
}

/// Mean of `metric` per step, ascending by step.
pub fn step_means(runs: &[SweepRun], metric: &str) -> Vec<(f64, f64)> {
    values_by_step(runs, metric)
        .into_iter()
        .map(|(bits, (values, _))| (f64::from_bits(bits), nan_mean(&values)))
        .collect()
}

/// Per-step mean and std of `metric`, with high-variance flags.
pub fn step_statistics(runs: &[SweepRun], metric: &str, variance_factor: f64) -> Vec<StepStats> {
    let mut stats: Vec<StepStats> = values_by_step(runs, metric)
        .into_iter()
        .map(|(bits, (values, run_ids))| StepStats {
            step: f64::from_bits(bits),
            mean: nan_mean(&values),
            std: nan_std(&values),
            run_count: run_ids.len(),
            high_variance: false,
        })
        .collect();

    let stds: Vec<f64> = stats.iter().map(|s| s.std).collect();
    let threshold = nan_median(&stds) * variance_factor;
    for s in &mut stats {
        s.high_variance = s.std > threshold;
    }
    stats
}

/// Adjacent pairs `(steps[i], steps[i + 1])` where the mean changes sign.
///
/// Touching zero from below counts (`<= 0` then `> 0`), as does touching it
/// from above (`>= 0` then `< 0`). NaN means never form a crossing.
pub fn find_zero_crossings(steps: &[f64], means: &[f64]) -> Vec<(f64, f64)> {
    steps
        .windows(2)
        .zip(means.windows(2))
        .filter(|(_, m)| (m[0] <= 0.0 && m[1] > 0.0) || (m[0] >= 0.0 && m[1] < 0.0))
        .map(|(s, _)| (s[0], s[1]))
        .collect()
}

/// First step whose mean global MSE or mean delta exceeds its limit.
pub fn detect_collapse(runs: &[SweepRun], config: &StabilityConfig) -> Option<f64> {
    let mse = step_means(runs, metric_names::MSE_GLOBAL);
    let delta = step_means(runs, metric_names::DELTA_BOUNDARY);
    mse.iter()
        .zip(delta.iter())
        .find(|((_, m), (_, d))| *m > config.collapse_mse || *d > config.collapse_delta)
        .map(|((step, _), _)| *step)
}

/// Split steps around a collapse threshold.
pub fn classify_regions(steps: &[f64], collapse: Option<f64>) -> Regions {
    let Some(threshold) = collapse else {
        return Regions {
            stable: steps.to_vec(),
            ..Default::default()
        };
    };
    let mut regions = Regions::default();
    for &step in steps {
        if step < threshold * 0.5 {
            regions.stable.push(step);
        } else if step < threshold {
            regions.ridge.push(step);
        } else {
            regions.instability.push(step);
        }
    }
    regions
}

/// Full stability analysis of repeated runs of one dataset and strategy.
pub fn analyze(runs: &[SweepRun], config: &StabilityConfig) -> StabilitySummary {
    let steps = step_statistics(runs, &config.target_metric, config.variance_factor);
    let step_values: Vec<f64> = steps.iter().map(|s| s.step).collect();
    let means: Vec<f64> = steps.iter().map(|s| s.mean).collect();
    let stds: Vec<f64> = steps.iter().map(|s| s.std).collect();

    let collapse_threshold = detect_collapse(runs, config);

    StabilitySummary {
        target_metric: config.target_metric.clone(),
        run_count: runs.len(),
        zero_crossings: find_zero_crossings(&step_values, &means),
        median_std: nan_median(&stds),
        average_std: nan_mean(&stds),
        collapse_threshold,
        regions: classify_regions(&step_values, collapse_threshold),
        delta_range: DeltaRange {
            min: nan_min(&means),
            max: nan_max(&means),
            mean: nan_mean(&means),
            std: nan_std(&means),
        },
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::SweepPoint;
    use boundary_lattice_core::retrieval::EvaluationMode;
    use boundary_lattice_core::{CompressionMetadata, MetricRecord, Strategy};

    fn run(seed: u64, rows: &[(f64, f64, f64)]) -> SweepRun {
        let points = rows
            .iter()
            .map(|&(step, mse, delta)| SweepPoint {
                step,
                k: 3,
                seed,
                metrics: MetricRecord::new()
                    .with(metric_names::MSE_GLOBAL, mse)
                    .with(metric_names::DELTA_BOUNDARY, delta),
                compression: CompressionMetadata {
                    strategy: Strategy::BoundaryAware,
                    step,
                    k: 3,
                    seed,
                    boundary_step: Some(step / 2.0),
                    num_boundary_vectors: 1,
                    num_centroids: 3,
                    num_unique_centroids: 3,
                    compression_time_seconds: 0.0,
                },
            })
            .collect();
        SweepRun {
            dataset: "d".to_string(),
            strategy: Strategy::BoundaryAware,
            seed,
            mode: EvaluationMode::NeighborPreservation,
            points,
            timed_out: false,
            elapsed_seconds: 0.0,
        }
    }

    #[test]
    fn test_single_zero_crossing() {
        let steps = [0.1, 0.2, 0.3, 0.4];
        let means = [-0.1, -0.05, 0.02, 0.08];
        assert_eq!(find_zero_crossings(&steps, &means), vec![(0.2, 0.3)]);
    }

    #[test]
    fn test_zero_crossing_touching_zero() {
        let steps = [1.0, 2.0, 3.0];
        assert_eq!(find_zero_crossings(&steps, &[0.0, 1.0, 2.0]), vec![(1.0, 2.0)]);
        assert_eq!(find_zero_crossings(&steps, &[1.0, 0.0, -1.0]), vec![(1.0, 2.0), (2.0, 3.0)]);
        assert!(find_zero_crossings(&steps, &[f64::NAN, 1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_step_statistics_across_runs() {
        let runs = vec![
            run(1, &[(0.1, 0.01, 0.0), (0.2, 0.02, 0.1)]),
            run(2, &[(0.1, 0.01, 0.2), (0.2, 0.02, 0.1)]),
        ];
        let stats = step_statistics(&runs, metric_names::DELTA_BOUNDARY, 1.5);
        assert_eq!(stats.len(), 2);
        assert!((stats[0].mean - 0.1).abs() < 1e-12);
        assert!((stats[0].std - 0.1).abs() < 1e-12);
        assert_eq!(stats[0].run_count, 2);
        assert_eq!(stats[1].std, 0.0);
        // Median std is 0.05, so 0.1 exceeds 1.5 * 0.05.
        assert!(stats[0].high_variance);
        assert!(!stats[1].high_variance);
    }

    #[test]
    fn test_collapse_and_regions() {
        let runs = vec![run(
            1,
            &[(0.1, 0.01, 0.0), (0.2, 0.1, 0.0), (0.3, 0.2, 0.0), (0.4, 0.6, 0.0), (0.5, 0.9, 0.0)],
        )];
        let config = StabilityConfig::default();
        assert_eq!(detect_collapse(&runs, &config), Some(0.4));

        let summary = analyze(&runs, &config);
        assert_eq!(summary.collapse_threshold, Some(0.4));
        assert_eq!(summary.regions.stable, vec![0.1]);
        assert_eq!(summary.regions.ridge, vec![0.2, 0.3]);
        assert_eq!(summary.regions.instability, vec![0.4, 0.5]);
    }

    #[test]
    fn test_delta_triggers_collapse() {
        let runs = vec![run(1, &[(0.1, 0.01, 0.2), (0.2, 0.02, 1.5)])];
        assert_eq!(detect_collapse(&runs, &StabilityConfig::default()), Some(0.2));
    }

    #[test]
    fn test_no_collapse_means_all_stable() {
        let regions = classify_regions(&[0.1, 0.2], None);
        assert_eq!(regions.stable, vec![0.1, 0.2]);
        assert!(regions.ridge.is_empty() && regions.instability.is_empty());
    }

    #[test]
    fn test_analyze_reports_delta_range() {
        let runs = vec![
            run(1, &[(0.1, 0.01, -0.1), (0.2, 0.01, -0.05), (0.3, 0.01, 0.02), (0.4, 0.01, 0.08)]),
        ];
        let summary = analyze(&runs, &StabilityConfig::default());
        assert_eq!(summary.run_count, 1);
        assert_eq!(summary.zero_crossings, vec![(0.2, 0.3)]);
        assert_eq!(summary.delta_range.min, -0.1);
        assert_eq!(summary.delta_range.max, 0.08);
        assert_eq!(summary.collapse_threshold, None);
        assert_eq!(summary.regions.stable.len(), 4);
    }
}
