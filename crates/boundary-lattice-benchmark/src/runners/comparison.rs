//! Paired baseline vs boundary-aware comparison.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use boundary_lattice_core::stats::nan_mean;
use boundary_lattice_core::MetricRecord;

use super::sweep::SweepRun;

/// Per-step means of both strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Lattice step.
    pub step: f64,
    /// Baseline means across k and runs.
    pub baseline: MetricRecord,
    /// Boundary-aware means across k and runs.
    pub boundary_aware: MetricRecord,
}

/// Collects every value of every metric, keyed by name.
#[derive(Default)]
struct Accumulator {
    values: BTreeMap<String, Vec<f64>>,
}

impl Accumulator {
    fn add(&mut self, record: &MetricRecord) {
        for (name, value) in record.iter() {
            self.values.entry(name.to_string()).or_default().push(value);
        }
    }

    fn means(&self) -> MetricRecord {
        self.values
            .iter()
            .map(|(name, values)| (name.clone(), nan_mean(values)))
            .collect()
    }
}

/// Mean of every metric per step, across k and runs, NaN excluded.
///
/// Keys are `f64::to_bits` of the step, which orders positive steps correctly.
fn step_means(runs: &[SweepRun]) -> BTreeMap<u64, MetricRecord> {
    let mut by_step: BTreeMap<u64, Accumulator> = BTreeMap::new();
    for run in runs {
        for point in &run.points {
            by_step.entry(point.step.to_bits()).or_default().add(&point.metrics);
        }
    }
    by_step.into_iter().map(|(k, acc)| (k, acc.means())).collect()
}

/// One row per step present in both sweeps, ascending by step.
pub fn build_comparison(baseline: &[SweepRun], boundary_aware: &[SweepRun]) -> Vec<ComparisonRow> {
    let baseline = step_means(baseline);
    let mut aware = step_means(boundary_aware);

    baseline
        .into_iter()
        .filter_map(|(bits, base)| {
            aware.remove(&bits).map(|ba| ComparisonRow {
                step: f64::from_bits(bits),
                baseline: base,
                boundary_aware: ba,
            })
        })
        .collect()
}

/// Mean of every metric over all points of all runs, NaN excluded.
pub fn aggregate_means(runs: &[SweepRun]) -> MetricRecord {
    let mut acc = Accumulator::default();
    for point in runs.iter().flat_map(|r| &r.points) {
        acc.add(&point.metrics);
    }
    acc.means()
}
