//! Full evaluation pipeline: load, sweep both strategies, analyze, decide.

use tracing::{info, warn};

use boundary_lattice_core::retrieval::EvaluationMode;
use boundary_lattice_core::{CoreResult, Strategy};

use super::comparison::{aggregate_means, build_comparison};
use super::sweep::SweepHarness;
use crate::analysis::{count_verdict, stability, threshold_verdict};
use crate::config::EvalConfig;
use crate::datasets::{provider_for, Dataset};
use crate::reports::{DatasetReport, FailureReport, RunContext, RunReport};

/// Reports of a whole invocation.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    /// Results for every dataset that could be evaluated.
    pub report: RunReport,
    /// One entry per dataset that could not.
    pub failures: Vec<FailureReport>,
}

/// Sweep both strategies over one dataset and analyze the runs.
pub fn evaluate_dataset(harness: &SweepHarness, dataset: &Dataset) -> CoreResult<DatasetReport> {
    let config = harness.config();
    let baseline_runs = harness.run_repeated(dataset, Strategy::Baseline)?;
    let boundary_aware_runs = harness.run_repeated(dataset, Strategy::BoundaryAware)?;

    let comparison = build_comparison(&baseline_runs, &boundary_aware_runs);
    let threshold = threshold_verdict(
        &aggregate_means(&baseline_runs),
        &aggregate_means(&boundary_aware_runs),
        &config.verdict,
    );
    let count = count_verdict(&comparison);

    info!(
        dataset = %dataset.name,
        threshold_verdict = %threshold.verdict,
        count_exploitable = count.exploitable,
        rows = comparison.len(),
        "Dataset evaluated"
    );

    let mode = if dataset.has_ground_truth() {
        EvaluationMode::GroundTruth
    } else {
        EvaluationMode::NeighborPreservation
    };

    Ok(DatasetReport {
        name: dataset.name.clone(),
        source: dataset.source,
        vectors: dataset.corpus.len(),
        dimension: dataset.corpus.dimension(),
        mode,
        baseline_stability: stability::analyze(&baseline_runs, &config.stability),
        boundary_aware_stability: stability::analyze(&boundary_aware_runs, &config.stability),
        baseline_runs,
        boundary_aware_runs,
        comparison,
        threshold_verdict: threshold,
        count_verdict: count,
    })
}

/// Evaluate every configured dataset.
///
/// A dataset that fails to load or evaluate gets a [`FailureReport`]; the
/// others still run. The wall-clock budget covers the whole invocation.
pub fn run_evaluation(config: EvalConfig, context: RunContext) -> EvaluationOutcome {
    let harness = SweepHarness::new(config.clone());
    let mut datasets = Vec::new();
    let mut failures = Vec::new();

    for spec in &config.datasets {
        let provider = provider_for(spec);
        let dataset = match provider.load() {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!(dataset = provider.name(), error = %e, "Dataset could not be loaded");
                failures.push(FailureReport::new(context.clone(), provider.name(), "load", &e));
                continue;
            }
        };

        match evaluate_dataset(&harness, &dataset) {
            Ok(report) => datasets.push(report),
            Err(e) => {
                warn!(dataset = %dataset.name, error = %e, "Dataset evaluation failed");
                failures.push(FailureReport::new(context.clone(), dataset.name.clone(), "sweep", &e));
            }
        }
    }

    EvaluationOutcome {
        report: RunReport {
            context,
            config,
            datasets,
        },
        failures,
    }
}
