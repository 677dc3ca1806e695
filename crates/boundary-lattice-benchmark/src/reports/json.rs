//! JSON report persistence.
//!
//! Everything written here loads back equal to what was saved; `NaN`
//! metrics travel as `null`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use boundary_lattice_core::retrieval::EvaluationMode;
use boundary_lattice_core::{CoreError, CoreResult};

use super::{write_text, RunContext};
use crate::analysis::{CountVerdict, StabilitySummary, ThresholdVerdict};
use crate::config::EvalConfig;
use crate::datasets::DataSource;
use crate::runners::{ComparisonRow, SweepRun};

/// Results for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    /// Dataset name.
    pub name: String,
    /// Provenance.
    pub source: DataSource,
    /// Corpus size.
    pub vectors: usize,
    /// Dimensionality.
    pub dimension: usize,
    /// How retrieval was scored.
    pub mode: EvaluationMode,
    /// Baseline runs, one per seed.
    pub baseline_runs: Vec<SweepRun>,
    /// Boundary-aware runs, one per seed.
    pub boundary_aware_runs: Vec<SweepRun>,
    /// Stability of the baseline runs.
    pub baseline_stability: StabilitySummary,
    /// Stability of the boundary-aware runs.
    pub boundary_aware_stability: StabilitySummary,
    /// Per-step paired means.
    pub comparison: Vec<ComparisonRow>,
    /// Threshold-based decision on aggregate means.
    pub threshold_verdict: ThresholdVerdict,
    /// Count-based decision on the comparison rows.
    pub count_verdict: CountVerdict,
}

impl DatasetReport {
    /// True when any run stopped at the deadline.
    pub fn partial(&self) -> bool {
        self.baseline_runs
            .iter()
            .chain(&self.boundary_aware_runs)
            .any(|r| r.timed_out)
    }
}

/// Complete output of one evaluation invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Invocation facts.
    pub context: RunContext,
    /// Configuration used.
    pub config: EvalConfig,
    /// Per-dataset results.
    pub datasets: Vec<DatasetReport>,
}

impl RunReport {
    /// Save as pretty JSON.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        save_json(self, path)
    }

    /// Load a saved report.
    pub fn load(path: &Path) -> CoreResult<Self> {
        load_json(path)
    }
}

/// Save any serializable value as pretty JSON, creating parent directories.
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> CoreResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CoreError::Serialization(format!("{}: {e}", path.display())))?;
    write_text(path, &json)?;
    info!("Saved JSON report to {}", path.display());
    Ok(())
}

/// Load a JSON file written by [`save_json`].
pub fn load_json<T: DeserializeOwned>(path: &Path) -> CoreResult<T> {
    if !path.exists() {
        return Err(CoreError::MissingData(format!("{} does not exist", path.display())));
    }
    let file = File::open(path).map_err(|e| CoreError::Io(format!("{}: {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| CoreError::Serialization(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundary_lattice_core::types::metric_names;
    use boundary_lattice_core::{CompressionMetadata, MetricRecord, Strategy};
    use crate::runners::SweepPoint;
    use tempfile::TempDir;

    fn sample_run() -> SweepRun {
        SweepRun {
            dataset: "clusters".to_string(),
            strategy: Strategy::BoundaryAware,
            seed: 42,
            mode: EvaluationMode::NeighborPreservation,
            points: vec![SweepPoint {
                step: 0.1,
                k: 5,
                seed: 42,
                metrics: MetricRecord::new()
                    .with(metric_names::MSE_GLOBAL, 0.0008)
                    .with(metric_names::MSE_BOUNDARY, f64::NAN),
                compression: CompressionMetadata {
                    strategy: Strategy::BoundaryAware,
                    step: 0.1,
                    k: 5,
                    seed: 42,
                    boundary_step: Some(0.05),
                    num_boundary_vectors: 0,
                    num_centroids: 5,
                    num_unique_centroids: 5,
                    compression_time_seconds: 0.002,
                },
            }],
            timed_out: false,
            elapsed_seconds: 0.01,
        }
    }

    #[test]
    fn test_sweep_runs_round_trip_with_nan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/runs.json");
        let runs = vec![sample_run()];
        save_json(&runs, &path).unwrap();
        let back: Vec<SweepRun> = load_json(&path).unwrap();
        assert_eq!(back, runs);
        assert!(back[0].points[0].metrics.value(metric_names::MSE_BOUNDARY).is_nan());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_json::<Vec<SweepRun>>(Path::new("/nonexistent/runs.json")).unwrap_err();
        assert!(err.is_missing_data());
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_json::<RunReport>(&path), Err(CoreError::Serialization(_))));
    }
}
