//! Failure reports.
//!
//! Written when a dataset cannot be evaluated. A failure report carries no
//! metrics: nothing is estimated, projected or generated in place of the
//! missing data.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use boundary_lattice_core::{CoreError, CoreResult};

use super::{save_json, write_text, RunContext};

/// Why a dataset could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Invocation facts.
    pub context: RunContext,
    /// Dataset that failed.
    pub dataset: String,
    /// Pipeline stage that failed (`load`, `sweep`, ...).
    pub stage: String,
    /// Error message.
    pub error: String,
    /// Whether the input data was absent or unusable.
    pub missing_data: bool,
}

impl FailureReport {
    /// Build a report from an error.
    pub fn new(context: RunContext, dataset: impl Into<String>, stage: impl Into<String>, error: &CoreError) -> Self {
        Self {
            context,
            dataset: dataset.into(),
            stage: stage.into(),
            error: error.to_string(),
            missing_data: error.is_missing_data(),
        }
    }

    /// Render as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str(&format!("# Evaluation Failure Report: {}\n\n", self.dataset));
        md.push_str("## Status: COULD NOT RUN\n\n");
        md.push_str("No metrics were produced for this dataset. No synthetic data was substituted.\n\n");
        md.push_str(&format!("**Failed at stage:** {}\n\n", self.stage));
        md.push_str("**Reason:**\n\n```\n");
        md.push_str(&self.error);
        md.push_str("\n```\n\n");
        if self.missing_data {
            md.push_str("The input data is absent or inconsistent. Check that the configured vector, ");
            md.push_str("query and qrels files exist and share one dimensionality.\n\n");
        }
        md.push_str(&format!(
            "*Generated {} on {}/{}, version {}*\n",
            self.context.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.context.platform,
            self.context.arch,
            self.context.crate_version
        ));
        md
    }

    /// Write `<dir>/failure_<dataset>.json` and `.md`.
    pub fn write(&self, dir: &Path) -> CoreResult<()> {
        save_json(self, &dir.join(format!("failure_{}.json", self.dataset)))?;
        write_text(&dir.join(format!("failure_{}.md", self.dataset)), &self.to_markdown())?;
        warn!(dataset = %self.dataset, stage = %self.stage, "Wrote failure report to {}", dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::load_json;
    use tempfile::TempDir;

    #[test]
    fn test_failure_report_files() {
        let dir = TempDir::new().unwrap();
        let err = CoreError::MissingData("data/msmarco.jsonl does not exist".to_string());
        let report = FailureReport::new(RunContext::capture(), "msmarco", "load", &err);
        assert!(report.missing_data);

        report.write(dir.path()).unwrap();
        let md = std::fs::read_to_string(dir.path().join("failure_msmarco.md")).unwrap();
        assert!(md.contains("COULD NOT RUN"));
        assert!(md.contains("data/msmarco.jsonl does not exist"));

        let back: FailureReport = load_json(&dir.path().join("failure_msmarco.json")).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_dotted_dataset_names_keep_separate_reports() {
        let dir = TempDir::new().unwrap();
        let err = CoreError::MissingData("corpus.jsonl does not exist".to_string());
        for name in ["msmarco.v1", "msmarco.v2"] {
            FailureReport::new(RunContext::capture(), name, "load", &err)
                .write(dir.path())
                .unwrap();
        }

        let mut files: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(
            files,
            vec![
                "failure_msmarco.v1.json",
                "failure_msmarco.v1.md",
                "failure_msmarco.v2.json",
                "failure_msmarco.v2.md",
            ]
        );
        let back: FailureReport = load_json(&dir.path().join("failure_msmarco.v2.json")).unwrap();
        assert_eq!(back.dataset, "msmarco.v2");
    }
}
