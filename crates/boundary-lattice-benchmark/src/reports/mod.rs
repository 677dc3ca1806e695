//! Report generation for evaluation results.
//!
//! Supports JSON for round-trippable persistence and Markdown for reading.
//! Process-wide facts (time, platform, git commit) are captured once in a
//! [`RunContext`] and handed to every report builder.

pub mod failure;
pub mod json;
pub mod markdown;

use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use boundary_lattice_core::{CoreError, CoreResult};

pub use failure::FailureReport;
pub use json::{load_json, save_json, DatasetReport, RunReport};
pub use markdown::{render_comparison, render_run_report};

/// Report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// JSON only.
    Json,
    /// Markdown only.
    Markdown,
    /// Both formats.
    Both,
}

impl ReportFormat {
    fn json(self) -> bool {
        matches!(self, ReportFormat::Json | ReportFormat::Both)
    }

    fn markdown(self) -> bool {
        matches!(self, ReportFormat::Markdown | ReportFormat::Both)
    }
}

/// Facts about the invocation that produced a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    /// When the invocation started.
    pub timestamp: DateTime<Utc>,
    /// Operating system (linux, macos, windows).
    pub platform: String,
    /// CPU architecture.
    pub arch: String,
    /// Logical CPUs available.
    pub cpu_count: usize,
    /// Version of this crate.
    pub crate_version: String,
    /// `git rev-parse HEAD`, when run inside a repository.
    pub git_commit: Option<String>,
}

impl RunContext {
    /// Capture the current process context.
    pub fn capture() -> Self {
        Self {
            timestamp: Utc::now(),
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_count: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            git_commit: git_commit(),
        }
    }
}

fn git_commit() -> Option<String> {
    let output = Command::new("git").args(["rev-parse", "HEAD"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!commit.is_empty()).then_some(commit)
}

/// Create the parent directory of `path` if needed.
pub(crate) fn ensure_parent(path: &Path) -> CoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| CoreError::Io(format!("create {}: {e}", parent.display())))?;
    }
    Ok(())
}

/// Write `contents` to `path`, creating parent directories.
pub(crate) fn write_text(path: &Path, contents: &str) -> CoreResult<()> {
    ensure_parent(path)?;
    std::fs::write(path, contents).map_err(|e| CoreError::Io(format!("write {}: {e}", path.display())))
}

/// Write a run report as `<base>.json` and/or `<base>.md`.
pub fn write_to_file(report: &RunReport, format: ReportFormat, base_path: &Path) -> CoreResult<()> {
    if format.json() {
        let json_path = base_path.with_extension("json");
        save_json(report, &json_path)?;
    }
    if format.markdown() {
        let md_path = base_path.with_extension("md");
        write_text(&md_path, &render_run_report(report))?;
        info!("Saved markdown report to {}", md_path.display());
    }
    Ok(())
}
