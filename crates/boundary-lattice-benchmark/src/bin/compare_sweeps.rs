//! Compare two saved sweeps.
//!
//! Loads a baseline and a boundary-aware sweep-run file written by
//! `boundary-eval`, builds the per-step comparison table and prints both
//! verdicts.
//!
//! Usage:
//!   compare-sweeps <BASELINE> <BOUNDARY_AWARE> [--output <BASE_PATH>]

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Serialize;

use boundary_lattice_benchmark::analysis::{count_verdict, threshold_verdict, CountVerdict, ThresholdVerdict};
use boundary_lattice_benchmark::config::VerdictConfig;
use boundary_lattice_benchmark::reports::{load_json, render_comparison, save_json};
use boundary_lattice_benchmark::runners::{aggregate_means, build_comparison, ComparisonRow, SweepRun};
use boundary_lattice_core::Strategy;

#[derive(Parser, Debug)]
#[command(name = "compare-sweeps")]
#[command(about = "Compare saved baseline and boundary-aware sweep runs")]
struct Args {
    /// Baseline sweep runs (JSON).
    baseline: PathBuf,

    /// Boundary-aware sweep runs (JSON).
    boundary_aware: PathBuf,

    /// Write `<path>.json` and `<path>.md`.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Significance threshold for the threshold verdict.
    #[arg(long, default_value_t = 0.02)]
    significance: f64,

    /// Largest acceptable time overhead, in percent.
    #[arg(long, default_value_t = 100.0)]
    max_overhead_pct: f64,
}

#[derive(Serialize)]
struct ComparisonOutput<'a> {
    comparison: &'a [ComparisonRow],
    threshold_verdict: &'a ThresholdVerdict,
    count_verdict: &'a CountVerdict,
}

fn check_strategy(runs: &[SweepRun], expected: Strategy, path: &Path) -> anyhow::Result<()> {
    if let Some(run) = runs.iter().find(|r| r.strategy != expected) {
        anyhow::bail!(
            "{} holds a {} run, expected {}",
            path.display(),
            run.strategy,
            expected
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("boundary_lattice_benchmark=info".parse()?),
        )
        .init();

    let args = Args::parse();

    tracing::info!("Loading baseline: {}", args.baseline.display());
    let baseline: Vec<SweepRun> = load_json(&args.baseline)?;
    tracing::info!("Loading boundary-aware: {}", args.boundary_aware.display());
    let aware: Vec<SweepRun> = load_json(&args.boundary_aware)?;

    check_strategy(&baseline, Strategy::Baseline, &args.baseline)?;
    check_strategy(&aware, Strategy::BoundaryAware, &args.boundary_aware)?;

    let config = VerdictConfig {
        significance: args.significance,
        max_overhead_pct: args.max_overhead_pct,
    };
    let rows = build_comparison(&baseline, &aware);
    let threshold = threshold_verdict(&aggregate_means(&baseline), &aggregate_means(&aware), &config);
    let count = count_verdict(&rows);

    let md = render_comparison(&rows, &threshold, &count);
    println!("{md}");

    if let Some(base) = &args.output {
        let output = ComparisonOutput {
            comparison: &rows,
            threshold_verdict: &threshold,
            count_verdict: &count,
        };
        save_json(&output, &base.with_extension("json"))?;
        let md_path = base.with_extension("md");
        std::fs::write(&md_path, md)?;
        tracing::info!("Comparison saved to {}", md_path.display());
    }

    Ok(())
}
