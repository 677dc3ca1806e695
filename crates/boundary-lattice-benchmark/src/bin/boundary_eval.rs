//! Boundary-Aware Compression Evaluation Binary
//!
//! Runs seeded sweeps of both compression strategies over every configured
//! dataset, then writes stability, comparison and verdict reports.
//!
//! Usage:
//!   boundary-eval [OPTIONS]
//!
//! Options:
//!   --config <PATH>       TOML configuration file
//!   --datasets <A,B>      Only evaluate these configured datasets
//!   --runs <N>            Seeded repetitions per strategy
//!   --seed <N>            Base seed
//!   --grid-min/--grid-max/--grid-steps   Lattice step range
//!   --k-min/--k-max/--k-steps            Cluster count range
//!   --percentile <P>      Boundary ambiguity percentile
//!   --output <DIR>        Output directory
//!   --timeout-secs <N>    Wall-clock budget for the whole evaluation
//!   --sequential          Disable the rayon pool
//!   --quick               Small grid for smoke runs

use std::path::PathBuf;

use clap::Parser;

use boundary_lattice_benchmark::config::EvalConfig;
use boundary_lattice_benchmark::reports::{self, save_json, ReportFormat, RunContext};
use boundary_lattice_benchmark::run_evaluation;

#[derive(Parser, Debug)]
#[command(name = "boundary-eval")]
#[command(about = "Evaluate boundary-aware lattice compression against the uniform baseline")]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated dataset names to evaluate (default: all configured).
    #[arg(long, value_delimiter = ',')]
    datasets: Option<Vec<String>>,

    /// Number of seeded runs per strategy.
    #[arg(long)]
    runs: Option<usize>,

    /// Base seed; run i uses seed + i.
    #[arg(long)]
    seed: Option<u64>,

    /// Smallest lattice step.
    #[arg(long)]
    grid_min: Option<f64>,

    /// Largest lattice step.
    #[arg(long)]
    grid_max: Option<f64>,

    /// Number of lattice steps.
    #[arg(long)]
    grid_steps: Option<usize>,

    /// Smallest cluster count.
    #[arg(long)]
    k_min: Option<usize>,

    /// Largest cluster count.
    #[arg(long)]
    k_max: Option<usize>,

    /// Number of cluster counts.
    #[arg(long)]
    k_steps: Option<usize>,

    /// Ambiguity percentile below which vectors are boundary.
    #[arg(long)]
    percentile: Option<f64>,

    /// Output directory.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Wall-clock budget in seconds; partial results are reported on expiry.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Evaluate sweep points one at a time.
    #[arg(long)]
    sequential: bool,

    /// Small grid for smoke runs (applied before other overrides).
    #[arg(long)]
    quick: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<EvalConfig> {
        let mut config = match &self.config {
            Some(path) => EvalConfig::from_file(path)?,
            None if self.quick => EvalConfig::quick(),
            None => EvalConfig::default(),
        };
        if self.quick && self.config.is_some() {
            let quick = EvalConfig::quick();
            config.sweep = quick.sweep;
            config.runs.count = quick.runs.count;
        }

        if let Some(names) = &self.datasets {
            for name in names {
                if !config.datasets.iter().any(|d| d.name() == name) {
                    anyhow::bail!("Unknown dataset '{}'", name);
                }
            }
            config.datasets.retain(|d| names.iter().any(|n| n == d.name()));
        }
        if let Some(runs) = self.runs {
            config.runs.count = runs;
        }
        if let Some(seed) = self.seed {
            config.runs.base_seed = seed;
        }
        if let Some(v) = self.grid_min {
            config.sweep.step.min = v;
        }
        if let Some(v) = self.grid_max {
            config.sweep.step.max = v;
        }
        if let Some(v) = self.grid_steps {
            config.sweep.step.steps = v;
        }
        if let Some(v) = self.k_min {
            config.sweep.k.min = v;
        }
        if let Some(v) = self.k_max {
            config.sweep.k.max = v;
        }
        if let Some(v) = self.k_steps {
            config.sweep.k.steps = v;
        }
        if let Some(p) = self.percentile {
            config.compression.boundary_percentile = p;
        }
        if let Some(dir) = self.output {
            config.output_dir = dir;
        }
        if self.timeout_secs.is_some() {
            config.execution.timeout_secs = self.timeout_secs;
        }
        if self.sequential {
            config.execution.parallel = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("boundary_lattice_benchmark=info".parse()?)
                .add_directive("boundary_lattice_core=info".parse()?),
        )
        .init();

    let config = Args::parse().into_config()?;
    let context = RunContext::capture();
    let output_dir = config.output_dir.clone();

    tracing::info!(
        datasets = config.datasets.len(),
        runs = config.runs.count,
        steps = config.sweep.step.steps,
        "Starting boundary evaluation"
    );

    let stamp = context.timestamp.format("%Y%m%d_%H%M%S").to_string();
    let outcome = run_evaluation(config, context);

    for failure in &outcome.failures {
        failure.write(&output_dir)?;
    }

    for ds in &outcome.report.datasets {
        save_json(&ds.baseline_runs, &output_dir.join(format!("{}_baseline_runs.json", ds.name)))?;
        save_json(
            &ds.boundary_aware_runs,
            &output_dir.join(format!("{}_boundary_aware_runs.json", ds.name)),
        )?;

        println!(
            "{:<16} threshold: {:<17} ({})  count: {} ({}){}",
            ds.name,
            ds.threshold_verdict.verdict,
            ds.threshold_verdict.confidence,
            if ds.count_verdict.exploitable { "exploitable" } else { "observational" },
            ds.count_verdict.confidence,
            if ds.partial() { "  [partial]" } else { "" }
        );
    }

    if outcome.report.datasets.is_empty() {
        anyhow::bail!(
            "No dataset could be evaluated; failure reports written to {}",
            output_dir.display()
        );
    }

    let base = output_dir.join(format!("boundary_eval_{stamp}"));
    reports::write_to_file(&outcome.report, ReportFormat::Both, &base)?;
    tracing::info!("Reports saved to {}", output_dir.display());

    Ok(())
}
