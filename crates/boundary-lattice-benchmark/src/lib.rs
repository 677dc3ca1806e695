//! Boundary Lattice Benchmark
//!
//! Orchestration around `boundary-lattice-core`: sweeps both compression
//! strategies over a `(step, k)` grid for several seeds, analyzes stability
//! across runs, compares the strategies and writes reports.
//!
//! # Pipeline
//!
//! 1. [`config::EvalConfig`] is loaded from TOML and overridden by CLI flags
//! 2. Each configured dataset is loaded through a [`datasets::VectorProvider`]
//! 3. [`runners::SweepHarness`] evaluates every grid point for both strategies
//! 4. [`analysis`] computes stability summaries and both verdicts
//! 5. [`reports`] writes JSON and Markdown, or a failure report when a dataset
//!    cannot be loaded
//!
//! # Usage
//!
//! ```bash
//! # Quick smoke run over the generated datasets
//! cargo run -p boundary-lattice-benchmark --bin boundary-eval -- --quick
//!
//! # Compare two saved sweeps
//! cargo run -p boundary-lattice-benchmark --bin compare-sweeps -- \
//!     results/baseline_runs.json results/boundary_aware_runs.json
//! ```

pub mod analysis;
pub mod config;
pub mod datasets;
pub mod reports;
pub mod runners;

pub use boundary_lattice_core::{CoreError, CoreResult};
pub use config::EvalConfig;
pub use runners::{run_evaluation, EvaluationOutcome, SweepHarness};
