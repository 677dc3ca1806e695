//! Sweep execution, paired strategy comparison and the full pipeline.

pub mod comparison;
pub mod evaluation;
pub mod sweep;

pub use comparison::{aggregate_means, build_comparison, ComparisonRow};
pub use evaluation::{evaluate_dataset, run_evaluation, EvaluationOutcome};
pub use sweep::{SweepHarness, SweepPoint, SweepRun};
