//! Statistical analysis of sweep results.
//!
//! - [`stability`]: per-step mean/std, zero crossings, collapse detection
//! - [`verdict`]: threshold-based and count-based decisions

pub mod stability;
pub mod verdict;

pub use stability::{analyze, find_zero_crossings, StabilitySummary, StepStats};
pub use verdict::{count_verdict, threshold_verdict, Confidence, CountVerdict, ThresholdVerdict, Verdict};
