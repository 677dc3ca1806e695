//! Verdicts on whether boundary-aware compression is worth using.
//!
//! Two independent decision rules live here and are never merged:
//!
//! - [`threshold_verdict`] compares aggregate means of both strategies and
//!   applies fixed recall and overhead thresholds.
//! - [`count_verdict`] counts, over the per-step comparison rows, how often
//!   boundary-aware improves each distortion metric.
//!
//! They answer different questions and may disagree on the same data.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use boundary_lattice_core::types::{metric_names, nan_as_null};
use boundary_lattice_core::MetricRecord;

use crate::config::VerdictConfig;
use crate::runners::ComparisonRow;

/// Outcome of [`threshold_verdict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Significant recall gain at acceptable cost.
    Exploitable,
    /// Positive but marginal recall gain.
    Observational,
    /// No usable gain.
    Rejected,
    /// Nothing to compare.
    InsufficientData,
}

impl Verdict {
    /// Upper-case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Exploitable => "EXPLOITABLE",
            Verdict::Observational => "OBSERVATIONAL",
            Verdict::Rejected => "REJECTED",
            Verdict::InsufficientData => "INSUFFICIENT_DATA",
        }
    }

    /// Follow-up actions for this outcome.
    pub fn recommendations(&self) -> Vec<String> {
        let items: &[&str] = match self {
            Verdict::Exploitable => &[
                "Deploy boundary-aware compression in production",
                "Monitor performance on real-world datasets",
                "Consider publishing findings",
            ],
            Verdict::Observational => &[
                "Signal exists but marginal benefit",
                "Investigate further optimizations",
                "Not ready for production deployment",
            ],
            Verdict::Rejected => &[
                "No significant benefit observed",
                "Focus on alternative approaches",
                "Document failure modes for future reference",
            ],
            Verdict::InsufficientData => &[
                "No metric was comparable between the two strategies",
                "Re-run both strategies over the same grid and dataset",
            ],
        };
        items.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strongly the evidence supports a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Moderate,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "low",
            Confidence::Moderate => "moderate",
            Confidence::High => "high",
        })
    }
}

/// Which direction of change counts as better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Larger values are better.
    HigherIsBetter,
    /// Smaller values are better.
    LowerIsBetter,
}

/// Metrics compared by [`threshold_verdict`], with their direction.
pub fn compared_metrics() -> Vec<(String, Direction)> {
    vec![
        (metric_names::recall_at(10), Direction::HigherIsBetter),
        (metric_names::recall_at(100), Direction::HigherIsBetter),
        (metric_names::MRR.to_string(), Direction::HigherIsBetter),
        (metric_names::ndcg_at(10), Direction::HigherIsBetter),
        (metric_names::NEIGHBORHOOD_OVERLAP.to_string(), Direction::HigherIsBetter),
        (metric_names::LSI.to_string(), Direction::HigherIsBetter),
        (metric_names::MSE_GLOBAL.to_string(), Direction::LowerIsBetter),
        (metric_names::MSE_BOUNDARY.to_string(), Direction::LowerIsBetter),
        (metric_names::COMPRESSION_TIME.to_string(), Direction::LowerIsBetter),
    ]
}

/// Relative improvement of boundary-aware over baseline, as a fraction.
///
/// `None` when either value is not finite or the baseline is zero.
pub fn relative_improvement(baseline: f64, boundary_aware: f64, direction: Direction) -> Option<f64> {
    if !baseline.is_finite() || !boundary_aware.is_finite() || baseline == 0.0 {
        return None;
    }
    Some(match direction {
        Direction::HigherIsBetter => (boundary_aware - baseline) / baseline,
        Direction::LowerIsBetter => (baseline - boundary_aware) / baseline,
    })
}

/// Evidence for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    /// Metric name.
    pub metric: String,
    /// Direction of improvement.
    pub direction: Direction,
    /// Baseline mean.
    pub baseline: f64,
    /// Boundary-aware mean.
    pub boundary_aware: f64,
    /// Improvement in percent.
    pub improvement_pct: f64,
    /// `|improvement|` above the significance threshold.
    pub significant: bool,
}

/// Outcome of [`threshold_verdict`] with its evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdVerdict {
    /// Decision.
    pub verdict: Verdict,
    /// Strength of the evidence.
    pub confidence: Confidence,
    /// Every comparable metric.
    pub comparisons: Vec<MetricComparison>,
    /// `(boundary_time - baseline_time) / baseline_time * 100`, when known.
    pub time_overhead_pct: Option<f64>,
    /// Follow-up actions.
    pub recommendations: Vec<String>,
}

impl ThresholdVerdict {
    /// Evidence for one metric.
    pub fn comparison(&self, metric: &str) -> Option<&MetricComparison> {
        self.comparisons.iter().find(|c| c.metric == metric)
    }
}

/// Decide from aggregate means of both strategies.
///
/// Rules, first match wins:
/// 1. no comparable metric: `InsufficientData`
/// 2. Recall@10 improvement above the significance threshold and time
///    overhead below the ceiling: `Exploitable`
/// 3. Recall@10 improvement in `(0, significance]`: `Observational`
/// 4. otherwise `Rejected`
///
/// An unknown overhead does not block rule 2. A missing Recall@10 counts as
/// no improvement.
pub fn threshold_verdict(baseline: &MetricRecord, boundary_aware: &MetricRecord, config: &VerdictConfig) -> ThresholdVerdict {
    let comparisons: Vec<MetricComparison> = compared_metrics()
        .into_iter()
        .filter_map(|(metric, direction)| {
            let base = baseline.value(&metric);
            let aware = boundary_aware.value(&metric);
            relative_improvement(base, aware, direction).map(|improvement| MetricComparison {
                significant: improvement.abs() > config.significance,
                improvement_pct: improvement * 100.0,
                baseline: base,
                boundary_aware: aware,
                direction,
                metric,
            })
        })
        .collect();

    let time_overhead_pct = relative_improvement(
        baseline.value(metric_names::COMPRESSION_TIME),
        boundary_aware.value(metric_names::COMPRESSION_TIME),
        Direction::HigherIsBetter,
    )
    .map(|fraction| fraction * 100.0);

    let recall_key = metric_names::recall_at(10);
    let improvement_of = |metric: &str| {
        comparisons
            .iter()
            .find(|c| c.metric == metric)
            .map(|c| c.improvement_pct / 100.0)
    };
    let recall_improvement = improvement_of(&recall_key).unwrap_or(0.0);
    let overhead_ok = time_overhead_pct.map_or(true, |pct| pct < config.max_overhead_pct);

    let verdict = if comparisons.is_empty() {
        Verdict::InsufficientData
    } else if recall_improvement > config.significance && overhead_ok {
        Verdict::Exploitable
    } else if recall_improvement > 0.0 && recall_improvement <= config.significance {
        Verdict::Observational
    } else {
        Verdict::Rejected
    };

    let supports = |metric: &str| {
        improvement_of(metric).is_some_and(|imp| {
            let in_direction = match verdict {
                Verdict::Rejected => imp < 0.0,
                _ => imp > 0.0,
            };
            in_direction && imp.abs() > config.significance
        })
    };
    let confidence = if verdict == Verdict::InsufficientData || !supports(&recall_key) {
        Confidence::Low
    } else if supports(metric_names::MRR) && supports(&metric_names::ndcg_at(10)) {
        Confidence::High
    } else {
        Confidence::Moderate
    };

    ThresholdVerdict {
        verdict,
        confidence,
        recommendations: verdict.recommendations(),
        comparisons,
        time_overhead_pct,
    }
}

/// Fraction of rows that must improve for moderate confidence.
pub const MODERATE_IMPROVEMENT_FRACTION: f64 = 0.5;
/// Fraction of rows that must improve for high confidence.
pub const HIGH_IMPROVEMENT_FRACTION: f64 = 0.7;

/// Outcome of [`count_verdict`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountVerdict {
    /// Whether any metric improved anywhere.
    pub exploitable: bool,
    /// Strength of the evidence.
    pub confidence: Confidence,
    /// Rows with comparable global MSE.
    pub rows_compared: usize,
    /// Rows in which boundary-aware improved, per metric.
    pub improvement_counts: BTreeMap<String, usize>,
    /// Largest improving fraction across metrics.
    #[serde(with = "nan_as_null")]
    pub best_fraction: f64,
    /// One-line summary.
    pub summary: String,
}

fn both_finite(row: &ComparisonRow, metric: &str) -> Option<(f64, f64)> {
    Some((row.baseline.finite(metric)?, row.boundary_aware.finite(metric)?))
}

/// Decide from per-step comparison rows by counting improvements.
///
/// Per row: `mse_global` and `mse_boundary` improve when lower,
/// `delta_boundary` when smaller in absolute value, `neighborhood_overlap`
/// and `lsi` when higher. The denominator is the number of rows with a
/// comparable `mse_global`. With no such row the result is not exploitable
/// with low confidence.
pub fn count_verdict(rows: &[ComparisonRow]) -> CountVerdict {
    type Better = fn(f64, f64) -> bool;
    let rules: [(&str, Better); 5] = [
        (metric_names::MSE_GLOBAL, |base, aware| aware < base),
        (metric_names::MSE_BOUNDARY, |base, aware| aware < base),
        (metric_names::DELTA_BOUNDARY, |base, aware| aware.abs() < base.abs()),
        (metric_names::NEIGHBORHOOD_OVERLAP, |base, aware| aware > base),
        (metric_names::LSI, |base, aware| aware > base),
    ];

    let mut counts: BTreeMap<String, usize> = rules.iter().map(|(m, _)| (m.to_string(), 0)).collect();
    let mut rows_compared = 0;
    for row in rows {
        if both_finite(row, metric_names::MSE_GLOBAL).is_some() {
            rows_compared += 1;
        }
        for (metric, better) in &rules {
            if let Some((base, aware)) = both_finite(row, metric) {
                if better(base, aware) {
                    *counts.entry(metric.to_string()).or_default() += 1;
                }
            }
        }
    }

    if rows_compared == 0 {
        return CountVerdict {
            exploitable: false,
            confidence: Confidence::Low,
            rows_compared,
            improvement_counts: counts,
            best_fraction: f64::NAN,
            summary: "No comparable rows, nothing to decide".to_string(),
        };
    }

    let best = counts.values().copied().max().unwrap_or(0);
    let best_fraction = best as f64 / rows_compared as f64;
    let (exploitable, confidence, summary) = if best_fraction >= HIGH_IMPROVEMENT_FRACTION {
        (true, Confidence::High, "Consistent improvement in at least 70% of rows")
    } else if best_fraction >= MODERATE_IMPROVEMENT_FRACTION {
        (true, Confidence::Moderate, "Moderate improvement in at least 50% of rows")
    } else if best > 0 {
        (true, Confidence::Low, "Marginal improvement in some rows")
    } else {
        (false, Confidence::High, "No measurable improvement, boundary geometry is observational only")
    };

    CountVerdict {
        exploitable,
        confidence,
        rows_compared,
        improvement_counts: counts,
        best_fraction,
        summary: summary.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, f64)]) -> MetricRecord {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn row(step: f64, base: &[(&str, f64)], aware: &[(&str, f64)]) -> ComparisonRow {
        ComparisonRow {
            step,
            baseline: record(base),
            boundary_aware: record(aware),
        }
    }

    // =========================================================================
    // Threshold verdict
    // =========================================================================

    #[test]
    fn test_exploitable_with_small_overhead() {
        let base = record(&[("recall@10", 0.50), ("compression_time_seconds", 1.0)]);
        let aware = record(&[("recall@10", 0.52), ("compression_time_seconds", 1.1)]);
        let v = threshold_verdict(&base, &aware, &VerdictConfig::default());
        assert_eq!(v.verdict, Verdict::Exploitable);
        assert!((v.time_overhead_pct.unwrap() - 10.0).abs() < 1e-9);
        let recall = v.comparison("recall@10").unwrap();
        assert!((recall.improvement_pct - 4.0).abs() < 1e-9);
        assert!(recall.significant);
        assert_eq!(v.confidence, Confidence::Moderate);
        assert_eq!(v.recommendations[0], "Deploy boundary-aware compression in production");
    }

    #[test]
    fn test_overhead_ceiling_blocks_exploitable() {
        let base = record(&[("recall@10", 0.50), ("compression_time_seconds", 1.0)]);
        let aware = record(&[("recall@10", 0.60), ("compression_time_seconds", 2.5)]);
        let v = threshold_verdict(&base, &aware, &VerdictConfig::default());
        assert_eq!(v.verdict, Verdict::Rejected);
    }

    #[test]
    fn test_unknown_overhead_is_acceptable() {
        let base = record(&[("recall@10", 0.50)]);
        let aware = record(&[("recall@10", 0.60)]);
        let v = threshold_verdict(&base, &aware, &VerdictConfig::default());
        assert_eq!(v.verdict, Verdict::Exploitable);
        assert!(v.time_overhead_pct.is_none());
    }

    #[test]
    fn test_observational_and_rejected() {
        let config = VerdictConfig::default();
        let base = record(&[("recall@10", 0.50)]);
        let v = threshold_verdict(&base, &record(&[("recall@10", 0.505)]), &config);
        assert_eq!(v.verdict, Verdict::Observational);
        assert_eq!(v.confidence, Confidence::Low);

        let v = threshold_verdict(&base, &record(&[("recall@10", 0.50)]), &config);
        assert_eq!(v.verdict, Verdict::Rejected);
    }

    #[test]
    fn test_insufficient_data() {
        let config = VerdictConfig::default();
        let v = threshold_verdict(&MetricRecord::new(), &MetricRecord::new(), &config);
        assert_eq!(v.verdict, Verdict::InsufficientData);

        // Zero baselines are not comparable.
        let v = threshold_verdict(&record(&[("mrr", 0.0)]), &record(&[("mrr", 0.3)]), &config);
        assert_eq!(v.verdict, Verdict::InsufficientData);
        assert_eq!(v.confidence, Confidence::Low);
    }

    #[test]
    fn test_high_confidence_needs_all_ranking_metrics() {
        let base = record(&[("recall@10", 0.5), ("mrr", 0.4), ("ndcg@10", 0.45)]);
        let aware = record(&[("recall@10", 0.6), ("mrr", 0.5), ("ndcg@10", 0.55)]);
        let v = threshold_verdict(&base, &aware, &VerdictConfig::default());
        assert_eq!(v.verdict, Verdict::Exploitable);
        assert_eq!(v.confidence, Confidence::High);
    }

    #[test]
    fn test_lower_is_better_sign() {
        assert_eq!(relative_improvement(0.4, 0.2, Direction::LowerIsBetter), Some(0.5));
        assert_eq!(relative_improvement(0.4, 0.2, Direction::HigherIsBetter), Some(-0.5));
        assert_eq!(relative_improvement(f64::NAN, 0.2, Direction::HigherIsBetter), None);
    }

    // =========================================================================
    // Count verdict
    // =========================================================================

    #[test]
    fn test_count_verdict_high() {
        let rows: Vec<ComparisonRow> = (0..10)
            .map(|i| {
                let aware_mse = if i < 8 { 0.1 } else { 0.3 };
                row(i as f64, &[("mse_global", 0.2)], &[("mse_global", aware_mse)])
            })
            .collect();
        let v = count_verdict(&rows);
        assert!(v.exploitable);
        assert_eq!(v.confidence, Confidence::High);
        assert_eq!(v.rows_compared, 10);
        assert_eq!(v.improvement_counts["mse_global"], 8);
    }

    #[test]
    fn test_count_verdict_moderate_and_low() {
        let rows: Vec<ComparisonRow> = (0..4)
            .map(|i| {
                let aware = if i < 2 { 0.9 } else { 0.1 };
                row(i as f64, &[("mse_global", 0.2), ("lsi", 0.5)], &[("mse_global", 0.3), ("lsi", aware)])
            })
            .collect();
        let v = count_verdict(&rows);
        assert_eq!(v.confidence, Confidence::Moderate);

        let rows: Vec<ComparisonRow> = (0..4)
            .map(|i| {
                let aware = if i == 0 { 0.1 } else { 0.3 };
                row(i as f64, &[("mse_global", 0.2)], &[("mse_global", aware)])
            })
            .collect();
        let v = count_verdict(&rows);
        assert!(v.exploitable);
        assert_eq!(v.confidence, Confidence::Low);
    }

    #[test]
    fn test_count_verdict_none_improve() {
        let rows = vec![row(
            0.1,
            &[("mse_global", 0.2), ("delta_boundary", 0.1)],
            &[("mse_global", 0.3), ("delta_boundary", -0.2)],
        )];
        let v = count_verdict(&rows);
        assert!(!v.exploitable);
        assert_eq!(v.confidence, Confidence::High);
    }

    #[test]
    fn test_count_verdict_without_comparable_rows() {
        let rows = vec![row(0.1, &[("lsi", 0.2)], &[("lsi", 0.5)])];
        let v = count_verdict(&rows);
        assert!(!v.exploitable);
        assert_eq!(v.confidence, Confidence::Low);
        assert_eq!(v.rows_compared, 0);
        assert!(count_verdict(&[]).best_fraction.is_nan());
    }

    #[test]
    fn test_verdict_serializes_upper_case() {
        let json = serde_json::to_string(&Verdict::InsufficientData).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_DATA\"");
        let json = serde_json::to_string(&Confidence::Moderate).unwrap();
        assert_eq!(json, "\"moderate\"");
    }
}
