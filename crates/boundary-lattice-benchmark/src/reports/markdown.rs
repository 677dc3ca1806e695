//! Markdown report generation.

use boundary_lattice_core::types::metric_names;

use super::json::{DatasetReport, RunReport};
use crate::analysis::{CountVerdict, StabilitySummary, ThresholdVerdict};
use crate::runners::ComparisonRow;

fn fmt_value(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.6}")
    } else {
        "n/a".to_string()
    }
}

fn fmt_steps(steps: &[f64]) -> String {
    if steps.is_empty() {
        "none".to_string()
    } else {
        steps.iter().map(|s| format!("{s:.3}")).collect::<Vec<_>>().join(", ")
    }
}

/// Full Markdown report for a run.
pub fn render_run_report(report: &RunReport) -> String {
    let mut md = String::new();
    let ctx = &report.context;

    md.push_str("# Boundary-Aware Lattice Compression Evaluation\n\n");
    md.push_str(&format!("**Generated:** {}\n\n", ctx.timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
    md.push_str(&format!(
        "**Platform:** {} / {} ({} CPUs)\n\n",
        ctx.platform, ctx.arch, ctx.cpu_count
    ));
    md.push_str(&format!("**Version:** {}", ctx.crate_version));
    if let Some(commit) = &ctx.git_commit {
        md.push_str(&format!(" (commit `{commit}`)"));
    }
    md.push_str("\n\n");

    let sweep = &report.config.sweep;
    md.push_str(&format!(
        "**Grid:** step {}..{} x {}, k {}..{} x {}, {} runs from seed {}\n\n",
        sweep.step.min,
        sweep.step.max,
        sweep.step.steps,
        sweep.k.min,
        sweep.k.max,
        sweep.k.steps,
        report.config.runs.count,
        report.config.runs.base_seed
    ));

    md.push_str("## Summary\n\n");
    md.push_str("| Dataset | Source | Vectors | Dim | Threshold verdict | Count verdict |\n");
    md.push_str("|---------|--------|---------|-----|-------------------|---------------|\n");
    for ds in &report.datasets {
        md.push_str(&format!(
            "| {} | {:?} | {} | {} | {} ({}) | {} ({}) |\n",
            ds.name,
            ds.source,
            ds.vectors,
            ds.dimension,
            ds.threshold_verdict.verdict,
            ds.threshold_verdict.confidence,
            if ds.count_verdict.exploitable { "exploitable" } else { "observational only" },
            ds.count_verdict.confidence,
        ));
    }
    md.push('\n');

    for ds in &report.datasets {
        write_dataset(&mut md, ds);
    }

    md
}

fn write_dataset(md: &mut String, ds: &DatasetReport) {
    md.push_str(&format!("## Dataset: {}\n\n", ds.name));
    md.push_str(&format!("Retrieval scored by {:?}.\n\n", ds.mode));
    if ds.partial() {
        md.push_str("**Partial results:** the wall-clock budget ran out before every point was evaluated.\n\n");
    }

    md.push_str("### Stability\n\n");
    write_stability(md, "Baseline", &ds.baseline_stability);
    write_stability(md, "Boundary-aware", &ds.boundary_aware_stability);

    md.push_str("### Comparison\n\n");
    write_comparison_table(md, &ds.comparison);
    write_threshold_verdict(md, &ds.threshold_verdict);
    write_count_verdict(md, &ds.count_verdict);
}

fn write_stability(md: &mut String, label: &str, s: &StabilitySummary) {
    md.push_str(&format!("**{label}** ({}, {} runs)\n\n", s.target_metric, s.run_count));
    md.push_str("| Step | Mean | Std | Runs | High variance |\n");
    md.push_str("|------|------|-----|------|---------------|\n");
    for step in &s.steps {
        md.push_str(&format!(
            "| {:.4} | {} | {} | {} | {} |\n",
            step.step,
            fmt_value(step.mean),
            fmt_value(step.std),
            step.run_count,
            if step.high_variance { "yes" } else { "" }
        ));
    }
    md.push('\n');

    let crossings: Vec<String> = s
        .zero_crossings
        .iter()
        .map(|(a, b)| format!("{a:.3}..{b:.3}"))
        .collect();
    md.push_str(&format!(
        "- Zero crossings: {}\n",
        if crossings.is_empty() { "none".to_string() } else { crossings.join(", ") }
    ));
    md.push_str(&format!(
        "- Collapse threshold: {}\n",
        s.collapse_threshold.map_or("none".to_string(), |t| format!("{t:.3}"))
    ));
    md.push_str(&format!("- Stable: {}\n", fmt_steps(&s.regions.stable)));
    md.push_str(&format!("- Ridge: {}\n", fmt_steps(&s.regions.ridge)));
    md.push_str(&format!("- Instability: {}\n", fmt_steps(&s.regions.instability)));
    md.push_str(&format!(
        "- Range of means: [{}, {}], average std {}\n\n",
        fmt_value(s.delta_range.min),
        fmt_value(s.delta_range.max),
        fmt_value(s.average_std)
    ));
}

fn write_comparison_table(md: &mut String, rows: &[ComparisonRow]) {
    let columns = [
        metric_names::MSE_GLOBAL,
        metric_names::DELTA_BOUNDARY,
        metric_names::NEIGHBORHOOD_OVERLAP,
        metric_names::LSI,
    ];
    md.push_str("| Step |");
    for c in &columns {
        md.push_str(&format!(" {c} (base) | {c} (aware) |"));
    }
    md.push('\n');
    md.push_str("|------|");
    for _ in &columns {
        md.push_str("------|------|");
    }
    md.push('\n');

    for row in rows {
        md.push_str(&format!("| {:.4} |", row.step));
        for c in &columns {
            md.push_str(&format!(
                " {} | {} |",
                fmt_value(row.baseline.value(c)),
                fmt_value(row.boundary_aware.value(c))
            ));
        }
        md.push('\n');
    }
    md.push('\n');
}

fn write_threshold_verdict(md: &mut String, v: &ThresholdVerdict) {
    md.push_str(&format!(
        "**Threshold verdict:** {} (confidence: {})\n\n",
        v.verdict, v.confidence
    ));
    if !v.comparisons.is_empty() {
        md.push_str("| Metric | Baseline | Boundary-aware | Improvement | Significant |\n");
        md.push_str("|--------|----------|----------------|-------------|-------------|\n");
        for c in &v.comparisons {
            md.push_str(&format!(
                "| {} | {} | {} | {:+.2}% | {} |\n",
                c.metric,
                fmt_value(c.baseline),
                fmt_value(c.boundary_aware),
                c.improvement_pct,
                if c.significant { "yes" } else { "no" }
            ));
        }
        md.push('\n');
    }
    if let Some(overhead) = v.time_overhead_pct {
        md.push_str(&format!("Time overhead: {overhead:+.1}%\n\n"));
    }
    md.push_str("Recommendations:\n\n");
    for (i, r) in v.recommendations.iter().enumerate() {
        md.push_str(&format!("{}. {}\n", i + 1, r));
    }
    md.push('\n');
}

fn write_count_verdict(md: &mut String, v: &CountVerdict) {
    md.push_str(&format!(
        "**Count verdict:** {} (confidence: {}). {}\n\n",
        if v.exploitable { "EXPLOITABLE" } else { "OBSERVATIONAL ONLY" },
        v.confidence,
        v.summary
    ));
    md.push_str(&format!("Rows compared: {}\n\n", v.rows_compared));
    for (metric, count) in &v.improvement_counts {
        md.push_str(&format!("- {metric}: improved in {count} rows\n"));
    }
    md.push('\n');
}

/// Markdown for a standalone comparison (no stability section).
pub fn render_comparison(rows: &[ComparisonRow], threshold: &ThresholdVerdict, count: &CountVerdict) -> String {
    let mut md = String::new();
    md.push_str("# Baseline vs Boundary-Aware Comparison\n\n");
    write_comparison_table(&mut md, rows);
    write_threshold_verdict(&mut md, threshold);
    write_count_verdict(&mut md, count);
    md
}
