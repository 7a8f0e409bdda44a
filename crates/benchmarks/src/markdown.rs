// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Markdown output generation for reports and comparisons.
//!
//! Produces tables suitable for pasting into a pull request or a CI job
//! summary.

use crate::io::ComparisonDocument;
use gh_perf_report_core::{ComparisonKind, JobConclusion, JobResult, WorkflowReport};
use std::fmt::Write;

const MISSING: &str = "-";

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn number(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.precision$}"))
}

fn signed(value: Option<f64>, precision: usize, suffix: &str) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:+.precision$}{suffix}"))
}

fn conclusion(job: &JobResult) -> String {
    job.conclusion
        .as_ref()
        .map_or_else(|| job.status.to_string(), |c| c.to_string())
}

/// Generate a markdown summary of a workflow report.
pub fn generate_report(report: &WorkflowReport) -> String {
    let mut output = String::new();
    let stage_count = report.max_stage_count();

    writeln!(output, "# Performance Report: {} #{}", report.repo, report.run_id).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Generated: {}", chrono::Utc::now().to_rfc3339()).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "| Workflow | Branch | Created | Status | Conclusion |").unwrap();
    writeln!(output, "|----------|--------|---------|--------|------------|").unwrap();
    writeln!(
        output,
        "| {} | {} | {} | {} | {} |",
        cell(&report.workflow_name),
        cell(&report.branch),
        report.created_at,
        report.status,
        report.conclusion.as_ref().map_or(MISSING, JobConclusion::as_str)
    )
    .unwrap();
    writeln!(output).unwrap();

    writeln!(output, "## Jobs").unwrap();
    writeln!(output).unwrap();
    write!(output, "| Job | Result | Samples/s | Device Perf (ms) | Ops |").unwrap();
    for stage in 1..=stage_count {
        write!(output, " Stage {stage} (ms) |").unwrap();
    }
    writeln!(output).unwrap();
    write!(output, "|-----|--------|-----------|------------------|-----|").unwrap();
    for _ in 0..stage_count {
        write!(output, "------|").unwrap();
    }
    writeln!(output).unwrap();

    for job in &report.jobs {
        let device = job.device_perf_metrics.as_ref();
        write!(
            output,
            "| {} | {} | {} | {} | {} |",
            cell(&job.job_name),
            conclusion(job),
            number(job.samples_per_second(), 2),
            number(device.map(|d| d.total_op_duration_ms()), 3),
            device.map_or_else(|| MISSING.to_string(), |d| d.filtered_op_count.to_string()),
        )
        .unwrap();
        for index in 0..stage_count {
            let stage = device.and_then(|d| d.stages.get(index));
            write!(output, " {} |", number(stage.map(|s| s.duration_ms()), 3)).unwrap();
        }
        writeln!(output).unwrap();
    }

    let failures: Vec<_> = report
        .jobs
        .iter()
        .filter(|j| j.failed_step.is_some() || j.error_message.is_some())
        .collect();
    if !failures.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "## Failures").unwrap();
        writeln!(output).unwrap();
        for job in failures {
            writeln!(output, "### {}", job.job_name).unwrap();
            writeln!(output).unwrap();
            if let Some(step) = &job.failed_step {
                writeln!(output, "**Failed step:** {step}").unwrap();
                writeln!(output).unwrap();
            }
            if let Some(message) = &job.error_message {
                writeln!(output, "```").unwrap();
                writeln!(output, "{message}").unwrap();
                writeln!(output, "```").unwrap();
                writeln!(output).unwrap();
            }
        }
    }

    writeln!(output, "---").unwrap();
    writeln!(
        output,
        "Total jobs: {} (success: {}, failure: {}, skipped: {})",
        report.jobs.len(),
        report.success_count(),
        report.failure_count(),
        report.skipped_count()
    )
    .unwrap();

    output
}

/// Generate a markdown summary of a comparison.
pub fn generate_comparison(document: &ComparisonDocument) -> String {
    let mut output = String::new();
    let summary = &document.summary;

    writeln!(output, "# Performance Comparison").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Generated: {}", document.generated_at.to_rfc3339()).unwrap();
    writeln!(output).unwrap();
    writeln!(
        output,
        "- **Baseline:** {} #{}",
        document.baseline_repo, document.baseline_run_id
    )
    .unwrap();
    writeln!(
        output,
        "- **Current:** {} #{}",
        document.current_repo, document.current_run_id
    )
    .unwrap();
    writeln!(output).unwrap();
    writeln!(
        output,
        "**{}** regressions, **{}** improvements, {} neutral, {} new, {} removed",
        summary.regressions, summary.improvements, summary.neutral, summary.new, summary.removed
    )
    .unwrap();
    writeln!(output).unwrap();

    writeln!(
        output,
        "| Job | Result | Baseline Samples/s | Current Samples/s | Change | Baseline Device (ms) | Current Device (ms) | Change |"
    )
    .unwrap();
    writeln!(
        output,
        "|-----|--------|--------------------|-------------------|--------|----------------------|---------------------|--------|"
    )
    .unwrap();

    for c in &document.comparisons {
        let base = c.baseline.as_ref();
        let cur = c.current.as_ref();
        let kind = match c.kind() {
            ComparisonKind::Regression => "🔴 regression",
            ComparisonKind::Improvement => "🟢 improvement",
            ComparisonKind::Neutral => "neutral",
            ComparisonKind::New => "new",
            ComparisonKind::Removed => "removed",
        };
        writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} | {} |",
            cell(&c.job_name),
            kind,
            number(base.and_then(JobResult::samples_per_second), 2),
            number(cur.and_then(JobResult::samples_per_second), 2),
            signed(c.samples_per_sec_percent_change, 2, "%"),
            number(base.and_then(|j| j.device_perf_metrics.as_ref()).map(|d| d.total_op_duration_ms()), 3),
            number(cur.and_then(|j| j.device_perf_metrics.as_ref()).map(|d| d.total_op_duration_ms()), 3),
            signed(c.device_perf_percent_change, 2, "%"),
        )
        .unwrap();
    }

    output
}
