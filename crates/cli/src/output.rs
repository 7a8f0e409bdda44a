// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Plain-text rendering of reports and comparisons for the terminal.

use colored::{ColoredString, Colorize};
use gh_perf_report_benchmarks::{ComparisonDocument, ReportOptions};
use gh_perf_report_core::{
    ComparisonKind, JobConclusion, JobDescriptor, JobResult, JobStatus, WorkflowReport,
};
use std::fmt::Write;

const MISSING: &str = "-";
const JOB_WIDTH: usize = 48;

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn number(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.precision$}"))
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:+.2}%"))
}

fn paint_conclusion(label: String, conclusion: Option<&JobConclusion>) -> ColoredString {
    match conclusion {
        Some(JobConclusion::Success) => label.green(),
        Some(JobConclusion::Failure) => label.red(),
        Some(JobConclusion::Skipped) | Some(JobConclusion::Cancelled) => label.dimmed(),
        _ => label.normal(),
    }
}

fn result_cell(status: &JobStatus, conclusion: Option<&JobConclusion>, width: usize) -> String {
    let label = conclusion.map_or_else(|| status.to_string(), |c| c.to_string());
    // Pad before coloring so escape codes do not skew the columns.
    paint_conclusion(format!("{label:<width$}"), conclusion).to_string()
}

fn job_result_cell(job: &JobResult, width: usize) -> String {
    result_cell(&job.status, job.conclusion.as_ref(), width)
}

fn kind_cell(kind: ComparisonKind, width: usize) -> String {
    let label = format!("{:<width$}", kind.to_string());
    match kind {
        ComparisonKind::Regression => label.red().bold(),
        ComparisonKind::Improvement => label.green().bold(),
        ComparisonKind::New => label.cyan(),
        ComparisonKind::Removed => label.yellow(),
        ComparisonKind::Neutral => label.normal(),
    }
    .to_string()
}

/// Render a workflow report as a table with a totals line.
pub fn render_report(report: &WorkflowReport) -> String {
    let mut out = String::new();

    writeln!(out, "{}", format!("{} #{}", report.repo, report.run_id).bold()).unwrap();
    writeln!(
        out,
        "Workflow: {} | Branch: {} | Created: {} | Result: {}",
        report.workflow_name,
        report.branch,
        report.created_at,
        paint_conclusion(report.outcome().to_string(), report.conclusion.as_ref())
    )
    .unwrap();
    writeln!(out).unwrap();

    writeln!(
        out,
        "{:<JOB_WIDTH$}  {:<10}  {:>12}  {:>14}  {:>6}",
        "JOB", "RESULT", "SAMPLES/S", "DEVICE (ms)", "OPS"
    )
    .unwrap();
    for job in &report.jobs {
        let device = job.device_perf_metrics.as_ref();
        writeln!(
            out,
            "{:<JOB_WIDTH$}  {}  {:>12}  {:>14}  {:>6}",
            truncate(&job.job_name, JOB_WIDTH),
            job_result_cell(job, 10),
            number(job.samples_per_second(), 2),
            number(device.map(|d| d.total_op_duration_ms()), 3),
            device.map_or_else(|| MISSING.to_string(), |d| d.filtered_op_count.to_string()),
        )
        .unwrap();
        if let Some(message) = &job.error_message {
            writeln!(out, "    {}", message.lines().next().unwrap_or_default().red()).unwrap();
        }
    }

    writeln!(out).unwrap();
    writeln!(
        out,
        "Total jobs: {} (success: {}, failure: {}, skipped: {})",
        report.jobs.len(),
        report.success_count().to_string().green(),
        report.failure_count().to_string().red(),
        report.skipped_count()
    )
    .unwrap();
    out
}

/// Render a comparison as a table with a classification summary.
pub fn render_comparison(document: &ComparisonDocument) -> String {
    let mut out = String::new();
    let summary = &document.summary;

    writeln!(
        out,
        "{}",
        format!(
            "Baseline {} #{}  ->  Current {} #{}",
            document.baseline_repo,
            document.baseline_run_id,
            document.current_repo,
            document.current_run_id
        )
        .bold()
    )
    .unwrap();
    writeln!(out).unwrap();

    writeln!(
        out,
        "{:<JOB_WIDTH$}  {:<11}  {:>10}  {:>10}  {:>9}  {:>12}  {:>12}  {:>9}",
        "JOB", "RESULT", "BASE S/S", "CUR S/S", "CHANGE", "BASE DEV ms", "CUR DEV ms", "CHANGE"
    )
    .unwrap();
    for c in &document.comparisons {
        let base = c.baseline.as_ref();
        let cur = c.current.as_ref();
        let device_ms = |job: Option<&JobResult>| {
            job.and_then(|j| j.device_perf_metrics.as_ref())
                .map(|d| d.total_op_duration_ms())
        };
        writeln!(
            out,
            "{:<JOB_WIDTH$}  {}  {:>10}  {:>10}  {:>9}  {:>12}  {:>12}  {:>9}",
            truncate(&c.job_name, JOB_WIDTH),
            kind_cell(c.kind(), 11),
            number(base.and_then(JobResult::samples_per_second), 2),
            number(cur.and_then(JobResult::samples_per_second), 2),
            percent(c.samples_per_sec_percent_change),
            number(device_ms(base), 3),
            number(device_ms(cur), 3),
            percent(c.device_perf_percent_change),
        )
        .unwrap();
    }

    writeln!(out).unwrap();
    writeln!(
        out,
        "{} regressions, {} improvements, {} neutral, {} new, {} removed, {} status changes",
        summary.regressions.to_string().red().bold(),
        summary.improvements.to_string().green().bold(),
        summary.neutral,
        summary.new,
        summary.removed,
        summary.status_changed
    )
    .unwrap();
    out
}

/// Render every job of a run, one per line, flagging benchmark jobs.
pub fn render_jobs(jobs: &[JobDescriptor], options: &ReportOptions) -> String {
    let mut out = String::new();
    let mut benchmarks = 0;
    for job in jobs {
        let is_benchmark = options.is_benchmark_job(&job.name);
        if is_benchmark {
            benchmarks += 1;
        }
        writeln!(
            out,
            "{:>12}  {}  {:<5}  {}",
            job.id,
            result_cell(&job.status, job.conclusion.as_ref(), 11),
            if is_benchmark { "bench" } else { MISSING },
            job.name
        )
        .unwrap();
    }
    writeln!(out, "{} jobs, {} benchmark jobs", jobs.len(), benchmarks).unwrap();
    out
}
