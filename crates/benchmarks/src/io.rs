// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! I/O operations for reports and comparisons.
//!
//! This module writes computed reports and comparisons to the filesystem as
//! JSON or Markdown, and reads JSON reports back.

use crate::compare::{summarize, ComparisonSummary};
use crate::markdown;
use chrono::{DateTime, Utc};
use gh_perf_report_core::{ComparisonResult, WorkflowReport};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// A comparison together with the runs it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonDocument {
    /// Baseline run identifier.
    pub baseline_run_id: u64,
    /// Baseline `owner/repo`.
    pub baseline_repo: String,
    /// Current run identifier.
    pub current_run_id: u64,
    /// Current `owner/repo`.
    pub current_repo: String,
    /// When the comparison was computed.
    pub generated_at: DateTime<Utc>,
    /// Counts per classification.
    pub summary: ComparisonSummary,
    /// Per-job comparisons, sorted by job key.
    pub comparisons: Vec<ComparisonResult>,
}

impl ComparisonDocument {
    /// Wrap `comparisons` of `baseline` against `current`.
    pub fn new(
        baseline: &WorkflowReport,
        current: &WorkflowReport,
        comparisons: Vec<ComparisonResult>,
    ) -> Self {
        Self {
            baseline_run_id: baseline.run_id,
            baseline_repo: baseline.repo.clone(),
            current_run_id: current.run_id,
            current_repo: current.repo.clone(),
            generated_at: Utc::now(),
            summary: summarize(&comparisons),
            comparisons,
        }
    }
}

fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Write any serializable value as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    fs::write(path, json)
}

/// Write a report as JSON.
pub fn write_report_json(report: &WorkflowReport, path: impl AsRef<Path>) -> io::Result<()> {
    write_json(report, path)
}

/// Read a report written by [`write_report_json`].
pub fn read_report_json(path: impl AsRef<Path>) -> io::Result<WorkflowReport> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write a comparison document as JSON.
pub fn write_comparison_json(
    document: &ComparisonDocument,
    path: impl AsRef<Path>,
) -> io::Result<()> {
    write_json(document, path)
}

/// Write the Markdown summary of a report.
pub fn write_report_markdown(report: &WorkflowReport, path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    fs::write(path, markdown::generate_report(report))
}

/// Write the Markdown summary of a comparison.
pub fn write_comparison_markdown(
    document: &ComparisonDocument,
    path: impl AsRef<Path>,
) -> io::Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    fs::write(path, markdown::generate_comparison(document))
}
