// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Report data model.
//!
//! Every value here is built once while a single report or comparison is
//! computed and is read-only afterwards. Derived quantities (millisecond
//! views, job counts, deltas in milliseconds) are computed on demand and
//! never stored next to the value they derive from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::normalize::normalize_job_name;
use crate::{Error, Result};

const NANOS_PER_MILLI: f64 = 1_000_000.0;

/// Execution status of a CI job.
///
/// Values the CI source reports that are not recognised are preserved in
/// [`JobStatus::Unknown`] instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    /// Waiting for a runner.
    Queued,
    /// Currently running.
    InProgress,
    /// Finished, see the job's conclusion.
    Completed,
    /// Unrecognised status string.
    Unknown(String),
}

impl JobStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Unknown(raw) => raw,
        }
    }

    /// Whether the job finished running.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        match s {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conclusion of a completed CI job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobConclusion {
    /// Job succeeded.
    Success,
    /// Job failed.
    Failure,
    /// Job was skipped.
    Skipped,
    /// Job was cancelled.
    Cancelled,
    /// Job finished neutral.
    Neutral,
    /// Unrecognised conclusion string.
    Unknown(String),
}

impl JobConclusion {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
            Self::Neutral => "neutral",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<&str> for JobConclusion {
    fn from(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "failure" => Self::Failure,
            "skipped" => Self::Skipped,
            "cancelled" => Self::Cancelled,
            "neutral" => Self::Neutral,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for JobConclusion {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<JobConclusion> for String {
    fn from(conclusion: JobConclusion) -> Self {
        conclusion.as_str().to_string()
    }
}

impl fmt::Display for JobConclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Throughput metrics extracted from a job's execution log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetrics {
    /// Display name of the benchmarked model.
    pub model_name: String,
    /// Samples processed per second.
    pub samples_per_second: f64,
    /// Total execution time as reported by the benchmark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_execution_time: Option<f64>,
    /// Total samples processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_samples: Option<u64>,
    /// Batch size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u64>,
    /// Free-form metadata (model type, dataset name, data format, input size).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Contribution of one device-perf CSV file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagePerfMetrics {
    /// `Stage N`, numbered over surviving files only.
    pub stage_name: String,
    /// Summed kernel duration in nanoseconds.
    pub duration_ns: f64,
    /// Number of operations that survived filtering.
    pub op_count: u64,
}

impl StagePerfMetrics {
    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.duration_ns / NANOS_PER_MILLI
    }
}

/// Device timing aggregated over every stage of one job.
///
/// Invariant: `total_op_duration_ns` and `filtered_op_count` are the sums of
/// the stage values whenever `stages` is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicePerfMetrics {
    /// Summed kernel duration in nanoseconds.
    pub total_op_duration_ns: f64,
    /// Number of operations that survived filtering.
    pub filtered_op_count: u64,
    /// `total_op_duration_ns / filtered_op_count`, or 0 without operations.
    pub avg_op_duration_ns: f64,
    /// Per-file breakdown, in ascending file-name order.
    #[serde(default)]
    pub stages: Vec<StagePerfMetrics>,
}

impl DevicePerfMetrics {
    /// Metrics for a single file with no stage breakdown.
    pub fn from_totals(total_op_duration_ns: f64, filtered_op_count: u64) -> Self {
        Self {
            total_op_duration_ns,
            filtered_op_count,
            avg_op_duration_ns: average(total_op_duration_ns, filtered_op_count),
            stages: Vec::new(),
        }
    }

    /// Aggregate over stages; totals are the stage sums.
    pub fn from_stages(stages: Vec<StagePerfMetrics>) -> Self {
        let total_op_duration_ns: f64 = stages.iter().map(|s| s.duration_ns).sum();
        let filtered_op_count: u64 = stages.iter().map(|s| s.op_count).sum();
        Self {
            total_op_duration_ns,
            filtered_op_count,
            avg_op_duration_ns: average(total_op_duration_ns, filtered_op_count),
            stages,
        }
    }

    /// Total duration in milliseconds.
    pub fn total_op_duration_ms(&self) -> f64 {
        self.total_op_duration_ns / NANOS_PER_MILLI
    }

    /// Number of non-empty stages.
    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }
}

fn average(total: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Performance data for a single CI job.
///
/// Metrics are only ever populated for completed jobs; each of the two metric
/// signals may be absent independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// CI job identifier.
    pub job_id: u64,
    /// Job name as reported by CI.
    pub job_name: String,
    /// Execution status.
    pub status: JobStatus,
    /// Conclusion, when the CI source reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<JobConclusion>,
    /// Throughput metrics from the job log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_metrics: Option<SimulationMetrics>,
    /// Device timing from the job's device-perf artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_perf_metrics: Option<DevicePerfMetrics>,
    /// Name of the first failing step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    /// First error encountered for this job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobResult {
    /// Bare result with no metrics.
    pub fn new(
        job_id: u64,
        job_name: impl Into<String>,
        status: JobStatus,
        conclusion: Option<JobConclusion>,
    ) -> Self {
        Self {
            job_id,
            job_name: job_name.into(),
            status,
            conclusion,
            simulation_metrics: None,
            device_perf_metrics: None,
            failed_step: None,
            error_message: None,
        }
    }

    /// Result for a job whose processing task itself failed.
    pub fn processing_failure(job_id: u64, job_name: impl Into<String>, message: &str) -> Self {
        let mut result = Self::new(
            job_id,
            job_name,
            JobStatus::Completed,
            Some(JobConclusion::Failure),
        );
        result.error_message = Some(format!("Processing error: {message}"));
        result
    }

    /// Key used to match this job against other runs.
    pub fn normalized_key(&self) -> String {
        normalize_job_name(&self.job_name)
    }

    /// Samples per second, if the log yielded one.
    pub fn samples_per_second(&self) -> Option<f64> {
        self.simulation_metrics
            .as_ref()
            .map(|m| m.samples_per_second)
    }

    /// Total device duration in nanoseconds, if an artifact was parsed.
    pub fn device_duration_ns(&self) -> Option<f64> {
        self.device_perf_metrics
            .as_ref()
            .map(|m| m.total_op_duration_ns)
    }

    /// Record `message` unless an earlier error is already recorded.
    pub fn record_error(&mut self, message: impl Into<String>) {
        if self.error_message.is_none() {
            self.error_message = Some(message.into());
        }
    }
}

/// Snapshot of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowReport {
    /// Workflow run identifier.
    pub run_id: u64,
    /// `owner/repo`.
    pub repo: String,
    /// Workflow name.
    pub workflow_name: String,
    /// Head branch.
    pub branch: String,
    /// Creation timestamp as reported by CI.
    pub created_at: String,
    /// Run status.
    pub status: JobStatus,
    /// Run conclusion, absent while the run is in progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<JobConclusion>,
    /// Benchmark jobs, sorted by `job_name`.
    pub jobs: Vec<JobResult>,
}

impl WorkflowReport {
    fn count(&self, conclusion: &JobConclusion) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.conclusion.as_ref() == Some(conclusion))
            .count()
    }

    /// Jobs that succeeded.
    pub fn success_count(&self) -> usize {
        self.count(&JobConclusion::Success)
    }

    /// Jobs that failed.
    pub fn failure_count(&self) -> usize {
        self.count(&JobConclusion::Failure)
    }

    /// Jobs that were skipped.
    pub fn skipped_count(&self) -> usize {
        self.count(&JobConclusion::Skipped)
    }

    /// Run conclusion, or the run status while no conclusion exists.
    pub fn outcome(&self) -> &str {
        self.conclusion
            .as_ref()
            .map_or_else(|| self.status.as_str(), JobConclusion::as_str)
    }

    /// Largest stage count over all jobs.
    pub fn max_stage_count(&self) -> usize {
        self.jobs
            .iter()
            .filter_map(|j| j.device_perf_metrics.as_ref())
            .map(DevicePerfMetrics::num_stages)
            .max()
            .unwrap_or(0)
    }
}

/// Classification of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    /// Performance or status got worse.
    Regression,
    /// Performance or status got better.
    Improvement,
    /// Both sides present, no threshold crossed.
    Neutral,
    /// Only present in the current run.
    New,
    /// Only present in the baseline run.
    Removed,
}

impl fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Regression => "regression",
            Self::Improvement => "improvement",
            Self::Neutral => "neutral",
            Self::New => "new",
            Self::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// One job matched (or not) between a baseline and a current run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Normalized job key.
    pub job_name: String,
    /// Baseline side.
    pub baseline: Option<JobResult>,
    /// Current side.
    pub current: Option<JobResult>,
    /// `current - baseline` samples per second.
    pub samples_per_sec_delta: Option<f64>,
    /// Samples-per-second change in percent of the baseline.
    pub samples_per_sec_percent_change: Option<f64>,
    /// `current - baseline` device duration in nanoseconds.
    pub device_perf_delta_ns: Option<f64>,
    /// Device duration change in percent of the baseline.
    pub device_perf_percent_change: Option<f64>,
    /// Whether the job conclusion differs between the two runs.
    pub status_changed: bool,
    /// Set by the comparison engine; never true together with `is_improvement`.
    pub is_regression: bool,
    /// Set by the comparison engine; never true together with `is_regression`.
    pub is_improvement: bool,
}

impl ComparisonResult {
    /// A comparison with no deltas yet. At least one side must be present.
    pub fn new(
        job_name: impl Into<String>,
        baseline: Option<JobResult>,
        current: Option<JobResult>,
    ) -> Result<Self> {
        let job_name = job_name.into();
        if baseline.is_none() && current.is_none() {
            return Err(Error::validation(format!(
                "comparison for {job_name} has neither a baseline nor a current job"
            )));
        }
        Ok(Self::with_sides(job_name, baseline, current))
    }

    /// A job present in both runs, with no deltas yet.
    pub fn paired(job_name: impl Into<String>, baseline: JobResult, current: JobResult) -> Self {
        Self::with_sides(job_name.into(), Some(baseline), Some(current))
    }

    /// A job only present in the baseline run.
    pub fn removed(job_name: impl Into<String>, baseline: JobResult) -> Self {
        Self::with_sides(job_name.into(), Some(baseline), None)
    }

    /// A job only present in the current run.
    pub fn added(job_name: impl Into<String>, current: JobResult) -> Self {
        Self::with_sides(job_name.into(), None, Some(current))
    }

    fn with_sides(job_name: String, baseline: Option<JobResult>, current: Option<JobResult>) -> Self {
        Self {
            job_name,
            baseline,
            current,
            samples_per_sec_delta: None,
            samples_per_sec_percent_change: None,
            device_perf_delta_ns: None,
            device_perf_percent_change: None,
            status_changed: false,
            is_regression: false,
            is_improvement: false,
        }
    }

    /// Device duration delta in milliseconds.
    pub fn device_perf_delta_ms(&self) -> Option<f64> {
        self.device_perf_delta_ns.map(|ns| ns / NANOS_PER_MILLI)
    }

    /// Classification of this comparison.
    pub fn kind(&self) -> ComparisonKind {
        match (&self.baseline, &self.current) {
            (Some(_), None) => ComparisonKind::Removed,
            (None, _) => ComparisonKind::New,
            (Some(_), Some(_)) if self.is_regression => ComparisonKind::Regression,
            (Some(_), Some(_)) if self.is_improvement => ComparisonKind::Improvement,
            (Some(_), Some(_)) => ComparisonKind::Neutral,
        }
    }
}
