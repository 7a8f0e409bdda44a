// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run-to-run comparison.
//!
//! Jobs of two reports are aligned on their normalized name. Matched pairs
//! get throughput and device-duration deltas and are classified against
//! [`Thresholds`]; unmatched jobs are reported as new or removed.

use gh_perf_report_core::{
    normalize_job_name, ComparisonKind, ComparisonResult, JobConclusion, JobResult, Thresholds,
    WorkflowReport,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Compares two workflow reports.
#[derive(Debug, Clone, Default)]
pub struct CompareProcessor {
    thresholds: Thresholds,
}

impl CompareProcessor {
    /// Comparison engine using `thresholds`.
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Thresholds in use.
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// One comparison per normalized job key of either report, sorted by key.
    ///
    /// If a report holds several jobs with the same key, the last one wins.
    pub fn compare_reports(
        &self,
        baseline: &WorkflowReport,
        current: &WorkflowReport,
    ) -> Vec<ComparisonResult> {
        let baseline_jobs = index_by_key(&baseline.jobs);
        let current_jobs = index_by_key(&current.jobs);

        let mut comparisons: BTreeMap<&str, ComparisonResult> = BTreeMap::new();
        for (key, base) in &baseline_jobs {
            let comparison = match current_jobs.get(key) {
                Some(cur) => self.compare_pair(key, base, cur),
                None => ComparisonResult::removed(key.as_str(), (*base).clone()),
            };
            comparisons.insert(key.as_str(), comparison);
        }
        for (key, cur) in &current_jobs {
            if !baseline_jobs.contains_key(key) {
                let comparison = ComparisonResult::added(key.as_str(), (*cur).clone());
                comparisons.insert(key.as_str(), comparison);
            }
        }

        comparisons.into_values().collect()
    }

    fn compare_pair(&self, key: &str, baseline: &JobResult, current: &JobResult) -> ComparisonResult {
        let mut comparison = ComparisonResult::paired(key, baseline.clone(), current.clone());
        comparison.status_changed = baseline.conclusion != current.conclusion;

        if let (Some(base), Some(cur)) = (baseline.samples_per_second(), current.samples_per_second()) {
            let (delta, percent) = delta_and_percent(base, cur);
            comparison.samples_per_sec_delta = Some(delta);
            comparison.samples_per_sec_percent_change = percent;
        }

        if let (Some(base), Some(cur)) = (baseline.device_duration_ns(), current.device_duration_ns()) {
            let (delta, percent) = delta_and_percent(base, cur);
            comparison.device_perf_delta_ns = Some(delta);
            comparison.device_perf_percent_change = percent;
        }

        comparison.is_regression = self.is_regression(baseline, current, &comparison);
        comparison.is_improvement =
            !comparison.is_regression && self.is_improvement(baseline, current, &comparison);

        debug!(job = key, kind = %comparison.kind(), "compared job");
        comparison
    }

    fn is_regression(&self, baseline: &JobResult, current: &JobResult, c: &ComparisonResult) -> bool {
        let limit = self.thresholds.regression_percent;
        flipped(baseline, current, JobConclusion::Success, JobConclusion::Failure)
            || c.samples_per_sec_percent_change.is_some_and(|p| p < limit)
            || c.device_perf_percent_change.is_some_and(|p| p > limit.abs())
    }

    fn is_improvement(&self, baseline: &JobResult, current: &JobResult, c: &ComparisonResult) -> bool {
        let limit = self.thresholds.improvement_percent;
        flipped(baseline, current, JobConclusion::Failure, JobConclusion::Success)
            || c.samples_per_sec_percent_change.is_some_and(|p| p > limit)
            || c.device_perf_percent_change.is_some_and(|p| p < -limit)
    }
}

fn index_by_key(jobs: &[JobResult]) -> BTreeMap<String, &JobResult> {
    jobs.iter()
        .map(|job| (normalize_job_name(&job.job_name), job))
        .collect()
}

fn flipped(baseline: &JobResult, current: &JobResult, from: JobConclusion, to: JobConclusion) -> bool {
    baseline.conclusion.as_ref() == Some(&from) && current.conclusion.as_ref() == Some(&to)
}

/// `current - baseline`, and the change in percent of a non-zero baseline.
fn delta_and_percent(baseline: f64, current: f64) -> (f64, Option<f64>) {
    let delta = current - baseline;
    let percent = (baseline != 0.0).then(|| delta / baseline * 100.0);
    (delta, percent)
}

/// Counts of a comparison by classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Number of compared job keys.
    pub total: usize,
    /// Regressions.
    pub regressions: usize,
    /// Improvements.
    pub improvements: usize,
    /// Matched jobs with no threshold crossed.
    pub neutral: usize,
    /// Jobs only in the current run.
    pub new: usize,
    /// Jobs only in the baseline run.
    pub removed: usize,
    /// Matched jobs whose conclusion changed.
    pub status_changed: usize,
}

impl ComparisonSummary {
    /// Whether anything regressed.
    pub fn has_regressions(&self) -> bool {
        self.regressions > 0
    }
}

/// Tally `comparisons` by [`ComparisonKind`].
pub fn summarize(comparisons: &[ComparisonResult]) -> ComparisonSummary {
    comparisons
        .iter()
        .fold(ComparisonSummary::default(), |mut summary, c| {
            summary.total += 1;
            match c.kind() {
                ComparisonKind::Regression => summary.regressions += 1,
                ComparisonKind::Improvement => summary.improvements += 1,
                ComparisonKind::Neutral => summary.neutral += 1,
                ComparisonKind::New => summary.new += 1,
                ComparisonKind::Removed => summary.removed += 1,
            }
            if c.status_changed {
                summary.status_changed += 1;
            }
            summary
        })
}
