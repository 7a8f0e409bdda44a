// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Workflow report assembly.

use gh_perf_report_core::config::{
    ARTIFACT_PREFIX_DEVICE_PERF, BENCHMARK_JOB_PATTERNS, DEFAULT_MAX_WORKERS,
};
use gh_perf_report_core::{CiSource, JobDescriptor, JobStatus, Result, WorkflowReport};
use std::sync::Arc;
use tracing::{info, warn};

use crate::processor::JobProcessor;
use crate::reconcile::ArtifactCache;

const UNKNOWN: &str = "Unknown";

/// Knobs for report generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    /// Concurrent job tasks.
    pub max_workers: usize,
    /// A job whose name contains one of these is a benchmark job.
    pub benchmark_job_patterns: Vec<String>,
    /// Device-perf artifact name prefix.
    pub artifact_prefix: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            benchmark_job_patterns: BENCHMARK_JOB_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            artifact_prefix: ARTIFACT_PREFIX_DEVICE_PERF.to_string(),
        }
    }
}

impl ReportOptions {
    /// Whether `job_name` belongs to a benchmark job.
    pub fn is_benchmark_job(&self, job_name: &str) -> bool {
        is_benchmark_job(job_name, &self.benchmark_job_patterns)
    }
}

/// Substring match of `job_name` against `patterns`.
pub fn is_benchmark_job<S: AsRef<str>>(job_name: &str, patterns: &[S]) -> bool {
    patterns.iter().any(|p| job_name.contains(p.as_ref()))
}

/// Builds [`WorkflowReport`]s from a CI source.
pub struct ReportProcessor {
    source: Arc<dyn CiSource>,
    options: ReportOptions,
}

impl ReportProcessor {
    /// Create a processor over `source`.
    pub fn new(source: Arc<dyn CiSource>, options: ReportOptions) -> Self {
        Self { source, options }
    }

    /// Options in use.
    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Every job of a run, benchmark or not.
    pub async fn workflow_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<Vec<JobDescriptor>> {
        self.source.get_workflow_jobs(owner, repo, run_id).await
    }

    /// Benchmark jobs of a run, in the order the source reports them.
    pub async fn benchmark_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<Vec<JobDescriptor>> {
        let jobs = self.workflow_jobs(owner, repo, run_id).await?;
        Ok(jobs
            .into_iter()
            .filter(|job| self.options.is_benchmark_job(&job.name))
            .collect())
    }

    /// Build the report of workflow run `run_id` in `owner/repo`.
    ///
    /// Only the run metadata and job list fetches can fail the report; every
    /// per-job failure is recorded on that job's result.
    pub async fn process_workflow_run(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<WorkflowReport> {
        let run = self.source.get_workflow_run(owner, repo, run_id).await?;
        let jobs = self.benchmark_jobs(owner, repo, run_id).await?;
        info!(run_id, repo = %format!("{owner}/{repo}"), jobs = jobs.len(), "processing benchmark jobs");

        let cache = match ArtifactCache::from_source(
            self.source.as_ref(),
            owner,
            repo,
            run_id,
            &self.options.artifact_prefix,
        )
        .await
        {
            Ok(cache) => cache,
            Err(e) => {
                warn!(run_id, error = %e, "could not list artifacts, continuing without device perf");
                ArtifactCache::empty()
            }
        };

        let processor = JobProcessor::new(
            Arc::clone(&self.source),
            owner,
            repo,
            self.options.max_workers,
        );
        let results = processor.process(jobs, Arc::new(cache)).await;

        let or_unknown = |value: Option<String>| value.unwrap_or_else(|| UNKNOWN.to_string());
        Ok(WorkflowReport {
            run_id,
            repo: format!("{owner}/{repo}"),
            workflow_name: or_unknown(run.name),
            branch: or_unknown(run.head_branch),
            created_at: or_unknown(run.created_at),
            status: run
                .status
                .unwrap_or_else(|| JobStatus::Unknown(UNKNOWN.to_string())),
            conclusion: run.conclusion,
            jobs: results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{descriptor, perf_csv, step, zip_archive, MockSource};
    use gh_perf_report_core::{ArtifactDescriptor, Error, JobConclusion, WorkflowRunInfo};

    fn run_info() -> WorkflowRunInfo {
        WorkflowRunInfo {
            name: Some("Performance Benchmark".to_string()),
            head_branch: Some("main".to_string()),
            created_at: Some("2025-05-01T10:00:00Z".to_string()),
            status: Some(JobStatus::InProgress),
            conclusion: None,
        }
    }

    #[test]
    fn test_benchmark_job_filter() {
        let options = ReportOptions::default();
        assert!(options.is_benchmark_job("run-n150-perf-benchmarks / tt-xla-resnet (n150)"));
        assert!(options.is_benchmark_job("tt-forge-bert"));
        assert!(!options.is_benchmark_job("build / tt-xla"));
        assert!(!options.is_benchmark_job("lint"));
        assert!(is_benchmark_job("custom-job", &["custom-"]));
    }

    #[tokio::test]
    async fn test_process_workflow_run_assembles_report() {
        let mut source = MockSource::new();
        source
            .expect_get_workflow_run()
            .returning(|_, _, _| Ok(run_info()));
        source.expect_get_workflow_jobs().returning(|_, _, _| {
            let mut failed = descriptor(
                21,
                "bench / tt-xla-vit (n150)",
                JobStatus::Completed,
                Some(JobConclusion::Failure),
            );
            failed.steps = vec![step("Run Perf Benchmark", JobConclusion::Failure)];
            Ok(vec![
                descriptor(
                    20,
                    "bench / tt-xla-resnet (n150)",
                    JobStatus::Completed,
                    Some(JobConclusion::Success),
                ),
                failed,
                descriptor(22, "build-image", JobStatus::Completed, Some(JobConclusion::Success)),
            ])
        });
        source.expect_list_artifacts().returning(|_, _, _| {
            Ok(vec![ArtifactDescriptor {
                id: 900,
                name: "device-perf-10".to_string(),
            }])
        });
        // Artifact uploaded by the first attempt's job id.
        source.expect_get_job().returning(|_, _, id| {
            Ok(descriptor(
                id,
                "bench / tt-xla-resnet (n150)",
                JobStatus::Completed,
                Some(JobConclusion::Success),
            ))
        });
        source.expect_get_job_logs().returning(|_, _, id| match id {
            20 => Ok("Samples per second: 42.0\n".to_string()),
            _ => Ok("FAILED: accuracy below target\n".to_string()),
        });
        source
            .expect_download_artifact()
            .withf(|_, _, id| *id == 900)
            .returning(|_, _, _| Ok(zip_archive(&[("ops.csv", perf_csv(&[1e6, 2e6]).as_str())])));

        let processor = ReportProcessor::new(Arc::new(source), ReportOptions::default());
        let report = processor
            .process_workflow_run("tenstorrent", "tt-xla", 77)
            .await
            .unwrap();

        assert_eq!(report.run_id, 77);
        assert_eq!(report.repo, "tenstorrent/tt-xla");
        assert_eq!(report.workflow_name, "Performance Benchmark");
        assert_eq!(report.status, JobStatus::InProgress);
        assert!(report.conclusion.is_none());
        assert_eq!(report.outcome(), "in_progress");
        assert_eq!(report.jobs.len(), 2);
        assert_eq!(report.success_count(), 1);
        assert_eq!(report.failure_count(), 1);

        let resnet = &report.jobs[0];
        assert_eq!(resnet.job_name, "bench / tt-xla-resnet (n150)");
        assert_eq!(resnet.samples_per_second(), Some(42.0));
        assert_eq!(
            resnet.device_perf_metrics.as_ref().map(|m| m.total_op_duration_ms()),
            Some(3.0)
        );

        let vit = &report.jobs[1];
        assert_eq!(vit.failed_step.as_deref(), Some("Run Perf Benchmark"));
        assert_eq!(vit.error_message.as_deref(), Some("accuracy below target"));
        assert!(vit.device_perf_metrics.is_none());
    }

    #[tokio::test]
    async fn test_workflow_jobs_are_unfiltered() {
        let mut source = MockSource::new();
        source.expect_get_workflow_jobs().returning(|_, _, _| {
            Ok(vec![
                descriptor(1, "build-image", JobStatus::Completed, Some(JobConclusion::Success)),
                descriptor(2, "bench / tt-xla-vit", JobStatus::Queued, None),
            ])
        });

        let processor = ReportProcessor::new(Arc::new(source), ReportOptions::default());
        let all = processor.workflow_jobs("tenstorrent", "tt-xla", 4).await.unwrap();
        let bench = processor.benchmark_jobs("tenstorrent", "tt-xla", 4).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(bench.len(), 1);
        assert_eq!(bench[0].id, 2);
    }

    #[tokio::test]
    async fn test_job_list_failure_is_fatal() {
        let mut source = MockSource::new();
        source
            .expect_get_workflow_run()
            .returning(|_, _, _| Ok(run_info()));
        source
            .expect_get_workflow_jobs()
            .returning(|_, _, _| Err(Error::data_source("502 Bad Gateway")));

        let processor = ReportProcessor::new(Arc::new(source), ReportOptions::default());
        let err = processor
            .process_workflow_run("tenstorrent", "tt-xla", 1)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_artifact_listing_failure_degrades_to_no_device_perf() {
        let mut source = MockSource::new();
        source
            .expect_get_workflow_run()
            .returning(|_, _, _| Ok(WorkflowRunInfo::default()));
        source.expect_get_workflow_jobs().returning(|_, _, _| {
            Ok(vec![descriptor(
                5,
                "tt-forge-bert",
                JobStatus::Completed,
                Some(JobConclusion::Success),
            )])
        });
        source
            .expect_list_artifacts()
            .returning(|_, _, _| Err(Error::data_source("forbidden")));
        source
            .expect_get_job_logs()
            .returning(|_, _, _| Ok("Samples per second: 9\n".to_string()));

        let processor = ReportProcessor::new(Arc::new(source), ReportOptions::default());
        let report = processor
            .process_workflow_run("tenstorrent", "tt-forge", 3)
            .await
            .unwrap();

        assert_eq!(report.workflow_name, "Unknown");
        assert_eq!(report.branch, "Unknown");
        assert_eq!(report.status, JobStatus::Unknown("Unknown".to_string()));
        assert!(report.conclusion.is_none());
        assert_eq!(report.jobs[0].samples_per_second(), Some(9.0));
        assert!(report.jobs[0].device_perf_metrics.is_none());
        assert!(report.jobs[0].error_message.is_none());
    }
}
