// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Concurrent per-job metric extraction.
//!
//! Every benchmark job runs in its own task, bounded by a worker semaphore.
//! A job collects two independent signals:
//!
//! - throughput from its log ([`crate::log_parser`])
//! - device timing from its device-perf artifact ([`crate::csv_parser`])
//!
//! Failures are contained per job. A failing signal leaves the other one
//! intact and records the first error on the result; a task that dies
//! becomes a failed [`JobResult`] instead of aborting the batch.

use gh_perf_report_core::{
    CiSource, DevicePerfMetrics, JobConclusion, JobDescriptor, JobResult, Result,
    SimulationMetrics,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::archive::extract_csv_files;
use crate::csv_parser::aggregate_artifact;
use crate::log_parser::{extract_simulation_metrics, find_error};
use crate::reconcile::ArtifactCache;

/// Failure of a whole job task, as opposed to one of its signals.
#[derive(Debug, Error)]
pub enum JobFailure {
    /// The worker pool was shut down before the job got a slot.
    #[error("worker pool closed: {0}")]
    PoolClosed(#[from] AcquireError),

    /// The task panicked.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was cancelled before finishing.
    #[error("task cancelled")]
    Cancelled,
}

impl From<JoinError> for JobFailure {
    fn from(err: JoinError) -> Self {
        if !err.is_panic() {
            return Self::Cancelled;
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Panicked(message)
    }
}

/// State shared read-only by every job task of one run.
struct JobContext {
    source: Arc<dyn CiSource>,
    owner: String,
    repo: String,
    cache: Arc<ArtifactCache>,
}

/// Log-derived signals of one job.
struct LogSignals {
    metrics: Option<SimulationMetrics>,
    error: Option<String>,
}

impl JobContext {
    async fn process_job(&self, job: JobDescriptor) -> JobResult {
        let mut result = JobResult::new(
            job.id,
            job.name.clone(),
            job.status.clone(),
            job.conclusion.clone(),
        );
        if !job.status.is_completed() {
            debug!(job = %job.name, status = %job.status, "job not completed, skipping metrics");
            return result;
        }

        let failed = job.conclusion == Some(JobConclusion::Failure);
        if failed {
            result.failed_step = job.first_failed_step().map(str::to_string);
        }

        let (logs, device_perf) = tokio::join!(
            self.log_signals(job.id, &job.name, failed),
            self.device_perf(&job.name)
        );

        match logs {
            Ok(signals) => {
                result.simulation_metrics = signals.metrics;
                if let Some(error) = signals.error {
                    result.record_error(error);
                }
            }
            Err(e) => {
                warn!(job = %job.name, error = %e, "log extraction failed");
                result.record_error(format!("Failed to parse logs: {e}"));
            }
        }

        match device_perf {
            Ok(metrics) => result.device_perf_metrics = metrics,
            Err(e) => {
                warn!(job = %job.name, error = %e, "device perf extraction failed");
                result.record_error(format!("Failed to parse device perf: {e}"));
            }
        }

        result
    }

    async fn log_signals(&self, job_id: u64, job_name: &str, failed: bool) -> Result<LogSignals> {
        let log = self
            .source
            .get_job_logs(&self.owner, &self.repo, job_id)
            .await?;
        let metrics = extract_simulation_metrics(&log, job_name)?;
        let error = if failed { find_error(&log) } else { None };
        Ok(LogSignals { metrics, error })
    }

    async fn device_perf(&self, job_name: &str) -> Result<Option<DevicePerfMetrics>> {
        let Some(artifact) = self.cache.lookup(job_name) else {
            debug!(job = job_name, "no device-perf artifact");
            return Ok(None);
        };

        let bytes = self
            .source
            .download_artifact(&self.owner, &self.repo, artifact.id)
            .await?;
        let files = extract_csv_files(&bytes)?;
        let metrics = aggregate_artifact(&files)?;
        debug!(
            job = job_name,
            artifact = %artifact.name,
            stages = metrics.num_stages(),
            "device perf aggregated"
        );
        Ok(Some(metrics))
    }
}

/// Runs per-job extraction for one repository with bounded concurrency.
pub struct JobProcessor {
    source: Arc<dyn CiSource>,
    owner: String,
    repo: String,
    worker_limit: usize,
}

impl JobProcessor {
    /// Processor for `owner/repo` running at most `worker_limit` jobs at once.
    ///
    /// A limit of zero is treated as one.
    pub fn new(
        source: Arc<dyn CiSource>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        worker_limit: usize,
    ) -> Self {
        Self {
            source,
            owner: owner.into(),
            repo: repo.into(),
            worker_limit: worker_limit.max(1),
        }
    }

    /// Effective concurrency limit.
    pub fn worker_limit(&self) -> usize {
        self.worker_limit
    }

    /// Process `jobs` and return one result per job, sorted by job name.
    ///
    /// Completes once every task has finished or failed.
    pub async fn process(&self, jobs: Vec<JobDescriptor>, cache: Arc<ArtifactCache>) -> Vec<JobResult> {
        let context = Arc::new(JobContext {
            source: Arc::clone(&self.source),
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            cache,
        });
        let semaphore = Arc::new(Semaphore::new(self.worker_limit));

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let (job_id, job_name) = (job.id, job.name.clone());
            let context = Arc::clone(&context);
            let semaphore = Arc::clone(&semaphore);
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await?;
                Ok::<_, JobFailure>(context.process_job(job).await)
            });
            handles.push((job_id, job_name, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (job_id, job_name, handle) in handles {
            let outcome = handle.await.map_err(JobFailure::from).and_then(|r| r);
            let result = match outcome {
                Ok(result) => result,
                Err(failure) => {
                    warn!(job = %job_name, error = %failure, "job processing failed");
                    JobResult::processing_failure(job_id, job_name, &failure.to_string())
                }
            };
            results.push(result);
        }

        results.sort_by(|a, b| a.job_name.cmp(&b.job_name));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{descriptor, perf_csv, step, zip_archive, MockSource};
    use gh_perf_report_core::{ArtifactDescriptor, Error, JobStatus, WorkflowRunInfo};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const SAMPLE_LOG: &str = "Batch size: 4\nSamples per second: 250.5\n";

    async fn cache_for(entries: &[(u64, &str, &str)]) -> Arc<ArtifactCache> {
        // (artifact id, artifact name, job name)
        let artifacts = entries
            .iter()
            .map(|(id, name, _)| ArtifactDescriptor {
                id: *id,
                name: name.to_string(),
            })
            .collect();
        let names: Vec<(u64, String)> = entries
            .iter()
            .filter_map(|(_, artifact, job)| {
                crate::reconcile::extract_job_id(artifact, "device-perf-")
                    .map(|id| (id, job.to_string()))
            })
            .collect();
        let cache = ArtifactCache::build(artifacts, "device-perf-", |id| {
            let found = names.iter().find(|(n, _)| *n == id).cloned();
            async move {
                found
                    .map(|(id, name)| descriptor(id, &name, JobStatus::Completed, None))
                    .ok_or_else(|| Error::data_source("unknown job"))
            }
        })
        .await;
        Arc::new(cache)
    }

    fn processor(source: MockSource, workers: usize) -> JobProcessor {
        JobProcessor::new(Arc::new(source), "tenstorrent", "tt-xla", workers)
    }

    /// Serves [`SAMPLE_LOG`] for every job, tracking how many calls overlap.
    #[derive(Default)]
    struct StubLogs {
        panic_on: Option<u64>,
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CiSource for StubLogs {
        async fn get_workflow_run(&self, _: &str, _: &str, _: u64) -> Result<WorkflowRunInfo> {
            unimplemented!()
        }

        async fn get_workflow_jobs(&self, _: &str, _: &str, _: u64) -> Result<Vec<JobDescriptor>> {
            unimplemented!()
        }

        async fn get_job_logs(&self, _: &str, _: &str, job_id: u64) -> Result<String> {
            if self.panic_on == Some(job_id) {
                panic!("log decoder exploded");
            }
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(SAMPLE_LOG.to_string())
        }

        async fn list_artifacts(&self, _: &str, _: &str, _: u64) -> Result<Vec<ArtifactDescriptor>> {
            unimplemented!()
        }

        async fn get_job(&self, _: &str, _: &str, _: u64) -> Result<JobDescriptor> {
            unimplemented!()
        }

        async fn download_artifact(&self, _: &str, _: &str, _: u64) -> Result<Vec<u8>> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_incomplete_jobs_get_no_metrics() {
        let source = MockSource::new();
        let jobs = vec![
            descriptor(1, "tt-xla-a", JobStatus::InProgress, None),
            descriptor(2, "tt-xla-b", JobStatus::Queued, None),
        ];
        let results = processor(source, 2)
            .process(jobs, Arc::new(ArtifactCache::empty()))
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.simulation_metrics.is_none()
            && r.device_perf_metrics.is_none()
            && r.error_message.is_none()));
    }

    #[tokio::test]
    async fn test_collects_both_signals() {
        let mut source = MockSource::new();
        source
            .expect_get_job_logs()
            .returning(|_, _, _| Ok(SAMPLE_LOG.to_string()));
        source.expect_download_artifact().returning(|_, _, _| {
            Ok(zip_archive(&[
                ("b.csv", perf_csv(&[300.0]).as_str()),
                ("a.csv", perf_csv(&[100.0, 200.0]).as_str()),
            ]))
        });

        let cache = cache_for(&[(50, "device-perf-10", "tt-xla-resnet (n150)")]).await;
        let jobs = vec![descriptor(
            11,
            "bench / tt-xla-resnet (n150)",
            JobStatus::Completed,
            Some(JobConclusion::Success),
        )];
        let results = processor(source, 1).process(jobs, cache).await;

        let result = &results[0];
        assert_eq!(result.samples_per_second(), Some(250.5));
        let device = result.device_perf_metrics.as_ref().unwrap();
        assert_eq!(device.total_op_duration_ns, 600.0);
        assert_eq!(device.stages[0].duration_ns, 300.0);
        assert_eq!(device.stages[1].duration_ns, 300.0);
        assert_eq!(device.stages[0].op_count, 2);
        assert!(result.error_message.is_none());
    }

    #[tokio::test]
    async fn test_download_failure_keeps_log_metrics() {
        let mut source = MockSource::new();
        source
            .expect_get_job_logs()
            .returning(|_, _, _| Ok(SAMPLE_LOG.to_string()));
        source
            .expect_download_artifact()
            .returning(|_, _, _| Err(Error::artifact_not_found("artifact 50 expired")));

        let cache = cache_for(&[(50, "device-perf-10", "tt-xla-resnet")]).await;
        let jobs = vec![descriptor(
            10,
            "tt-xla-resnet",
            JobStatus::Completed,
            Some(JobConclusion::Success),
        )];
        let results = processor(source, 1).process(jobs, cache).await;

        let result = &results[0];
        assert_eq!(result.samples_per_second(), Some(250.5));
        assert!(result.device_perf_metrics.is_none());
        let message = result.error_message.as_deref().unwrap();
        assert!(message.starts_with("Failed to parse device perf:"));
        assert!(message.contains("artifact 50 expired"));
    }

    #[tokio::test]
    async fn test_log_error_is_not_overwritten_by_device_error() {
        let mut source = MockSource::new();
        source
            .expect_get_job_logs()
            .returning(|_, _, _| Err(Error::data_source("logs gone")));
        source
            .expect_download_artifact()
            .returning(|_, _, _| Ok(b"not a zip".to_vec()));

        let cache = cache_for(&[(50, "device-perf-10", "tt-xla-resnet")]).await;
        let jobs = vec![descriptor(
            10,
            "tt-xla-resnet",
            JobStatus::Completed,
            Some(JobConclusion::Success),
        )];
        let results = processor(source, 1).process(jobs, cache).await;

        let message = results[0].error_message.as_deref().unwrap();
        assert!(message.starts_with("Failed to parse logs:"));
        assert!(message.contains("logs gone"));
    }

    #[tokio::test]
    async fn test_failed_job_records_step_and_log_error() {
        let mut source = MockSource::new();
        source.expect_get_job_logs().returning(|_, _, _| {
            Ok("Running...\nRuntimeError: out of device memory\n".to_string())
        });

        let mut job = descriptor(
            3,
            "tt-forge-bert",
            JobStatus::Completed,
            Some(JobConclusion::Failure),
        );
        job.steps = vec![
            step("Set up job", JobConclusion::Success),
            step("Run Perf Benchmark", JobConclusion::Failure),
            step("Run Device Perf", JobConclusion::Failure),
        ];
        let results = processor(source, 1)
            .process(vec![job], Arc::new(ArtifactCache::empty()))
            .await;

        let result = &results[0];
        assert_eq!(result.failed_step.as_deref(), Some("Run Perf Benchmark"));
        assert_eq!(
            result.error_message.as_deref(),
            Some("out of device memory")
        );
        assert!(result.simulation_metrics.is_none());
        assert!(result.device_perf_metrics.is_none());
    }

    #[tokio::test]
    async fn test_successful_job_does_not_scan_for_errors() {
        let mut source = MockSource::new();
        source
            .expect_get_job_logs()
            .returning(|_, _, _| Ok("Warning: Error: transient\nSamples per second: 1\n".to_string()));

        let jobs = vec![descriptor(
            1,
            "tt-xla-a",
            JobStatus::Completed,
            Some(JobConclusion::Success),
        )];
        let results = processor(source, 1)
            .process(jobs, Arc::new(ArtifactCache::empty()))
            .await;
        assert!(results[0].error_message.is_none());
        assert_eq!(results[0].samples_per_second(), Some(1.0));
    }

    #[tokio::test]
    async fn test_device_error_reported_when_log_has_none() {
        let mut source = MockSource::new();
        source
            .expect_get_job_logs()
            .returning(|_, _, _| Ok("Running...\nSamples per second: 12\n".to_string()));
        source.expect_download_artifact().returning(|_, _, _| {
            Ok(zip_archive(&[("ops.csv", "OP CODE,DEVICE KERNEL DURATION [ns]\nmatmul,5\n")]))
        });

        let cache = cache_for(&[(50, "device-perf-3", "tt-forge-bert")]).await;
        let mut job = descriptor(
            3,
            "tt-forge-bert",
            JobStatus::Completed,
            Some(JobConclusion::Failure),
        );
        job.steps = vec![step("Run Device Perf", JobConclusion::Failure)];
        let results = processor(source, 1).process(vec![job], cache).await;

        let result = &results[0];
        assert_eq!(result.failed_step.as_deref(), Some("Run Device Perf"));
        assert_eq!(result.samples_per_second(), Some(12.0));
        assert!(result.device_perf_metrics.is_none());
        let message = result.error_message.as_deref().unwrap();
        assert!(message.starts_with("Failed to parse device perf:"));
        assert!(message.contains("No valid device perf data"));
    }

    #[tokio::test]
    async fn test_unknown_status_keeps_raw_value_without_metrics() {
        // Any call to the source would panic the task and surface as an error.
        let source = MockSource::new();
        let jobs = vec![descriptor(
            8,
            "tt-xla-vit",
            JobStatus::Unknown("waiting".to_string()),
            None,
        )];
        let results = processor(source, 1)
            .process(jobs, Arc::new(ArtifactCache::empty()))
            .await;

        let result = &results[0];
        assert_eq!(result.status, JobStatus::Unknown("waiting".to_string()));
        assert_eq!(result.status.as_str(), "waiting");
        assert!(result.conclusion.is_none());
        assert!(result.simulation_metrics.is_none());
        assert!(result.device_perf_metrics.is_none());
        assert!(result.error_message.is_none());
    }

    #[tokio::test]
    async fn test_panicking_job_is_contained() {
        let source = StubLogs {
            panic_on: Some(2),
            ..StubLogs::default()
        };
        let jobs = vec![
            descriptor(1, "tt-xla-a", JobStatus::Completed, Some(JobConclusion::Success)),
            descriptor(2, "tt-xla-b", JobStatus::Completed, Some(JobConclusion::Success)),
            descriptor(3, "tt-xla-c", JobStatus::Completed, Some(JobConclusion::Success)),
        ];
        let results = JobProcessor::new(Arc::new(source), "tenstorrent", "tt-xla", 3)
            .process(jobs, Arc::new(ArtifactCache::empty()))
            .await;

        assert_eq!(results.len(), 3);
        let failed = &results[1];
        assert_eq!(failed.job_name, "tt-xla-b");
        assert_eq!(failed.status, JobStatus::Completed);
        assert_eq!(failed.conclusion, Some(JobConclusion::Failure));
        assert_eq!(
            failed.error_message.as_deref(),
            Some("Processing error: task panicked: log decoder exploded")
        );
        assert_eq!(results[0].samples_per_second(), Some(250.5));
        assert_eq!(results[2].samples_per_second(), Some(250.5));
    }

    #[tokio::test]
    async fn test_results_sorted_and_deterministic() {
        let names = ["tt-xla-zeta", "tt-forge-alpha", "tt-xla-mid", "tt-forge-beta"];
        let jobs: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                descriptor(
                    i as u64,
                    n,
                    JobStatus::Completed,
                    Some(JobConclusion::Success),
                )
            })
            .collect();

        let run = |jobs: Vec<JobDescriptor>| async move {
            let mut source = MockSource::new();
            source.expect_get_job_logs().returning(|_, _, id| {
                Ok(format!("Samples per second: {}\n", id * 10))
            });
            processor(source, 2)
                .process(jobs, Arc::new(ArtifactCache::empty()))
                .await
        };

        let first = run(jobs.clone()).await;
        let second = run(jobs.into_iter().rev().collect()).await;

        let sorted: Vec<_> = first.iter().map(|r| r.job_name.as_str()).collect();
        assert_eq!(
            sorted,
            vec!["tt-forge-alpha", "tt-forge-beta", "tt-xla-mid", "tt-xla-zeta"]
        );
        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_limit_bounds_concurrency() {
        let source = Arc::new(StubLogs {
            delay: Duration::from_millis(20),
            ..StubLogs::default()
        });
        let jobs: Vec<_> = (0..12)
            .map(|i| {
                descriptor(
                    i,
                    &format!("tt-xla-model{i:02}"),
                    JobStatus::Completed,
                    Some(JobConclusion::Success),
                )
            })
            .collect();

        let processor = JobProcessor::new(source.clone(), "tenstorrent", "tt-xla", 3);
        let results = processor
            .process(jobs, Arc::new(ArtifactCache::empty()))
            .await;

        assert_eq!(results.len(), 12);
        let peak = source.peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "peak concurrency was {peak}");
    }

    #[test]
    fn test_zero_workers_becomes_one() {
        let processor = processor(MockSource::new(), 0);
        assert_eq!(processor.worker_limit(), 1);
    }
}
