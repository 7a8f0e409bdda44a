// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test fixtures.

use async_trait::async_trait;
use gh_perf_report_core::{
    ArtifactDescriptor, CiSource, JobConclusion, JobDescriptor, JobResult, JobStatus, Result,
    SimulationMetrics, StepDescriptor, WorkflowReport, WorkflowRunInfo,
};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};

mockall::mock! {
    pub Source {}

    #[async_trait]
    impl CiSource for Source {
        async fn get_workflow_run(&self, owner: &str, repo: &str, run_id: u64) -> Result<WorkflowRunInfo>;
        async fn get_workflow_jobs(&self, owner: &str, repo: &str, run_id: u64) -> Result<Vec<JobDescriptor>>;
        async fn get_job_logs(&self, owner: &str, repo: &str, job_id: u64) -> Result<String>;
        async fn list_artifacts(&self, owner: &str, repo: &str, run_id: u64) -> Result<Vec<ArtifactDescriptor>>;
        async fn get_job(&self, owner: &str, repo: &str, job_id: u64) -> Result<JobDescriptor>;
        async fn download_artifact(&self, owner: &str, repo: &str, artifact_id: u64) -> Result<Vec<u8>>;
    }
}

pub const CSV_HEADER: &str = "OP CODE,DEVICE KERNEL DURATION [ns],OP TO OP LATENCY [ns],CONST_EVAL_OP,INPUT_LAYOUT_CONVERSION_OP";

pub fn descriptor(
    id: u64,
    name: &str,
    status: JobStatus,
    conclusion: Option<JobConclusion>,
) -> JobDescriptor {
    JobDescriptor {
        id,
        name: name.to_string(),
        status,
        conclusion,
        steps: Vec::new(),
    }
}

pub fn step(name: &str, conclusion: JobConclusion) -> StepDescriptor {
    StepDescriptor {
        name: name.to_string(),
        conclusion: Some(conclusion),
    }
}

/// CSV text with one non-filtered row per duration.
pub fn perf_csv(durations_ns: &[f64]) -> String {
    let mut text = String::from(CSV_HEADER);
    for (i, duration) in durations_ns.iter().enumerate() {
        text.push_str(&format!("\nOp{i},{duration},1,false,false"));
    }
    text.push('\n');
    text
}

pub fn zip_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn job_result(
    name: &str,
    conclusion: JobConclusion,
    samples_per_second: Option<f64>,
    device_ns: Option<f64>,
) -> JobResult {
    let mut result = JobResult::new(1, name, JobStatus::Completed, Some(conclusion));
    result.simulation_metrics = samples_per_second.map(|sps| SimulationMetrics {
        model_name: name.to_string(),
        samples_per_second: sps,
        total_execution_time: None,
        total_samples: None,
        batch_size: None,
        metadata: BTreeMap::new(),
    });
    result.device_perf_metrics =
        device_ns.map(|ns| gh_perf_report_core::DevicePerfMetrics::from_totals(ns, 1));
    result
}

pub fn report(run_id: u64, jobs: Vec<JobResult>) -> WorkflowReport {
    WorkflowReport {
        run_id,
        repo: "tenstorrent/tt-xla".to_string(),
        workflow_name: "Performance Benchmark".to_string(),
        branch: "main".to_string(),
        created_at: "2025-05-01T10:00:00Z".to_string(),
        status: JobStatus::Completed,
        conclusion: Some(JobConclusion::Success),
        jobs,
    }
}
