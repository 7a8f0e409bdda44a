// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Contract for the remote CI data source.
//!
//! The pipeline never talks to a CI provider directly. It consumes a
//! [`CiSource`], which the adapters crate implements for the GitHub REST API
//! and tests replace with mocks. Implementations are responsible for passing
//! every outbound call through their rate-limit gate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{JobConclusion, JobStatus};
use crate::Result;

/// Workflow run metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRunInfo {
    /// Workflow name.
    #[serde(default)]
    pub name: Option<String>,
    /// Head branch.
    #[serde(default)]
    pub head_branch: Option<String>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Run status.
    #[serde(default)]
    pub status: Option<JobStatus>,
    /// Run conclusion, absent while the run is in progress.
    #[serde(default)]
    pub conclusion: Option<JobConclusion>,
}

/// One step of a CI job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDescriptor {
    /// Step name.
    #[serde(default)]
    pub name: String,
    /// Step conclusion, absent while the step has not finished.
    #[serde(default)]
    pub conclusion: Option<JobConclusion>,
}

/// A CI job as reported by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Job identifier, unique per attempt.
    pub id: u64,
    /// Job name, stable across attempts.
    pub name: String,
    /// Execution status.
    pub status: JobStatus,
    /// Conclusion once completed.
    #[serde(default)]
    pub conclusion: Option<JobConclusion>,
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<StepDescriptor>,
}

impl JobDescriptor {
    /// Name of the first step that concluded with a failure.
    pub fn first_failed_step(&self) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| s.conclusion == Some(JobConclusion::Failure))
            .map(|s| s.name.as_str())
    }
}

/// An artifact uploaded by a workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Artifact identifier.
    pub id: u64,
    /// Artifact name, e.g. `device-perf-123456`.
    pub name: String,
}

/// Remote CI data source.
#[async_trait]
pub trait CiSource: Send + Sync {
    /// Fetch workflow run metadata.
    async fn get_workflow_run(&self, owner: &str, repo: &str, run_id: u64)
        -> Result<WorkflowRunInfo>;

    /// Fetch every job of the current attempt of a workflow run.
    async fn get_workflow_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<Vec<JobDescriptor>>;

    /// Fetch the raw log text of a job.
    async fn get_job_logs(&self, owner: &str, repo: &str, job_id: u64) -> Result<String>;

    /// List every artifact of a workflow run.
    async fn list_artifacts(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> Result<Vec<ArtifactDescriptor>>;

    /// Fetch a single job by identifier, including jobs of earlier attempts.
    async fn get_job(&self, owner: &str, repo: &str, job_id: u64) -> Result<JobDescriptor>;

    /// Download an artifact as the bytes of a zip archive.
    async fn download_artifact(&self, owner: &str, repo: &str, artifact_id: u64)
        -> Result<Vec<u8>>;
}
