// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Artifact reconciliation across workflow re-runs.
//!
//! A re-run keeps the run id but hands new ids to the jobs it re-executes,
//! while device-perf artifacts stay named after the job id that uploaded
//! them. The cache therefore resolves each artifact back to its job, and
//! indexes it by the job's normalized name instead of its id.

use gh_perf_report_core::{normalize_job_name, ArtifactDescriptor, CiSource, JobDescriptor, Result};
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, warn};

/// Normalized job name to device-perf artifact.
///
/// Built once per report and shared read-only between job tasks.
#[derive(Debug, Clone, Default)]
pub struct ArtifactCache {
    entries: HashMap<String, ArtifactDescriptor>,
}

impl ArtifactCache {
    /// Empty cache; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the cache from `artifacts`.
    ///
    /// Only artifacts named `<prefix><job id>` are considered. Each job id is
    /// resolved through `job_lookup`; artifacts whose id cannot be parsed or
    /// resolved are left out. When two artifacts resolve to the same
    /// normalized name the later one wins.
    pub async fn build<F, Fut>(
        artifacts: Vec<ArtifactDescriptor>,
        prefix: &str,
        job_lookup: F,
    ) -> Self
    where
        F: Fn(u64) -> Fut,
        Fut: Future<Output = Result<JobDescriptor>>,
    {
        let mut entries = HashMap::new();
        for artifact in artifacts {
            if !artifact.name.starts_with(prefix) {
                continue;
            }
            let Some(job_id) = extract_job_id(&artifact.name, prefix) else {
                debug!(artifact = %artifact.name, "artifact name carries no job id");
                continue;
            };

            match job_lookup(job_id).await {
                Ok(job) => {
                    let key = normalize_job_name(&job.name);
                    debug!(artifact = %artifact.name, job_id, key = %key, "reconciled artifact");
                    entries.insert(key, artifact);
                }
                Err(e) => {
                    warn!(artifact = %artifact.name, job_id, error = %e, "could not resolve artifact job");
                }
            }
        }
        Self { entries }
    }

    /// List the run's artifacts and build the cache through `source`.
    ///
    /// Fails only if the artifact listing itself fails.
    pub async fn from_source(
        source: &dyn CiSource,
        owner: &str,
        repo: &str,
        run_id: u64,
        prefix: &str,
    ) -> Result<Self> {
        let artifacts = source.list_artifacts(owner, repo, run_id).await?;
        debug!(run_id, count = artifacts.len(), "listed artifacts");
        Ok(Self::build(artifacts, prefix, |job_id| source.get_job(owner, repo, job_id)).await)
    }

    /// Artifact for `job_name`, matched on its normalized name.
    pub fn lookup(&self, job_name: &str) -> Option<&ArtifactDescriptor> {
        self.entries.get(&normalize_job_name(job_name))
    }

    /// Number of reconciled artifacts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no artifact was reconciled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Job id embedded in an artifact name: the digits right after `prefix`.
pub fn extract_job_id(artifact_name: &str, prefix: &str) -> Option<u64> {
    let rest = artifact_name.strip_prefix(prefix)?;
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}
