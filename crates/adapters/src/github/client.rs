// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! GitHub Actions REST client.
//!
//! Implements [`CiSource`] over `https://api.github.com`. Every request waits
//! on the shared [`RateLimiter`] first; list endpoints are paginated until a
//! short page comes back.

use async_trait::async_trait;
use gh_perf_report_core::{
    ArtifactDescriptor, CiSource, Error as CoreError, JobDescriptor, Result as CoreResult,
    WorkflowRunInfo,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::rate_limit::RateLimiter;

/// Default API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

const PER_PAGE: usize = 100;
const ERROR_BODY_LIMIT: usize = 300;

/// Errors raised by the GitHub client.
#[derive(Debug, Error)]
pub enum GithubError {
    /// The HTTP client could not be built.
    #[error("Invalid client configuration: {0}")]
    Configuration(String),

    /// Request never produced a response.
    #[error("Request to {path} failed: {message}")]
    Transport {
        /// Request path.
        path: String,
        /// Underlying transport error.
        message: String,
    },

    /// Resource does not exist (or is not visible with the current token).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token missing, invalid or lacking scope.
    #[error("Unauthorized ({status}) for {path}")]
    Unauthorized {
        /// HTTP status, 401 or 403.
        status: u16,
        /// Request path.
        path: String,
    },

    /// Any other non-success status.
    #[error("GitHub API call to {path} failed with {status}: {body}")]
    Status {
        /// Request path.
        path: String,
        /// HTTP status.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Response body did not match the expected shape.
    #[error("Invalid response from {path}: {message}")]
    Decode {
        /// Request path.
        path: String,
        /// Deserialization error.
        message: String,
    },
}

/// Result type for GitHub operations.
pub type Result<T> = std::result::Result<T, GithubError>;

impl From<GithubError> for CoreError {
    fn from(err: GithubError) -> Self {
        CoreError::data_source(err.to_string())
    }
}

/// Connection settings for [`GithubClient`].
#[derive(Debug, Clone)]
pub struct GithubClientConfig {
    /// API base URL without trailing slash.
    pub base_url: String,
    /// Personal access or Actions token.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for GithubClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(60),
            user_agent: concat!("gh-perf-report/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobsPage {
    #[serde(default)]
    jobs: Vec<JobDescriptor>,
}

#[derive(Debug, Deserialize)]
struct ArtifactsPage {
    #[serde(default)]
    artifacts: Vec<ArtifactDescriptor>,
}

/// GitHub Actions implementation of [`CiSource`].
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl GithubClient {
    /// Build a client sharing `limiter` with every other caller.
    pub fn new(config: GithubClientConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| GithubError::Configuration(format!("invalid user agent: {e}")))?,
        );
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| GithubError::Configuration(format!("invalid token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                GithubError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter,
        })
    }

    /// The shared rate-limit gate.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        self.limiter.acquire().await;

        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "GitHub API request");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| GithubError::Transport {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::NOT_FOUND => Err(GithubError::NotFound(path.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GithubError::Unauthorized {
                status: status.as_u16(),
                path: path.to_string(),
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
                warn!(status = status.as_u16(), path, "GitHub API call failed");
                Err(GithubError::Status {
                    path: path.to_string(),
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.get(path).await?;
        response.json::<T>().await.map_err(|e| GithubError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_paginated<P, T>(&self, path: &str, items: impl Fn(P) -> Vec<T>) -> Result<Vec<T>>
    where
        P: DeserializeOwned,
    {
        let mut all = Vec::new();
        let mut page = 1usize;
        loop {
            let page_path = format!("{path}?per_page={PER_PAGE}&page={page}");
            let batch = items(self.get_json::<P>(&page_path).await?);
            let len = batch.len();
            all.extend(batch);
            if len < PER_PAGE {
                break;
            }
            page += 1;
        }
        debug!(path, count = all.len(), pages = page, "paginated listing complete");
        Ok(all)
    }

    async fn read_bytes(&self, path: &str, response: reqwest::Response) -> Result<Vec<u8>> {
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| GithubError::Transport {
                path: path.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl CiSource for GithubClient {
    async fn get_workflow_run(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> CoreResult<WorkflowRunInfo> {
        let path = format!("repos/{owner}/{repo}/actions/runs/{run_id}");
        Ok(self.get_json(&path).await?)
    }

    async fn get_workflow_jobs(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> CoreResult<Vec<JobDescriptor>> {
        let path = format!("repos/{owner}/{repo}/actions/runs/{run_id}/jobs");
        Ok(self
            .get_paginated(&path, |page: JobsPage| page.jobs)
            .await?)
    }

    async fn get_job_logs(&self, owner: &str, repo: &str, job_id: u64) -> CoreResult<String> {
        let path = format!("repos/{owner}/{repo}/actions/jobs/{job_id}/logs");
        let response = self.get(&path).await?;
        let bytes = self.read_bytes(&path, response).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn list_artifacts(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
    ) -> CoreResult<Vec<ArtifactDescriptor>> {
        let path = format!("repos/{owner}/{repo}/actions/runs/{run_id}/artifacts");
        Ok(self
            .get_paginated(&path, |page: ArtifactsPage| page.artifacts)
            .await?)
    }

    async fn get_job(&self, owner: &str, repo: &str, job_id: u64) -> CoreResult<JobDescriptor> {
        let path = format!("repos/{owner}/{repo}/actions/jobs/{job_id}");
        Ok(self.get_json(&path).await?)
    }

    async fn download_artifact(
        &self,
        owner: &str,
        repo: &str,
        artifact_id: u64,
    ) -> CoreResult<Vec<u8>> {
        let path = format!("repos/{owner}/{repo}/actions/artifacts/{artifact_id}/zip");
        let response = match self.get(&path).await {
            Ok(response) => response,
            Err(GithubError::NotFound(_)) => {
                return Err(CoreError::artifact_not_found(format!(
                    "artifact {artifact_id} in {owner}/{repo} is missing or expired"
                )))
            }
            Err(e) => {
                return Err(CoreError::artifact_not_found(format!(
                    "Failed to download artifact {artifact_id}: {e}"
                )))
            }
        };
        Ok(self.read_bytes(&path, response).await?)
    }
}
