// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Layered settings for the command-line tool.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. A TOML file (`--config <path>`, or `gh-perf-report.toml` if present)
//! 3. `GH_PERF_REPORT_*` environment variables
//! 4. Command-line flags, applied by the caller

use gh_perf_report_adapters::github::DEFAULT_API_BASE_URL;
use gh_perf_report_core::config::{
    ARTIFACT_PREFIX_DEVICE_PERF, BENCHMARK_JOB_PATTERNS, DEFAULT_API_RATE_LIMIT,
    DEFAULT_MAX_WORKERS, DEFAULT_OWNER, SUPPORTED_REPOS,
};
use gh_perf_report_core::{Error, Result, Thresholds};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of the environment variables read into [`Settings`].
pub const ENV_PREFIX: &str = "GH_PERF_REPORT";

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "gh-perf-report";

/// Token variables consulted when no token was configured explicitly.
pub const TOKEN_FALLBACK_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Repository owner.
    pub owner: String,
    /// GitHub REST API base URL.
    pub api_base_url: String,
    /// API token.
    pub token: Option<String>,
    /// Concurrent job tasks.
    pub max_workers: usize,
    /// Outbound call budget, in calls per second.
    pub rate_limit_per_second: f64,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Comparison thresholds.
    pub thresholds: Thresholds,
    /// Job-name markers of benchmark jobs.
    pub benchmark_job_patterns: Vec<String>,
    /// Device-perf artifact name prefix.
    pub artifact_prefix: String,
    /// Repositories accepted on the command line.
    pub supported_repos: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            max_workers: DEFAULT_MAX_WORKERS,
            rate_limit_per_second: DEFAULT_API_RATE_LIMIT,
            request_timeout_secs: 60,
            thresholds: Thresholds::default(),
            benchmark_job_patterns: BENCHMARK_JOB_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            artifact_prefix: ARTIFACT_PREFIX_DEVICE_PERF.to_string(),
            supported_repos: SUPPORTED_REPOS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

fn config_error(e: config::ConfigError) -> Error {
    Error::config(e.to_string())
}

impl Settings {
    /// Load settings from the process environment and an optional file.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut settings = Self::load_from(config_path, None)?;
        settings.fill_token(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Load settings, reading environment variables from `env` instead of the
    /// process environment when given.
    pub fn load_from(
        config_path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default()).map_err(config_error)?);

        builder = match config_path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => {
                builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false))
            }
        };

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("benchmark_job_patterns")
                .with_list_parse_key("supported_repos")
                .source(env),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)
    }

    /// Take the token from the first fallback variable `lookup` resolves,
    /// unless one is already set.
    pub fn fill_token<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.token.as_deref().is_some_and(|t| !t.is_empty()) {
            return;
        }
        self.token = TOKEN_FALLBACK_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|t| !t.is_empty());
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::config("max_workers must be at least 1"));
        }
        if !self.rate_limit_per_second.is_finite() || self.rate_limit_per_second <= 0.0 {
            return Err(Error::config(format!(
                "rate_limit_per_second must be positive, got {}",
                self.rate_limit_per_second
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::config("request_timeout_secs must be at least 1"));
        }
        self.thresholds.validate()
    }

    /// Canonical spelling of `repo` if it is supported.
    pub fn resolve_repo(&self, repo: &str) -> Result<String> {
        self.supported_repos
            .iter()
            .find(|r| r.eq_ignore_ascii_case(repo))
            .cloned()
            .ok_or_else(|| {
                Error::validation(format!(
                    "Unsupported repository '{repo}'. Supported: {}",
                    self.supported_repos.join(", ")
                ))
            })
    }
}
