// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! GitHub Actions data source.
//!
//! - **Client**: [`GithubClient`], the REST implementation of
//!   [`gh_perf_report_core::CiSource`]
//! - **Rate limit**: [`RateLimiter`], the process-wide gate every call passes
//!
//! # Example
//!
//! ```ignore
//! use gh_perf_report_adapters::github::prelude::*;
//! use std::sync::Arc;
//!
//! let limiter = Arc::new(RateLimiter::new(10.0));
//! let client = GithubClient::new(GithubClientConfig::default(), limiter)?;
//! let jobs = client.get_workflow_jobs("tenstorrent", "tt-xla", 123).await?;
//! ```

pub mod client;
pub mod rate_limit;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use super::client::{GithubClient, GithubClientConfig, GithubError};
    pub use super::rate_limit::RateLimiter;
    pub use gh_perf_report_core::CiSource;
}

pub use client::{GithubClient, GithubClientConfig, GithubError, DEFAULT_API_BASE_URL};
pub use rate_limit::RateLimiter;
