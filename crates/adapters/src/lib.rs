// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! CI data source adapters for gh-perf-report.
//!
//! The pipeline only depends on the [`gh_perf_report_core::CiSource`] trait;
//! this crate provides the GitHub Actions implementation and the rate-limit
//! gate it shares across workers.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod github;

pub use github::{GithubClient, GithubClientConfig, GithubError, RateLimiter};
