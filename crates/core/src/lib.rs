// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for gh-perf-report.
//!
//! This crate holds everything the benchmark pipeline and the CI adapters
//! agree on:
//!
//! - [`types`] - the report data model (`JobResult`, `WorkflowReport`, ...)
//! - [`normalize`] - the job-name matching key
//! - [`source`] - the [`CiSource`] contract for the remote CI data source
//! - [`config`] - defaults and comparison thresholds
//! - [`error`] - the shared error taxonomy

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod normalize;
pub mod source;
pub mod types;

pub use config::Thresholds;
pub use error::{Error, Result};
pub use normalize::{model_display_name, normalize_job_name};
pub use source::{ArtifactDescriptor, CiSource, JobDescriptor, StepDescriptor, WorkflowRunInfo};
pub use types::{
    ComparisonKind, ComparisonResult, DevicePerfMetrics, JobConclusion, JobResult, JobStatus,
    SimulationMetrics, StagePerfMetrics, WorkflowReport,
};
