// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark report and comparison pipeline for gh-perf-report.
//!
//! This crate turns the jobs of a CI workflow run into a
//! [`WorkflowReport`](gh_perf_report_core::WorkflowReport) and compares two
//! such reports.
//!
//! # Quick Start
//!
//! ```no_run
//! use gh_perf_report_benchmarks::{CompareProcessor, ReportOptions, ReportProcessor};
//! use gh_perf_report_core::CiSource;
//! use std::sync::Arc;
//!
//! # async fn run(source: Arc<dyn CiSource>) -> gh_perf_report_core::Result<()> {
//! let processor = ReportProcessor::new(source, ReportOptions::default());
//! let baseline = processor.process_workflow_run("tenstorrent", "tt-xla", 1).await?;
//! let current = processor.process_workflow_run("tenstorrent", "tt-xla", 2).await?;
//!
//! for comparison in CompareProcessor::default().compare_reports(&baseline, &current) {
//!     println!("{}: {}", comparison.job_name, comparison.kind());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`log_parser`] - throughput metrics from job logs
//! - [`csv_parser`] - device-perf CSV aggregation
//! - [`archive`] - CSV extraction from artifact zips
//! - [`reconcile`] - artifact lookup by normalized job name
//! - [`processor`] - bounded concurrent per-job extraction
//! - [`report`] - workflow report assembly
//! - [`compare`] - run-to-run comparison
//! - [`io`] - JSON and Markdown output files
//! - [`markdown`] - Markdown generation

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod archive;
pub mod compare;
pub mod csv_parser;
pub mod io;
pub mod log_parser;
pub mod markdown;
pub mod processor;
pub mod reconcile;
pub mod report;

#[cfg(test)]
pub(crate) mod testing;

pub use compare::{summarize, CompareProcessor, ComparisonSummary};
pub use io::ComparisonDocument;
pub use processor::{JobFailure, JobProcessor};
pub use reconcile::ArtifactCache;
pub use report::{is_benchmark_job, ReportOptions, ReportProcessor};
