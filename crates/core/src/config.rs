// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Defaults and tunables shared across the pipeline.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default repository owner.
pub const DEFAULT_OWNER: &str = "tenstorrent";

/// Repositories the CLI accepts.
pub const SUPPORTED_REPOS: &[&str] = &["tt-forge", "tt-xla"];

/// A job whose name contains one of these markers is a benchmark job.
pub const BENCHMARK_JOB_PATTERNS: &[&str] = &["tt-xla-", "tt-forge-"];

/// Device-perf artifacts are named `<prefix><job id>`.
pub const ARTIFACT_PREFIX_DEVICE_PERF: &str = "device-perf-";

/// Default worker pool size.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Default outbound call rate, in calls per second.
pub const DEFAULT_API_RATE_LIMIT: f64 = 10.0;

/// Device-perf CSV columns.
pub mod csv_columns {
    /// Operation name.
    pub const OP_CODE: &str = "OP CODE";
    /// Kernel duration, summed into the stage total.
    pub const DEVICE_KERNEL_DURATION: &str = "DEVICE KERNEL DURATION [ns]";
    /// Op-to-op latency.
    pub const OP_TO_OP_LATENCY: &str = "OP TO OP LATENCY [ns]";
    /// Rows flagged as constant evaluation are excluded.
    pub const CONST_EVAL_OP: &str = "CONST_EVAL_OP";
    /// Rows flagged as input layout conversion are excluded.
    pub const INPUT_LAYOUT_CONVERSION_OP: &str = "INPUT_LAYOUT_CONVERSION_OP";

    /// Columns every device-perf CSV must carry.
    pub const REQUIRED: &[&str] = &[
        OP_CODE,
        DEVICE_KERNEL_DURATION,
        OP_TO_OP_LATENCY,
        CONST_EVAL_OP,
        INPUT_LAYOUT_CONVERSION_OP,
    ];

    /// Flag columns that exclude a row when true.
    pub const FILTER_FLAGS: &[&str] = &[CONST_EVAL_OP, INPUT_LAYOUT_CONVERSION_OP];
}

/// Percent thresholds gating regression and improvement classification.
///
/// Samples per second is higher-is-better, device duration lower-is-better:
/// a samples-per-second change below `regression_percent` or a duration
/// growth above `|regression_percent|` is a regression; a samples-per-second
/// change above `improvement_percent` or a duration drop below
/// `-improvement_percent` is an improvement. All comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Negative percent, e.g. `-5.0`.
    pub regression_percent: f64,
    /// Positive percent, e.g. `5.0`.
    pub improvement_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            regression_percent: -5.0,
            improvement_percent: 5.0,
        }
    }
}

impl Thresholds {
    /// Reject thresholds with the wrong sign.
    pub fn validate(&self) -> Result<()> {
        if !self.regression_percent.is_finite() || self.regression_percent > 0.0 {
            return Err(Error::config(format!(
                "regression_percent must be a non-positive number, got {}",
                self.regression_percent
            )));
        }
        if !self.improvement_percent.is_finite() || self.improvement_percent < 0.0 {
            return Err(Error::config(format!(
                "improvement_percent must be a non-negative number, got {}",
                self.improvement_percent
            )));
        }
        Ok(())
    }
}
