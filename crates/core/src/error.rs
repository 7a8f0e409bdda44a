// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy shared by every gh-perf-report crate.
//!
//! Only [`Error::DataSource`], [`Error::Config`] and [`Error::Validation`] are
//! allowed to abort a whole report. Everything else is contained per job and
//! surfaces as `error_message` on a [`crate::JobResult`].

use thiserror::Error;

/// Errors produced while building reports and comparisons.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// A remote call to the CI data source failed or returned malformed data.
    #[error("CI data source error: {0}")]
    DataSource(String),

    /// An artifact that was expected could not be found or downloaded.
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Log or CSV content could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Any other failure while processing a single job.
    #[error("Processing error: {0}")]
    Processing(String),

    /// Invalid input handed to the pipeline.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a data source error.
    pub fn data_source(msg: impl Into<String>) -> Self {
        Self::DataSource(msg.into())
    }

    /// Create an artifact-not-found error.
    pub fn artifact_not_found(msg: impl Into<String>) -> Self {
        Self::ArtifactNotFound(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a processing error.
    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error must abort the whole report rather than a single job.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DataSource(_) | Self::Config(_) | Self::Validation(_)
        )
    }
}

/// Result type for gh-perf-report operations.
pub type Result<T> = std::result::Result<T, Error>;
