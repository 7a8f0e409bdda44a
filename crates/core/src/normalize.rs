// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Job name normalization.
//!
//! CI job names are free-form, e.g.
//! `run-n150-perf-benchmarks / tt-xla-resnet (n150-perf, 12, 128) benchmark`
//! or `run-n150-perf-benchmarks / perf resnet_50.v2 (n150-perf)`. The same
//! logical benchmark keeps its model identifier across workflow runs and
//! across re-run attempts, so that identifier is the matching key.
//!
//! [`normalize_job_name`] is the only matching key used anywhere in the
//! workspace: the artifact cache and the comparison engine both call it.

use once_cell::sync::Lazy;
use regex::Regex;

/// `tt-xla-<id>` / `tt-forge-<id>`; group 1 is the bare model identifier.
static PRODUCT_PREFIXED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)tt-(?:xla|forge)-([a-zA-Z0-9_-]+)").expect("valid product-prefix regex")
});

/// `/ perf <id>`; group 1 is the model identifier.
static PERF_SLASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)/\s*perf\s+([a-zA-Z0-9_][a-zA-Z0-9_.-]*)").expect("valid perf regex")
});

/// Canonicalize a CI job name into the key used to match jobs across runs.
///
/// First match wins:
/// 1. the whole `tt-(xla|forge)-<id>` substring,
/// 2. the `<id>` of a `/ perf <id>` segment,
/// 3. the entire name.
///
/// The result is always lower-cased, so the function is case-insensitive and
/// idempotent.
pub fn normalize_job_name(job_name: &str) -> String {
    if let Some(m) = PRODUCT_PREFIXED.find(job_name) {
        return m.as_str().to_lowercase();
    }
    if let Some(caps) = PERF_SLASH.captures(job_name) {
        return caps[1].to_lowercase();
    }
    job_name.to_lowercase()
}

/// Display name of the model a job benchmarks.
///
/// Uses the same two patterns as [`normalize_job_name`] but keeps the original
/// case, drops the product prefix, and falls back to the raw job name.
pub fn model_display_name(job_name: &str) -> String {
    if let Some(caps) = PRODUCT_PREFIXED.captures(job_name) {
        return caps[1].to_string();
    }
    if let Some(caps) = PERF_SLASH.captures(job_name) {
        return caps[1].to_string();
    }
    job_name.to_string()
}
