// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Throughput extraction from benchmark job logs.
//!
//! A benchmark prints `Samples per second: <n>` once it finishes. Jobs that
//! never got that far simply have no metric, which is not an error.

use gh_perf_report_core::{model_display_name, Error, Result, SimulationMetrics};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

/// Longest error message kept from a log, in characters.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

static SAMPLES_PER_SECOND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)Samples?\s+per\s+second:\s*(\d+\.?\d*)").expect("valid regex")
});

static EXECUTION_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)Total\s+execution\s+time:\s*(\d+\.?\d*)").expect("valid regex")
});

static TOTAL_SAMPLES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)Total\s+samples:\s*(\d+)").expect("valid regex"));

static BATCH_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)Batch\s+size:\s*(\d+)").expect("valid regex"));

static METADATA: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("model_type", r"(?im)Model\s+type:\s*([^\n]+)"),
        ("dataset_name", r"(?im)Dataset\s+name:\s*([^\n]+)"),
        ("data_format", r"(?im)Data\s+format:\s*([^\n]+)"),
        ("input_size", r"(?im)Input\s+size:\s*([^\n]+)"),
    ]
    .into_iter()
    .map(|(key, pattern)| (key, Regex::new(pattern).expect("valid regex")))
    .collect()
});

// Tried in order; the first match wins.
static ERROR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?ms)Error:\s*(.+?)(?:\n|$)",
        r"(?ms)ERROR:\s*(.+?)(?:\n|$)",
        r"(?ms)FAILED:\s*(.+?)(?:\n|$)",
        r"(?ms)Exception:\s*(.+?)(?:\n|$)",
        r"(?ms)Traceback.*?(?:Error|Exception):\s*(.+?)(?:\n|$)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

/// Extract throughput metrics from `log` for the job named `job_name`.
///
/// Returns `Ok(None)` when the log has no samples-per-second line. Optional
/// values are extracted independently: one that matches its pattern but does
/// not fit the target type is left out.
pub fn extract_simulation_metrics(log: &str, job_name: &str) -> Result<Option<SimulationMetrics>> {
    let Some(samples_per_second) = capture::<f64>(&SAMPLES_PER_SECOND, log, "samples per second")?
    else {
        return Ok(None);
    };

    let metadata: BTreeMap<String, String> = METADATA
        .iter()
        .filter_map(|(key, pattern)| {
            pattern
                .captures(log)
                .and_then(|c| c.get(1))
                .map(|m| (key.to_string(), m.as_str().trim().to_string()))
        })
        .collect();

    Ok(Some(SimulationMetrics {
        model_name: model_display_name(job_name),
        samples_per_second,
        total_execution_time: optional(&EXECUTION_TIME, log, "total execution time"),
        total_samples: optional(&TOTAL_SAMPLES, log, "total samples"),
        batch_size: optional(&BATCH_SIZE, log, "batch size"),
        metadata,
    }))
}

fn capture<T>(pattern: &Regex, log: &str, what: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = pattern.captures(log).and_then(|c| c.get(1)) else {
        return Ok(None);
    };
    raw.as_str()
        .parse::<T>()
        .map(Some)
        .map_err(|e| Error::parse(format!("Failed to parse {what} '{}': {e}", raw.as_str())))
}

fn optional<T>(pattern: &Regex, log: &str, what: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    capture(pattern, log, what).unwrap_or_else(|e| {
        debug!(error = %e, "ignoring unparsable optional log value");
        None
    })
}

/// First error message found in `log`, truncated to
/// [`MAX_ERROR_MESSAGE_CHARS`] characters with a trailing `...`.
pub fn find_error(log: &str) -> Option<String> {
    ERROR_PATTERNS.iter().find_map(|pattern| {
        let message = pattern.captures(log)?.get(1)?.as_str().trim();
        Some(truncate(message))
    })
}

fn truncate(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_MESSAGE_CHARS) {
        Some((cut, _)) => format!("{}...", &message[..cut]),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BENCHMARK_LOG: &str = "\
2025-05-01T10:00:00Z Starting benchmark
Model type: CNN
Dataset name: ImageNet
Data format: bfloat16
Input size:  224x224
Batch size: 8
Total samples: 1024
Total execution time: 12.5
Samples per second: 81.92
Done";

    #[test]
    fn test_extracts_all_fields() {
        let metrics = extract_simulation_metrics(
            BENCHMARK_LOG,
            "run-n150-perf-benchmarks / tt-xla-resnet (n150-perf, 12, 128) benchmark",
        )
        .unwrap()
        .unwrap();

        assert_eq!(metrics.model_name, "resnet");
        assert_eq!(metrics.samples_per_second, 81.92);
        assert_eq!(metrics.total_execution_time, Some(12.5));
        assert_eq!(metrics.total_samples, Some(1024));
        assert_eq!(metrics.batch_size, Some(8));
        assert_eq!(metrics.metadata["model_type"], "CNN");
        assert_eq!(metrics.metadata["input_size"], "224x224");
        assert_eq!(metrics.metadata.len(), 4);
    }

    #[test]
    fn test_missing_samples_line_is_not_an_error() {
        let log = "Batch size: 8\nTotal samples: 10\n";
        assert_eq!(extract_simulation_metrics(log, "tt-xla-vit").unwrap(), None);
        assert_eq!(extract_simulation_metrics("", "tt-xla-vit").unwrap(), None);
    }

    #[test]
    fn test_singular_and_case_insensitive_samples_line() {
        let metrics = extract_simulation_metrics("SAMPLE PER SECOND: 12", "job")
            .unwrap()
            .unwrap();
        assert_eq!(metrics.samples_per_second, 12.0);
        assert_eq!(metrics.model_name, "job");
        assert!(metrics.total_samples.is_none());
        assert!(metrics.metadata.is_empty());
    }

    #[test]
    fn test_model_name_from_perf_style_job() {
        let metrics = extract_simulation_metrics(
            "Samples per second: 3.5",
            "run-n150-perf-benchmarks / perf Llama_3.2-1B (n150-perf)",
        )
        .unwrap()
        .unwrap();
        assert_eq!(metrics.model_name, "Llama_3.2-1B");
    }

    #[test]
    fn test_overflowing_optional_value_keeps_throughput() {
        let log = "Samples per second: 123.4\nTotal samples: 99999999999999999999999\nBatch size: 4\n";
        let metrics = extract_simulation_metrics(log, "tt-xla-resnet").unwrap().unwrap();
        assert_eq!(metrics.samples_per_second, 123.4);
        assert_eq!(metrics.total_samples, None);
        assert_eq!(metrics.batch_size, Some(4));
    }

    #[test]
    fn test_find_error_patterns_in_order() {
        assert_eq!(
            find_error("step 1\nValueError: shape mismatch\nmore").as_deref(),
            Some("shape mismatch")
        );
        assert_eq!(
            find_error("ERROR: device timeout\n").as_deref(),
            Some("device timeout")
        );
        assert_eq!(
            find_error("FAILED: tests/test_perf.py::test_resnet").as_deref(),
            Some("tests/test_perf.py::test_resnet")
        );
        assert_eq!(find_error("all good\n"), None);
    }

    #[test]
    fn test_find_error_truncates_long_messages() {
        let log = format!("Error: {}\n", "x".repeat(600));
        let message = find_error(&log).unwrap();
        assert_eq!(message.chars().count(), MAX_ERROR_MESSAGE_CHARS + 3);
        assert!(message.ends_with("..."));

        let exact = format!("Error: {}", "y".repeat(MAX_ERROR_MESSAGE_CHARS));
        assert_eq!(find_error(&exact).unwrap().len(), MAX_ERROR_MESSAGE_CHARS);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let log = format!("Error: {}", "é".repeat(501));
        let message = find_error(&log).unwrap();
        assert_eq!(message.chars().count(), MAX_ERROR_MESSAGE_CHARS + 3);
    }
}
