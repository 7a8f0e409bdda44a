// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Device-perf CSV aggregation.
//!
//! Each CSV file of a device-perf artifact records per-operation kernel
//! timing for one stage of the model. Rows flagged as constant evaluation or
//! input layout conversion are excluded; the remaining durations are summed
//! per file and then across files.

use gh_perf_report_core::config::csv_columns;
use gh_perf_report_core::{DevicePerfMetrics, Error, Result, StagePerfMetrics};
use tracing::debug;

/// Lenient boolean used by the flag columns.
///
/// `true`, `1`, `yes` and `t` (any case, surrounding whitespace ignored) are
/// true; everything else, including the empty string, is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "t"
    )
}

/// Parse a single device-perf CSV file.
///
/// Fails with [`Error::Parse`] if a required column is missing from the
/// header or the CSV structure is malformed. Rows whose duration is not a
/// number are skipped.
pub fn parse_device_perf_csv(text: &str) -> Result<DevicePerfMetrics> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::parse(format!("Failed to read CSV header: {e}")))?
        .clone();

    let missing: Vec<&str> = csv_columns::REQUIRED
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(Error::parse(format!("Missing required columns: {missing:?}")));
    }

    let position = |column: &str| headers.iter().position(|h| h == column);
    let duration_idx = position(csv_columns::DEVICE_KERNEL_DURATION);
    let flag_idx: Vec<usize> = csv_columns::FILTER_FLAGS
        .iter()
        .filter_map(|flag| position(*flag))
        .collect();

    let mut total_ns = 0.0_f64;
    let mut count = 0_u64;
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| Error::parse(format!("Malformed CSV row {}: {e}", line + 2)))?;

        if flag_idx
            .iter()
            .any(|&i| record.get(i).map(parse_bool).unwrap_or(false))
        {
            continue;
        }

        let Some(duration) = duration_idx
            .and_then(|i| record.get(i))
            .and_then(|raw| raw.trim().parse::<f64>().ok())
        else {
            continue;
        };

        total_ns += duration;
        count += 1;
    }

    Ok(DevicePerfMetrics::from_totals(total_ns, count))
}

/// Combine the CSV files of one artifact into a single metric set.
///
/// `files` must already be in stage order (ascending file name). Files that
/// fail to parse or have no surviving rows are dropped; the survivors are
/// numbered `Stage 1..N` in input order. Fails with [`Error::Parse`] if no
/// file survives.
pub fn aggregate_artifact<N, T>(files: &[(N, T)]) -> Result<DevicePerfMetrics>
where
    N: AsRef<str>,
    T: AsRef<str>,
{
    let mut stages = Vec::new();
    for (name, text) in files {
        let name: &str = name.as_ref();
        let text: &str = text.as_ref();
        match parse_device_perf_csv(text) {
            Ok(metrics) if metrics.filtered_op_count == 0 => {
                debug!(file = name, "skipping CSV without surviving operations");
            }
            Ok(metrics) => stages.push(StagePerfMetrics {
                stage_name: format!("Stage {}", stages.len() + 1),
                duration_ns: metrics.total_op_duration_ns,
                op_count: metrics.filtered_op_count,
            }),
            Err(e) => {
                debug!(file = name, error = %e, "skipping unparseable CSV");
            }
        }
    }

    if stages.is_empty() {
        return Err(Error::parse(
            "No valid device perf data found in any CSV file",
        ));
    }

    Ok(DevicePerfMetrics::from_stages(stages))
}
