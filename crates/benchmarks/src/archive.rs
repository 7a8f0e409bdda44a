// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Device-perf artifact archives.

use gh_perf_report_core::{Error, Result};
use std::io::{Cursor, Read};
use zip::ZipArchive;

// Declared entry sizes come from the archive itself and are not trusted.
const MAX_PREALLOCATED_BYTES: u64 = 1 << 20;

/// Extract every `.csv` entry of a zip archive as `(name, text)`.
///
/// Entries are sorted by name so that the result is in stage order. Text is
/// decoded as UTF-8, replacing invalid sequences. Fails with
/// [`Error::Parse`] if the archive is invalid or holds no CSV file.
pub fn extract_csv_files(bytes: &[u8]) -> Result<Vec<(String, String)>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::parse(format!("Invalid ZIP file: {e}")))?;

    let mut files = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| Error::parse(format!("Failed to read ZIP entry {index}: {e}")))?;
        if entry.is_dir() || !entry.name().ends_with(".csv") {
            continue;
        }

        let name = entry.name().to_string();
        let mut content = Vec::with_capacity(entry.size().min(MAX_PREALLOCATED_BYTES) as usize);
        entry
            .read_to_end(&mut content)
            .map_err(|e| Error::parse(format!("Failed to extract {name} from ZIP: {e}")))?;
        files.push((name, String::from_utf8_lossy(&content).into_owned()));
    }

    if files.is_empty() {
        return Err(Error::parse("No CSV file found in artifact ZIP"));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}
