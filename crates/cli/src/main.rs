// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! gh-perf-report binary entry point.

use clap::Parser;
use gh_perf_report_cli::{init_tracing, run, Cli};

#[tokio::main]
async fn main() {
    // Variables from .env must be visible to both logging and settings.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
