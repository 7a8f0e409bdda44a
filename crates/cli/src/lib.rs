// Copyright 2025 gh-perf-report Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command-line interface for gh-perf-report.
//!
//! Three subcommands sit on top of the benchmarks pipeline:
//! - `report` builds the performance report of one workflow run
//! - `compare` builds two reports and classifies every job
//! - `list-jobs` lists every job of a run and flags the benchmark jobs
//!
//! Reports are printed as text tables on stdout; `--json` and `--markdown`
//! additionally write them to files. Logs go to stderr.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod output;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use gh_perf_report_adapters::{GithubClient, GithubClientConfig, RateLimiter};
use gh_perf_report_benchmarks::{
    io, CompareProcessor, ComparisonDocument, ReportOptions, ReportProcessor,
};
use gh_perf_report_core::CiSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// gh-perf-report CLI.
#[derive(Parser, Debug)]
#[command(name = "gh-perf-report")]
#[command(author, version, long_about = None)]
#[command(about = "Performance reports for GitHub Actions benchmark runs")]
pub struct Cli {
    /// Settings file (TOML); defaults to ./gh-perf-report.toml when present.
    #[arg(long, global = true, env = "GH_PERF_REPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the performance report of a workflow run.
    Report {
        /// Workflow run identifier.
        run_id: u64,

        /// Repository name (e.g. tt-xla).
        #[arg(short, long)]
        repo: String,

        /// Repository owner override.
        #[arg(short, long)]
        owner: Option<String>,

        /// Concurrent job tasks.
        #[arg(short, long)]
        workers: Option<usize>,

        /// Also write the report as JSON.
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// Also write the report as Markdown.
        #[arg(long, value_name = "FILE")]
        markdown: Option<PathBuf>,
    },

    /// Compare the benchmark results of two workflow runs.
    Compare {
        /// Baseline workflow run identifier.
        baseline_run_id: u64,

        /// Current workflow run identifier.
        current_run_id: u64,

        /// Repository of the baseline run.
        #[arg(long)]
        baseline_repo: String,

        /// Repository of the current run; defaults to the baseline repository.
        #[arg(long)]
        current_repo: Option<String>,

        /// Repository owner override.
        #[arg(short, long)]
        owner: Option<String>,

        /// Concurrent job tasks per run.
        #[arg(short, long)]
        workers: Option<usize>,

        /// Also write the comparison as JSON.
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// Also write the comparison as Markdown.
        #[arg(long, value_name = "FILE")]
        markdown: Option<PathBuf>,
    },

    /// List all jobs of a workflow run, flagging benchmark jobs.
    ListJobs {
        /// Workflow run identifier.
        run_id: u64,

        /// Repository name.
        #[arg(short, long)]
        repo: String,

        /// Repository owner override.
        #[arg(short, long)]
        owner: Option<String>,
    },
}

impl Commands {
    fn overrides(&self) -> (Option<&str>, Option<usize>) {
        match self {
            Self::Report { owner, workers, .. } | Self::Compare { owner, workers, .. } => {
                (owner.as_deref(), *workers)
            }
            Self::ListJobs { owner, .. } => (owner.as_deref(), None),
        }
    }
}

/// Install the global tracing subscriber on stderr.
///
/// `RUST_LOG` takes precedence; otherwise `verbose` selects `debug` and the
/// default level is `warn`.
pub fn init_tracing(verbose: bool, format: LogFormat) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}

/// Load settings and fold in the command-line overrides.
pub fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    let (owner, workers) = cli.command.overrides();
    apply_overrides(&mut settings, owner, workers);
    settings.validate()?;
    Ok(settings)
}

fn apply_overrides(settings: &mut Settings, owner: Option<&str>, workers: Option<usize>) {
    if let Some(owner) = owner {
        settings.owner = owner.to_string();
    }
    if let Some(workers) = workers {
        settings.max_workers = workers;
    }
}

fn build_source(settings: &Settings) -> anyhow::Result<Arc<dyn CiSource>> {
    let limiter = Arc::new(RateLimiter::new(settings.rate_limit_per_second));
    let client = GithubClient::new(
        GithubClientConfig {
            base_url: settings.api_base_url.clone(),
            token: settings.token.clone(),
            timeout: Duration::from_secs(settings.request_timeout_secs),
            ..GithubClientConfig::default()
        },
        limiter,
    )?;
    if settings.token.is_none() {
        debug!("no GitHub token configured, using anonymous requests");
    }
    Ok(Arc::new(client))
}

fn report_options(settings: &Settings) -> ReportOptions {
    ReportOptions {
        max_workers: settings.max_workers,
        benchmark_job_patterns: settings.benchmark_job_patterns.clone(),
        artifact_prefix: settings.artifact_prefix.clone(),
    }
}

fn written(kind: &str, path: &Path) {
    info!(path = %path.display(), "wrote {kind}");
    eprintln!("Wrote {kind} to {}", path.display());
}

/// Run the parsed command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let settings = load_settings(&cli)?;
    let owner = settings.owner.clone();

    match &cli.command {
        Commands::Report {
            run_id,
            repo,
            json,
            markdown,
            ..
        } => {
            let repo = settings.resolve_repo(repo)?;
            let processor =
                ReportProcessor::new(build_source(&settings)?, report_options(&settings));
            let report = processor
                .process_workflow_run(&owner, &repo, *run_id)
                .await
                .with_context(|| format!("failed to build report for run {run_id}"))?;

            print!("{}", output::render_report(&report));
            if let Some(path) = json {
                io::write_report_json(&report, path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                written("JSON report", path);
            }
            if let Some(path) = markdown {
                io::write_report_markdown(&report, path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                written("Markdown report", path);
            }
        }

        Commands::Compare {
            baseline_run_id,
            current_run_id,
            baseline_repo,
            current_repo,
            json,
            markdown,
            ..
        } => {
            let baseline_repo = settings.resolve_repo(baseline_repo)?;
            let current_repo = match current_repo {
                Some(repo) => settings.resolve_repo(repo)?,
                None => baseline_repo.clone(),
            };
            let processor =
                ReportProcessor::new(build_source(&settings)?, report_options(&settings));

            let (baseline, current) = tokio::try_join!(
                async {
                    processor
                        .process_workflow_run(&owner, &baseline_repo, *baseline_run_id)
                        .await
                        .with_context(|| {
                            format!("failed to build baseline report for run {baseline_run_id}")
                        })
                },
                async {
                    processor
                        .process_workflow_run(&owner, &current_repo, *current_run_id)
                        .await
                        .with_context(|| {
                            format!("failed to build current report for run {current_run_id}")
                        })
                },
            )?;

            let comparisons =
                CompareProcessor::new(settings.thresholds).compare_reports(&baseline, &current);
            let document = ComparisonDocument::new(&baseline, &current, comparisons);

            print!("{}", output::render_comparison(&document));
            if let Some(path) = json {
                io::write_comparison_json(&document, path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                written("JSON comparison", path);
            }
            if let Some(path) = markdown {
                io::write_comparison_markdown(&document, path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                written("Markdown comparison", path);
            }
        }

        Commands::ListJobs { run_id, repo, .. } => {
            let repo = settings.resolve_repo(repo)?;
            let processor =
                ReportProcessor::new(build_source(&settings)?, report_options(&settings));
            let jobs = processor
                .workflow_jobs(&owner, &repo, *run_id)
                .await
                .with_context(|| format!("failed to list jobs of run {run_id}"))?;
            print!("{}", output::render_jobs(&jobs, processor.options()));
        }
    }

    Ok(())
}
