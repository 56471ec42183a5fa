//! csvload - parallel CSV to PostgreSQL loader

use anyhow::{Context, Result};
use clap::Parser;
use csvload::config::{
    DatabaseSettings, LoadConfig, DEFAULT_FILES, DEFAULT_MAX_RETRIES, DEFAULT_MAX_WORKERS,
    DEFAULT_RETRY_DELAY_SECS, DEFAULT_SOURCE_DIR,
};
use csvload::{Orchestrator, RunReport, WritePolicy};
use csvload_common::logging::{init_logging, LogConfig, LogLevel};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "csvload")]
#[command(author, version, about = "Load CSV files into PostgreSQL tables in parallel")]
struct Cli {
    /// Directory containing the CSV files
    #[arg(short, long, env = "CSVLOAD_SOURCE_DIR", default_value = DEFAULT_SOURCE_DIR)]
    source_dir: PathBuf,

    /// File to load; repeat or comma-separate for several (defaults to the Olist dataset)
    #[arg(short, long = "file", env = "CSVLOAD_FILES", value_delimiter = ',')]
    files: Vec<String>,

    /// What to do when a table already exists: replace, append or fail
    #[arg(long, env = "CSVLOAD_IF_EXISTS", default_value = "replace")]
    if_exists: WritePolicy,

    /// Number of files loaded concurrently
    #[arg(long, env = "CSVLOAD_MAX_WORKERS", default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: usize,

    /// Attempts per file before giving up
    #[arg(long, env = "CSVLOAD_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, env = "CSVLOAD_RETRY_DELAY_SECS", default_value_t = DEFAULT_RETRY_DELAY_SECS)]
    retry_delay_secs: f64,

    /// Also write the run report as JSON to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self, database: DatabaseSettings) -> LoadConfig {
        let files = if self.files.is_empty() {
            DEFAULT_FILES.iter().map(|f| f.to_string()).collect()
        } else {
            self.files
        };

        LoadConfig {
            source_dir: self.source_dir,
            files,
            write_policy: self.if_exists,
            max_workers: self.max_workers,
            max_retries: self.max_retries,
            retry_delay_secs: self.retry_delay_secs,
            database,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads CSVLOAD_* variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("csvload")
        .filter_directives("sqlx=warn")
        .build()
        .merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    let summary_json = cli.summary_json.clone();
    let config = cli.into_config(DatabaseSettings::from_env());

    let orchestrator = match Orchestrator::from_config(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!(error = %e, "Aborting before any file was loaded");
            return Err(e.into());
        },
    };

    info!(
        source_dir = %orchestrator.config().source_dir.display(),
        files = orchestrator.config().files.len(),
        "Starting data load"
    );

    let report = orchestrator.run().await;

    if let Some(path) = summary_json {
        write_summary(&path, &report)?;
        info!(path = %path.display(), "Wrote JSON summary");
    }

    // Failed files are part of a normal run; only configuration errors exit non-zero
    Ok(())
}

fn write_summary(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    Ok(())
}
