//! csvload
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads a fixed list of CSV files into PostgreSQL, one table per file.
//!
//! Files are loaded concurrently by a bounded worker pool. Each file gets
//! its own connection and transaction per attempt, transient failures are
//! retried after a fixed delay, and every file ends up in exactly one of
//! the successful or failed lists of the final [`RunReport`].
//!
//! # Example
//!
//! ```no_run
//! use csvload::config::{DatabaseSettings, LoadConfig};
//! use csvload::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LoadConfig {
//!         database: DatabaseSettings::from_env(),
//!         ..LoadConfig::default()
//!     };
//!
//!     let orchestrator = Orchestrator::from_config(config)?;
//!     let report = orchestrator.run().await;
//!     println!("{} loaded, {} failed", report.successful.len(), report.failed.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod destination;
pub mod loader;
pub mod orchestrator;
pub mod report;
pub mod validator;

pub use csvload_common::{LoadError, LoadOutcome, LoadTask, Result, RunReport, WritePolicy};
pub use dataset::Dataset;
pub use loader::{RetryPolicy, SingleFileLoader};
pub use orchestrator::Orchestrator;
