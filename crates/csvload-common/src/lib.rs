//! csvload common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, error handling and logging for the csvload workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the closed [`LoadError`] enumeration and result alias
//! - **Types**: load tasks, per-file outcomes, the run report and write policies
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//!
//! # Example
//!
//! ```no_run
//! use csvload_common::{LoadTask, RunReport, LoadOutcome};
//!
//! let task = LoadTask::from_file_name("data", "orders.csv");
//! let mut report = RunReport::default();
//! report.record(LoadOutcome::success(&task, 1, 42));
//! assert_eq!(report.successful.len(), 1);
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{LoadError, Result};
pub use types::{LoadOutcome, LoadTask, RunReport, WritePolicy};
