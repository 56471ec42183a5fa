//! Common types used across csvload

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::LoadError;

/// Outcome message for a file rejected by the validator
pub const VALIDATION_FAILED_MESSAGE: &str = "Validation failed";

/// Outcome message for a file that could not be parsed at all
pub const MALFORMED_CSV_MESSAGE: &str = "Empty or malformed CSV";

// ============================================================================
// Write Policy
// ============================================================================

/// What to do when the destination table already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// Drop the table and recreate it with the new rows
    #[default]
    Replace,
    /// Insert the rows into the existing table, creating it when missing
    Append,
    /// Refuse to write when the table exists
    Fail,
}

impl WritePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritePolicy::Replace => "replace",
            WritePolicy::Append => "append",
            WritePolicy::Fail => "fail",
        }
    }
}

impl std::str::FromStr for WritePolicy {
    type Err = LoadError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(WritePolicy::Replace),
            "append" => Ok(WritePolicy::Append),
            "fail" => Ok(WritePolicy::Fail),
            _ => Err(LoadError::config(format!(
                "Invalid write policy '{}': expected replace, append or fail",
                s
            ))),
        }
    }
}

impl std::fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Load Task
// ============================================================================

/// One source file and the table it is loaded into
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadTask {
    pub source_path: PathBuf,
    pub destination_table: String,
}

impl LoadTask {
    pub fn new(source_path: impl Into<PathBuf>, destination_table: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            destination_table: destination_table.into(),
        }
    }

    /// Build a task for `file_name` inside `source_dir`.
    ///
    /// The destination table is the file name without its extension, so
    /// `orders.csv` is loaded into `orders`.
    pub fn from_file_name(source_dir: impl AsRef<Path>, file_name: &str) -> Self {
        let source_path = source_dir.as_ref().join(file_name);
        let destination_table = Path::new(file_name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());

        Self {
            source_path,
            destination_table,
        }
    }
}

// ============================================================================
// Load Outcome
// ============================================================================

/// Terminal record for one task, however many attempts it took
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOutcome {
    pub source_path: PathBuf,
    pub destination_table: String,
    pub succeeded: bool,
    /// Empty iff `succeeded`
    pub error_message: String,
    pub attempts: u32,
    pub rows_loaded: u64,
}

impl LoadOutcome {
    pub fn success(task: &LoadTask, attempts: u32, rows_loaded: u64) -> Self {
        Self {
            source_path: task.source_path.clone(),
            destination_table: task.destination_table.clone(),
            succeeded: true,
            error_message: String::new(),
            attempts,
            rows_loaded,
        }
    }

    pub fn failure(task: &LoadTask, attempts: u32, error_message: impl Into<String>) -> Self {
        Self {
            source_path: task.source_path.clone(),
            destination_table: task.destination_table.clone(),
            succeeded: false,
            error_message: error_message.into(),
            attempts,
            rows_loaded: 0,
        }
    }
}

// ============================================================================
// Run Report
// ============================================================================

/// A file that ended in failure, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedLoad {
    pub source_path: PathBuf,
    pub error_message: String,
}

/// Successful and failed files of one run, in completion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub successful: Vec<PathBuf>,
    pub failed: Vec<FailedLoad>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one outcome into the successful or failed list
    pub fn record(&mut self, outcome: LoadOutcome) {
        if outcome.succeeded {
            self.successful.push(outcome.source_path);
        } else {
            self.failed.push(FailedLoad {
                source_path: outcome.source_path,
                error_message: outcome.error_message,
            });
        }
    }

    /// Number of tasks accounted for
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}
