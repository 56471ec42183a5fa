//! Single-file loader
//!
//! Loads one CSV file into one table. Every attempt runs on its own
//! connection inside its own transaction:
//!
//! 1. connect
//! 2. begin
//! 3. read the file (all text)
//! 4. validate
//! 5. write under the configured [`WritePolicy`]
//! 6. commit
//!
//! Parse and validation failures end the load immediately. Any other error
//! is retried after a fixed delay with a brand-new connection until the
//! attempt budget is spent.

use csvload_common::types::{MALFORMED_CSV_MESSAGE, VALIDATION_FAILED_MESSAGE};
use csvload_common::{LoadError, LoadOutcome, LoadTask, Result, WritePolicy};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::LoadConfig;
use crate::dataset::Dataset;
use crate::destination::{Destination, DestinationSession};
use crate::validator;

/// Attempt budget and pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }
}

/// Loads a single file with retry
#[derive(Clone)]
pub struct SingleFileLoader {
    destination: Arc<dyn Destination>,
    write_policy: WritePolicy,
    retry: RetryPolicy,
}

impl SingleFileLoader {
    pub fn new(destination: Arc<dyn Destination>, write_policy: WritePolicy, retry: RetryPolicy) -> Self {
        Self {
            destination,
            write_policy,
            retry,
        }
    }

    pub fn from_config(destination: Arc<dyn Destination>, config: &LoadConfig) -> Self {
        Self::new(
            destination,
            config.write_policy,
            RetryPolicy::new(config.max_retries, config.retry_delay()),
        )
    }

    /// Load `task`, producing exactly one outcome
    pub async fn load(&self, task: &LoadTask) -> LoadOutcome {
        let source = task.source_path.display().to_string();
        let table = task.destination_table.as_str();
        let max_retries = self.retry.max_retries;
        let mut last_error = String::new();

        for attempt in 1..=max_retries {
            info!(
                source = %source,
                table,
                attempt,
                "Loading data from {} into table '{}'... (Attempt {})",
                source,
                table,
                attempt
            );

            match self.attempt(task).await {
                Ok(rows) => {
                    info!(
                        source = %source,
                        table,
                        rows,
                        attempt,
                        "Successfully loaded {} records into '{}'",
                        rows,
                        table
                    );
                    return LoadOutcome::success(task, attempt, rows);
                },
                Err(LoadError::Parse(reason)) => {
                    error!(source = %source, reason = %reason, "CSV file '{}' is empty or malformed", source);
                    return LoadOutcome::failure(task, attempt, MALFORMED_CSV_MESSAGE);
                },
                Err(LoadError::Validation(reason)) => {
                    error!(
                        source = %source,
                        reason = %reason,
                        "Validation failed for '{}'. Skipping this file.",
                        source
                    );
                    return LoadOutcome::failure(task, attempt, VALIDATION_FAILED_MESSAGE);
                },
                Err(LoadError::Configuration(message)) => {
                    error!(source = %source, error = %message, "Destination is misconfigured");
                    return LoadOutcome::failure(task, attempt, message);
                },
                Err(LoadError::Transient(message)) => {
                    warn!(
                        source = %source,
                        attempt,
                        error = %message,
                        "Attempt {} failed for {}: {}",
                        attempt,
                        source,
                        message
                    );
                    last_error = message;

                    if attempt < max_retries {
                        info!(
                            source = %source,
                            delay_secs = self.retry.retry_delay.as_secs_f64(),
                            "Retrying {} in {:.1} seconds...",
                            source,
                            self.retry.retry_delay.as_secs_f64()
                        );
                        tokio::time::sleep(self.retry.retry_delay).await;
                    }
                },
            }
        }

        error!(source = %source, "All {} attempts failed for {}", max_retries, source);
        LoadOutcome::failure(task, max_retries, last_error)
    }

    /// One attempt on a fresh session. The session is closed on every path.
    async fn attempt(&self, task: &LoadTask) -> Result<u64> {
        let mut session = self.destination.connect().await?;
        let result = self.run_in_session(session.as_mut(), task).await;
        session.close().await;
        result
    }

    async fn run_in_session(&self, session: &mut dyn DestinationSession, task: &LoadTask) -> Result<u64> {
        session.begin().await?;

        let dataset = Dataset::read(&task.source_path).await?;

        let source = task.source_path.display().to_string();
        if !validator::validate(&dataset, &source) {
            return Err(LoadError::validation(format!("{} failed validation", source)));
        }

        let rows = session
            .write_table(&task.destination_table, &dataset, self.write_policy)
            .await?;
        session.commit().await?;

        Ok(rows)
    }
}
