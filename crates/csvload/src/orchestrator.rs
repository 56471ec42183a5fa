//! Parallel load orchestrator
//!
//! Runs a fixed pool of workers over a shared task queue. Each worker pulls
//! the next task, loads it with [`SingleFileLoader`] and sends the outcome
//! back on a channel. The orchestrating task is the only one touching the
//! [`RunReport`]: it drains outcomes in completion order until every worker
//! has finished.

use csvload_common::{LoadOutcome, LoadTask, Result, RunReport};
use futures::future::join_all;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::LoadConfig;
use crate::destination::{Destination, PostgresDestination};
use crate::loader::SingleFileLoader;
use crate::report;

type TaskQueue = Arc<Mutex<VecDeque<LoadTask>>>;

/// Loads a set of files in parallel and reports per-file results
pub struct Orchestrator {
    config: LoadConfig,
    loader: SingleFileLoader,
}

impl Orchestrator {
    /// Build an orchestrator writing to `destination`
    pub fn new(config: LoadConfig, destination: Arc<dyn Destination>) -> Result<Self> {
        config.validate()?;
        let loader = SingleFileLoader::from_config(destination, &config);
        Ok(Self { config, loader })
    }

    /// Build an orchestrator writing to PostgreSQL.
    ///
    /// Fails with a configuration error, before any file is read, when the
    /// run parameters are invalid or a database setting is missing.
    pub fn from_config(config: LoadConfig) -> Result<Self> {
        let destination = PostgresDestination::from_settings(&config.database)?;
        Self::new(config, Arc::new(destination))
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Load every configured file, log the summary and return the report
    pub async fn run(&self) -> RunReport {
        let started = Instant::now();
        let report = self.run_tasks(self.config.tasks(), self.config.max_workers).await;

        report::report(&report);
        info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Data load finished in {:.2}s",
            started.elapsed().as_secs_f64()
        );

        report
    }

    /// Load `tasks` with at most `max_workers` running at once.
    ///
    /// Returns once every task has produced its outcome. A failing task never
    /// stops the others.
    pub async fn run_tasks(&self, tasks: Vec<LoadTask>, max_workers: usize) -> RunReport {
        let total = tasks.len();
        let workers = max_workers.max(1).min(total.max(1));

        info!(
            files = total,
            workers,
            policy = %self.config.write_policy,
            "Loading {} files with {} workers",
            total,
            workers
        );

        let queue: TaskQueue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<LoadOutcome>();

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                let queue = queue.clone();
                let outcome_tx = outcome_tx.clone();
                let loader = self.loader.clone();
                tokio::spawn(worker_loop(worker_id, queue, loader, outcome_tx))
            })
            .collect();

        // Workers hold the remaining senders; the channel closes when the last one exits
        drop(outcome_tx);

        let mut report = RunReport::new();
        while let Some(outcome) = outcome_rx.recv().await {
            debug!(
                source = %outcome.source_path.display(),
                succeeded = outcome.succeeded,
                attempts = outcome.attempts,
                completed = report.total() + 1,
                total,
                "Outcome received"
            );
            report.record(outcome);
        }

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Load worker terminated abnormally");
            }
        }

        report
    }
}

/// Pull tasks until the queue is empty, sending one outcome per task
async fn worker_loop(
    worker_id: usize,
    queue: TaskQueue,
    loader: SingleFileLoader,
    outcomes: mpsc::UnboundedSender<LoadOutcome>,
) {
    debug!(worker_id, "Load worker started");

    while let Some(task) = next_task(&queue) {
        let outcome = load_isolated(&loader, task).await;
        if outcomes.send(outcome).is_err() {
            break;
        }
    }

    debug!(worker_id, "Load worker finished");
}

fn next_task(queue: &TaskQueue) -> Option<LoadTask> {
    queue
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .pop_front()
}

/// Run one load on its own task so a panic becomes a failed outcome
async fn load_isolated(loader: &SingleFileLoader, task: LoadTask) -> LoadOutcome {
    let handle = {
        let loader = loader.clone();
        let task = task.clone();
        tokio::spawn(async move { loader.load(&task).await })
    };

    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(
                source = %task.source_path.display(),
                error = %e,
                "Load task panicked"
            );
            LoadOutcome::failure(&task, 1, format!("Load task panicked: {}", e))
        },
    }
}
