//! Shared helpers for csvload integration tests
//!
//! [`ScriptedDestination`] is an in-memory destination whose failures are
//! scripted per table, and which records every connection it hands out so
//! tests can check that sessions are released and that concurrency stays
//! bounded.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use csvload::destination::{Destination, DestinationSession};
use csvload::{Dataset, LoadError, WritePolicy};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Observable state of a [`ScriptedDestination`]
#[derive(Debug, Default)]
pub struct DestinationState {
    /// Calls to `connect`, including failed ones
    pub connect_calls: usize,
    /// Sessions handed out
    pub sessions_opened: usize,
    /// Calls to `close`
    pub sessions_closed: usize,
    pub open_sessions: usize,
    pub max_open_sessions: usize,
    pub rollbacks: usize,
    /// Rows committed per table
    pub committed: HashMap<String, u64>,
    /// Write attempts per table
    pub writes: HashMap<String, usize>,

    connect_failures: VecDeque<String>,
    write_failures: HashMap<String, VecDeque<String>>,
    always_fail: HashMap<String, String>,
    panic_on: HashSet<String>,
    write_delays: HashMap<String, Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedDestination {
    state: Arc<Mutex<DestinationState>>,
}

impl ScriptedDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next connection attempts with these messages
    pub fn fail_connects(self, messages: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .connect_failures
            .extend(messages.iter().map(|m| m.to_string()));
        self
    }

    /// Fail the next writes to `table` with these messages, in order
    pub fn fail_writes(self, table: &str, messages: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .write_failures
            .entry(table.to_string())
            .or_default()
            .extend(messages.iter().map(|m| m.to_string()));
        self
    }

    /// Fail every write to `table`, numbering the message by attempt
    pub fn always_fail(self, table: &str, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .always_fail
            .insert(table.to_string(), message.to_string());
        self
    }

    /// Panic inside `write_table` for `table`
    pub fn panic_on(self, table: &str) -> Self {
        self.state.lock().unwrap().panic_on.insert(table.to_string());
        self
    }

    /// Hold the session open for `delay` while writing `table`
    pub fn delay_writes(self, table: &str, delay: Duration) -> Self {
        self.state
            .lock()
            .unwrap()
            .write_delays
            .insert(table.to_string(), delay);
        self
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, DestinationState> {
        self.state.lock().unwrap()
    }

    pub fn shared(&self) -> Arc<dyn Destination> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl Destination for ScriptedDestination {
    async fn connect(&self) -> csvload::Result<Box<dyn DestinationSession>> {
        let mut state = self.state.lock().unwrap();
        state.connect_calls += 1;

        if let Some(message) = state.connect_failures.pop_front() {
            return Err(LoadError::transient(message));
        }

        state.sessions_opened += 1;
        state.open_sessions += 1;
        state.max_open_sessions = state.max_open_sessions.max(state.open_sessions);

        Ok(Box::new(ScriptedSession {
            state: self.state.clone(),
            in_transaction: false,
            pending: None,
            closed: false,
        }))
    }
}

struct ScriptedSession {
    state: Arc<Mutex<DestinationState>>,
    in_transaction: bool,
    pending: Option<(String, u64)>,
    closed: bool,
}

#[async_trait]
impl DestinationSession for ScriptedSession {
    async fn begin(&mut self) -> csvload::Result<()> {
        self.in_transaction = true;
        Ok(())
    }

    async fn write_table(
        &mut self,
        table: &str,
        dataset: &Dataset,
        _policy: WritePolicy,
    ) -> csvload::Result<u64> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            let attempt = {
                let count = state.writes.entry(table.to_string()).or_default();
                *count += 1;
                *count
            };

            if state.panic_on.contains(table) {
                drop(state);
                panic!("scripted panic while writing {}", table);
            }
            if let Some(message) = state
                .write_failures
                .get_mut(table)
                .and_then(|queue| queue.pop_front())
            {
                return Err(LoadError::transient(message));
            }
            if let Some(message) = state.always_fail.get(table) {
                return Err(LoadError::transient(format!("{} (write {})", message, attempt)));
            }
            state.write_delays.get(table).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let rows = dataset.row_count() as u64;
        self.pending = Some((table.to_string(), rows));
        Ok(rows)
    }

    async fn commit(&mut self) -> csvload::Result<()> {
        if let Some((table, rows)) = self.pending.take() {
            self.state.lock().unwrap().committed.insert(table, rows);
        }
        self.in_transaction = false;
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let mut state = self.state.lock().unwrap();
        if self.in_transaction {
            state.rollbacks += 1;
            self.in_transaction = false;
        }
        state.sessions_closed += 1;
        state.open_sessions -= 1;
    }
}

/// Write `content` to `dir/name` and return the path
pub fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub const VALID_CSV: &str = "customer_id,customer_zip_code_prefix,customer_city\n\
06b8999e2fba1a1fbc88172c00ba8bc7,14409,franca\n\
18955e83d337fd6b2def6b18a428ac77,09790,sao bernardo do campo\n";
