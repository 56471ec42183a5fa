//! Destination database interface
//!
//! A [`Destination`] hands out one [`DestinationSession`] per load attempt.
//! Sessions are never shared or reused: the loader opens one, runs a single
//! transaction on it, and closes it whatever the attempt's result.

pub mod postgres;

use async_trait::async_trait;
use csvload_common::{Result, WritePolicy};

use crate::dataset::Dataset;

pub use postgres::PostgresDestination;

/// Source of fresh database sessions
#[async_trait]
pub trait Destination: Send + Sync {
    /// Open a new connection owned by the caller
    async fn connect(&self) -> Result<Box<dyn DestinationSession>>;
}

/// A single connection with at most one open transaction
#[async_trait]
pub trait DestinationSession: Send {
    /// Start the transaction the rest of the attempt runs in
    async fn begin(&mut self) -> Result<()>;

    /// Write every row of `dataset` into `table` according to `policy`.
    ///
    /// Returns the number of rows inserted.
    async fn write_table(&mut self, table: &str, dataset: &Dataset, policy: WritePolicy)
        -> Result<u64>;

    /// Commit the open transaction
    async fn commit(&mut self) -> Result<()>;

    /// Roll back any open transaction and release the connection.
    ///
    /// Must be safe to call on every exit path, including after a failed
    /// `begin` or `commit`.
    async fn close(&mut self);
}
