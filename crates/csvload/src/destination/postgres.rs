//! PostgreSQL destination
//!
//! Each session owns a private single-connection pool that is opened for
//! one attempt and closed at the end of it, so no connection ever outlives
//! the attempt that created it. All columns are created as `TEXT` and empty
//! cells are stored as NULL.

use async_trait::async_trait;
use csvload_common::{LoadError, Result, WritePolicy};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder, Transaction};
use std::time::Duration;
use tracing::{debug, warn};

use super::{Destination, DestinationSession};
use crate::config::{ConnectionParams, DatabaseSettings};
use crate::dataset::Dataset;

/// PostgreSQL caps bind parameters per statement at 65535
const MAX_BIND_PARAMS: usize = 65_535;

/// Upper bound on rows per INSERT statement
const MAX_ROWS_PER_INSERT: usize = 1_000;

/// Connects to PostgreSQL with fixed connection parameters
#[derive(Debug, Clone)]
pub struct PostgresDestination {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PostgresDestination {
    pub fn new(params: &ConnectionParams) -> Self {
        let options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .username(&params.user)
            .password(&params.password)
            .database(&params.database);

        Self {
            options,
            connect_timeout: params.connect_timeout,
        }
    }

    /// Fails with a configuration error when a required setting is missing
    pub fn from_settings(settings: &DatabaseSettings) -> Result<Self> {
        let params = settings.validate()?;
        Ok(Self::new(&params))
    }
}

#[async_trait]
impl Destination for PostgresDestination {
    async fn connect(&self) -> Result<Box<dyn DestinationSession>> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .acquire_timeout(self.connect_timeout)
            .connect_with(self.options.clone())
            .await
            .map_err(LoadError::transient)?;

        debug!("Opened database connection");

        Ok(Box::new(PgSession { pool, tx: None }))
    }
}

struct PgSession {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSession {
    fn transaction(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| LoadError::transient("No open transaction"))
    }
}

#[async_trait]
impl DestinationSession for PgSession {
    async fn begin(&mut self) -> Result<()> {
        if self.tx.is_some() {
            return Err(LoadError::transient("Transaction already open"));
        }
        let tx = self.pool.begin().await.map_err(LoadError::transient)?;
        self.tx = Some(tx);
        Ok(())
    }

    async fn write_table(
        &mut self,
        table: &str,
        dataset: &Dataset,
        policy: WritePolicy,
    ) -> Result<u64> {
        let tx = self.transaction()?;
        let table_ident = quote_ident(table);

        match policy {
            WritePolicy::Replace => {
                execute(tx, &format!("DROP TABLE IF EXISTS {}", table_ident)).await?;
                execute(tx, &create_table_sql(&table_ident, dataset.columns(), false)).await?;
            },
            WritePolicy::Append => {
                execute(tx, &create_table_sql(&table_ident, dataset.columns(), true)).await?;
            },
            WritePolicy::Fail => {
                if table_exists(tx, table).await? {
                    return Err(LoadError::transient(format!("Table '{}' already exists.", table)));
                }
                execute(tx, &create_table_sql(&table_ident, dataset.columns(), false)).await?;
            },
        }

        let column_list = dataset
            .columns()
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let batch_rows = rows_per_insert(dataset.column_count());
        let mut inserted = 0u64;

        for chunk in dataset.rows().chunks(batch_rows) {
            let mut query_builder: QueryBuilder<Postgres> =
                QueryBuilder::new(format!("INSERT INTO {} ({}) ", table_ident, column_list));

            query_builder.push_values(chunk, |mut b, row| {
                for cell in row {
                    b.push_bind(null_if_empty(cell));
                }
            });

            let result = query_builder
                .build()
                .execute(&mut **tx)
                .await
                .map_err(LoadError::transient)?;
            inserted += result.rows_affected();
        }

        debug!(table, rows = inserted, policy = %policy, "Rows written");
        Ok(inserted)
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| LoadError::transient("No open transaction to commit"))?;
        tx.commit().await.map_err(LoadError::transient)
    }

    async fn close(&mut self) {
        if let Some(tx) = self.tx.take() {
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "Rollback failed while closing connection");
            }
        }
        self.pool.close().await;
        debug!("Closed database connection");
    }
}

async fn execute(tx: &mut Transaction<'static, Postgres>, sql: &str) -> Result<()> {
    sqlx::query(sql)
        .execute(&mut **tx)
        .await
        .map_err(LoadError::transient)?;
    Ok(())
}

async fn table_exists(tx: &mut Transaction<'static, Postgres>, table: &str) -> Result<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = current_schema()
              AND table_name = $1
        )
        "#,
    )
    .bind(table)
    .fetch_one(&mut **tx)
    .await
    .map_err(LoadError::transient)
}

/// Double-quote an identifier, escaping embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE` with one TEXT column per dataset column
pub fn create_table_sql(table_ident: &str, columns: &[String], if_not_exists: bool) -> String {
    let column_defs = columns
        .iter()
        .map(|c| format!("{} TEXT", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE {}{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        table_ident,
        column_defs
    )
}

/// Rows per INSERT so that rows * columns stays within the bind limit
pub fn rows_per_insert(column_count: usize) -> usize {
    (MAX_BIND_PARAMS / column_count.max(1)).clamp(1, MAX_ROWS_PER_INSERT)
}

fn null_if_empty(cell: &str) -> Option<&str> {
    (!cell.is_empty()).then_some(cell)
}
