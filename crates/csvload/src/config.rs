//! Load configuration
//!
//! Everything a run needs is carried in [`LoadConfig`], built once at startup
//! and handed to the orchestrator. Database credentials come from the
//! environment (`DB_HOST`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`) and are
//! checked before any file is touched.

use csvload_common::{LoadError, LoadTask, Result, WritePolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Default directory holding the source CSV files.
pub const DEFAULT_SOURCE_DIR: &str = "data/data-1";

/// Default size of the worker pool.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Default number of attempts per file.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pause between attempts, in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 2.0;

/// Default PostgreSQL port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default connection timeout in seconds.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Files loaded when none are given: the Olist e-commerce dataset.
pub const DEFAULT_FILES: &[&str] = &[
    "olist_customers_dataset.csv",
    "olist_geolocation_dataset.csv",
    "olist_order_items_dataset.csv",
    "olist_order_payments_dataset.csv",
    "olist_order_reviews_dataset.csv",
    "olist_orders_dataset.csv",
    "olist_products_dataset.csv",
    "olist_sellers_dataset.csv",
    "product_category_name_translation.csv",
];

// ============================================================================
// Database Settings
// ============================================================================

/// Raw connection settings as found in the environment
#[derive(Clone, Default)]
pub struct DatabaseSettings {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub connect_timeout_secs: u64,
}

/// Connection settings with every required value present
#[derive(Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub connect_timeout: Duration,
}

impl DatabaseSettings {
    /// Read `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME` and
    /// `DB_CONNECT_TIMEOUT`. Empty values count as missing.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("DB_HOST"),
            port: std::env::var("DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DB_PORT),
            user: non_empty("DB_USER"),
            password: non_empty("DB_PASSWORD"),
            name: non_empty("DB_NAME"),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DB_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Names of the required variables that are not set
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("DB_HOST", &self.host),
            ("DB_USER", &self.user),
            ("DB_PASSWORD", &self.password),
            ("DB_NAME", &self.name),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| key)
        .collect()
    }

    /// Resolve into connection parameters, reporting every missing variable at once
    pub fn validate(&self) -> Result<ConnectionParams> {
        match (&self.host, &self.user, &self.password, &self.name) {
            (Some(host), Some(user), Some(password), Some(database)) => Ok(ConnectionParams {
                host: host.clone(),
                port: self.port,
                user: user.clone(),
                password: password.clone(),
                database: database.clone(),
                connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            }),
            _ => Err(LoadError::config(format!(
                "Database credentials are not fully set in environment variables (missing {})",
                self.missing().join(", ")
            ))),
        }
    }
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("name", &self.name)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

// ============================================================================
// Load Configuration
// ============================================================================

/// Configuration for one load run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Directory holding the source files
    pub source_dir: PathBuf,
    /// File names to load, in submission order
    pub files: Vec<String>,
    /// Behaviour when a destination table already exists
    pub write_policy: WritePolicy,
    /// Number of files loaded concurrently
    pub max_workers: usize,
    /// Attempts per file, including the first
    pub max_retries: u32,
    /// Fixed pause between attempts
    pub retry_delay_secs: f64,
    #[serde(skip)]
    pub database: DatabaseSettings,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from(DEFAULT_SOURCE_DIR),
            files: DEFAULT_FILES.iter().map(|f| f.to_string()).collect(),
            write_policy: WritePolicy::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            database: DatabaseSettings {
                port: DEFAULT_DB_PORT,
                connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
                ..DatabaseSettings::default()
            },
        }
    }
}

impl LoadConfig {
    /// Check the run parameters (not the database settings)
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(LoadError::config("max_workers must be greater than 0"));
        }
        if self.max_retries == 0 {
            return Err(LoadError::config("max_retries must be greater than 0"));
        }
        if !self.retry_delay_secs.is_finite() || self.retry_delay_secs < 0.0 {
            return Err(LoadError::config(format!(
                "retry delay must be a non-negative number of seconds, got {}",
                self.retry_delay_secs
            )));
        }
        Ok(())
    }

    /// Pause between attempts as a Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_delay_secs).unwrap_or(Duration::ZERO)
    }

    /// One task per configured file, in configuration order
    pub fn tasks(&self) -> Vec<LoadTask> {
        self.files
            .iter()
            .map(|file| LoadTask::from_file_name(&self.source_dir, file))
            .collect()
    }
}
