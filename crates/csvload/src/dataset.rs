//! In-memory CSV dataset
//!
//! Every field is kept as the raw text found in the file. No type inference
//! happens anywhere, so values such as zip codes with leading zeros or
//! mixed-format dates reach the database exactly as written.

use csvload_common::{LoadError, Result};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Rows of text cells under named columns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Build a dataset from parts. Rows are expected to have one cell per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Parse CSV text with a header row.
    ///
    /// - Input without any header is a parse error.
    /// - Blank header names become `Unnamed: <index>`.
    /// - Rows shorter than the header are padded with empty cells.
    /// - Rows longer than the header are a parse error.
    pub fn from_reader<R: Read>(input: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);

        let headers = reader.headers().map_err(LoadError::parse)?.clone();
        if headers.is_empty() {
            return Err(LoadError::parse("No columns to parse from file"));
        }

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                if name.trim().is_empty() {
                    format!("Unnamed: {}", idx)
                } else {
                    name.to_string()
                }
            })
            .collect();

        let width = columns.len();
        let mut rows = Vec::new();

        for result in reader.records() {
            let record = result.map_err(LoadError::parse)?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            if record.len() > width {
                return Err(LoadError::parse(format!(
                    "Expected {} fields in line {}, saw {}",
                    width,
                    line,
                    record.len()
                )));
            }

            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    /// Read and parse a whole file. A missing or unreadable file is a parse error.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| LoadError::parse(format!("{}: {}", path.display(), e)))?;
        let dataset = Self::from_reader(std::io::BufReader::new(file))?;

        debug!(
            path = %path.display(),
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "Parsed CSV file"
        );

        Ok(dataset)
    }

    /// [`Dataset::from_path`] on the blocking thread pool
    pub async fn read(path: &Path) -> Result<Self> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::from_path(&path))
            .await
            .map_err(|e| LoadError::transient(format!("CSV read task panicked: {}", e)))?
    }
}
