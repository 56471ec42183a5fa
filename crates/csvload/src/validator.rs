//! Structural checks run on a dataset before it is written
//!
//! Validation is advisory: problems are logged and reported through a
//! boolean rather than returned as errors. The loader turns a `false` into
//! a non-retryable failed outcome.

use std::collections::HashSet;
use tracing::{error, warn};

use crate::dataset::Dataset;

/// First rule a dataset breaks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NoRows,
    DuplicateColumns(Vec<String>),
    NoColumns,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::NoRows => write!(f, "is empty"),
            Violation::DuplicateColumns(names) => {
                write!(f, "contains duplicate columns: {}", names.join(", "))
            },
            Violation::NoColumns => write!(f, "has no columns"),
        }
    }
}

/// Check the failing rules in order and return the first one broken.
///
/// Rules: at least one row, unique column names, at least one column.
pub fn find_violation(dataset: &Dataset) -> Option<Violation> {
    if dataset.row_count() == 0 {
        return Some(Violation::NoRows);
    }

    let mut seen = HashSet::new();
    let mut duplicates: Vec<String> = Vec::new();
    for name in dataset.columns() {
        if !seen.insert(name.as_str()) && !duplicates.contains(name) {
            duplicates.push(name.clone());
        }
    }
    if !duplicates.is_empty() {
        return Some(Violation::DuplicateColumns(duplicates));
    }

    if dataset.column_count() == 0 {
        return Some(Violation::NoColumns);
    }

    None
}

/// Number of rows whose cells are all empty
pub fn count_blank_rows(dataset: &Dataset) -> usize {
    dataset
        .rows()
        .iter()
        .filter(|row| row.iter().all(|cell| cell.is_empty()))
        .count()
}

/// Validate `dataset` read from `source`, logging diagnostics.
///
/// Returns false when the dataset has no rows, duplicate column names or no
/// columns. Completely blank rows only produce a warning.
pub fn validate(dataset: &Dataset, source: &str) -> bool {
    if let Some(violation) = find_violation(dataset) {
        error!(source, "CSV file '{}' {}", source, violation);
        return false;
    }

    let blank_rows = count_blank_rows(dataset);
    if blank_rows > 0 {
        warn!(
            source,
            blank_rows, "CSV file '{}' contains completely empty rows", source
        );
    }

    true
}
