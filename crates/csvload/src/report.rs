//! Run summary
//!
//! Purely presentational: the summary goes to the log, nothing downstream
//! consumes it.

use csvload_common::RunReport;
use tracing::info;

/// Render the summary as individual lines
pub fn summary_lines(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.total() + 4);

    lines.push("===== Data Load Summary =====".to_string());

    lines.push(format!("Successful files ({}):", report.successful.len()));
    for path in &report.successful {
        lines.push(format!("  - {}", path.display()));
    }

    lines.push(format!("Failed files ({}):", report.failed.len()));
    for failed in &report.failed {
        lines.push(format!(
            "  - {}: {}",
            failed.source_path.display(),
            failed.error_message
        ));
    }

    lines.push("=============================".to_string());
    lines
}

/// Log the summary of `report`
pub fn report(report: &RunReport) {
    for line in summary_lines(report) {
        info!("{}", line);
    }
}
