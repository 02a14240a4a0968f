//! Grade roster generation.
//!
//! This module renders collected grade records as CSV rows or as a JSON
//! document, and writes them to the destination file.

use super::ExportFormat;
use crate::models::{ExportReport, GradeRecord};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

const LINE_TERMINATOR: &str = "\r\n";

/// Render one `primary_id,score` row per record, in record order.
pub fn generate_csv(records: &[GradeRecord]) -> String {
    let mut output = String::new();

    for record in records {
        output.push_str(&escape_field(&record.primary_id));
        output.push(',');
        output.push_str(&escape_field(&record.score.to_string()));
        output.push_str(LINE_TERMINATOR);
    }

    output
}

/// Quote a field only when it contains a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render the full export as pretty-printed JSON.
pub fn generate_json(report: &ExportReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize grade export")
}

/// Render the export in the requested format and write it, replacing any
/// existing file at `path`.
pub fn write_export(path: &Path, report: &ExportReport, format: ExportFormat) -> Result<()> {
    info!("Writing grades to {}", path.display());

    let output = match format {
        ExportFormat::Csv => generate_csv(&report.grades),
        ExportFormat::Json => generate_json(report)?,
    };

    std::fs::write(path, output)
        .with_context(|| format!("Failed to write grades to {}", path.display()))
}
