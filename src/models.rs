//! Data models for the grading workflow.
//!
//! This module contains the core data structures shared by the roster
//! loader, the aggregator, the exporter and the forge client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel written for students whose submission could not be located.
pub const NOT_AVAILABLE: &str = "NA";

/// One student from the roster file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Institutional identifier, authoritative for grade reporting.
    pub primary_id: String,
    /// Forge username, used only to locate the submission folder.
    pub secondary_id: String,
}

impl RosterEntry {
    pub fn new(primary_id: impl Into<String>, secondary_id: impl Into<String>) -> Self {
        Self {
            primary_id: primary_id.into(),
            secondary_id: secondary_id.into(),
        }
    }
}

/// A student's score, or the not-available sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeValue {
    Score(i64),
    NotAvailable,
}

impl GradeValue {
    /// Returns the numeric score, if any.
    pub fn score(&self) -> Option<i64> {
        match self {
            GradeValue::Score(score) => Some(*score),
            GradeValue::NotAvailable => None,
        }
    }
}

impl fmt::Display for GradeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeValue::Score(score) => write!(f, "{}", score),
            GradeValue::NotAvailable => write!(f, "{}", NOT_AVAILABLE),
        }
    }
}

impl Serialize for GradeValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GradeValue::Score(score) => serializer.serialize_i64(*score),
            GradeValue::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

/// The grade collected for a single roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeRecord {
    pub primary_id: String,
    pub score: GradeValue,
}

impl GradeRecord {
    pub fn new(primary_id: impl Into<String>, score: GradeValue) -> Self {
        Self {
            primary_id: primary_id.into(),
            score,
        }
    }
}

/// Summary statistics over a batch of grade records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GradeSummary {
    /// Total number of students.
    pub students: usize,
    /// Students with a numeric score.
    pub graded: usize,
    /// Students recorded as not available.
    pub not_available: usize,
    /// Mean of the numeric scores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

impl GradeSummary {
    /// Creates a summary from a list of records.
    pub fn from_records(records: &[GradeRecord]) -> Self {
        let scores: Vec<i64> = records.iter().filter_map(|r| r.score.score()).collect();

        let mean = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64)
        };

        Self {
            students: records.len(),
            graded: scores.len(),
            not_available: records.len() - scores.len(),
            mean,
            min: scores.iter().copied().min(),
            max: scores.iter().copied().max(),
        }
    }
}

/// Metadata about an export run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportMetadata {
    /// Roster file the students were read from.
    pub roster_path: String,
    /// Directory holding the submission folders.
    pub submissions_dir: String,
    /// When the export was produced.
    pub generated_at: DateTime<Utc>,
}

/// The complete export, used for the JSON output format.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub metadata: ExportMetadata,
    pub summary: GradeSummary,
    pub grades: Vec<GradeRecord>,
}

/// A repository listed by the forge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeRepository {
    pub name: String,
    pub full_name: String,
    pub clone_url: String,
}

impl ForgeRepository {
    /// Folder name the repository clones into: last URL segment without `.git`.
    pub fn folder_name(&self) -> String {
        let last = self
            .clone_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.name);
        last.strip_suffix(".git").unwrap_or(last).to_string()
    }
}
