//! Grade roster export.

pub mod generator;

pub use generator::*;

use serde::{Deserialize, Serialize};

/// Output format for the exported grade roster.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// `primary_id,score` rows without a header (default)
    #[default]
    Csv,
    /// JSON document with metadata and summary
    Json,
}
