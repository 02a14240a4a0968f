//! Roster file loading.
//!
//! The roster maps each student's institutional id to their GitHub
//! username, one `primary_id,secondary_id` pair per line.

use crate::error::RosterError;
use crate::models::RosterEntry;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default roster file name inside the submissions directory.
pub const DEFAULT_ROSTER_FILE: &str = "students.csv";

/// Load the roster from a file, preserving file order.
pub fn load_roster(path: &Path) -> Result<Vec<RosterEntry>, RosterError> {
    info!("Loading students from {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| RosterError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let entries = parse_roster(&content)?;
    debug!("Loaded {} roster entries", entries.len());
    Ok(entries)
}

/// Parse roster content. Empty lines are skipped; any other line must
/// carry at least two comma-separated fields.
pub fn parse_roster(content: &str) -> Result<Vec<RosterEntry>, RosterError> {
    let mut entries = Vec::new();

    for (index, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split(',');
        let (primary, secondary) = match (fields.next(), fields.next()) {
            (Some(primary), Some(secondary)) => (primary.trim(), secondary.trim()),
            _ => {
                return Err(RosterError::MalformedLine {
                    line_number: index + 1,
                    content: line.to_string(),
                })
            }
        };

        if secondary.is_empty() {
            warn!(
                "Roster line {} has an empty GitHub username for {:?}",
                index + 1,
                primary
            );
        }

        entries.push(RosterEntry::new(primary, secondary));
    }

    Ok(entries)
}
