//! Total score extraction from grade files.

use crate::error::GradeError;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, error, warn};

/// Label of the machine-readable grade line.
pub const GRADE_LABEL: &str = "Total Grade";

/// Find the first `Total Grade` line and parse the integer after its colon.
pub fn parse_grade(content: &str) -> Result<i64, GradeError> {
    let line = content
        .lines()
        .find(|line| line.contains(GRADE_LABEL))
        .ok_or(GradeError::NoGradeLabel)?;

    let value = line
        .split(':')
        .nth(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(GradeError::MissingValue)?;

    value
        .parse::<i64>()
        .map_err(|_| GradeError::NotAnInteger(value.to_string()))
}

/// Read a grade file and parse its total score.
pub fn read_grade(path: &Path) -> Result<i64, GradeError> {
    let bytes = fs::read(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            GradeError::MissingGradeFile(path.to_path_buf())
        } else {
            GradeError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_grade(&String::from_utf8_lossy(&bytes))
}

/// Read a grade file, falling back to `0` on any failure.
///
/// A missing label is logged as a warning, every other failure as an error.
pub fn extract_score(path: &Path) -> i64 {
    debug!("Loading grade from {}", path.display());

    match read_grade(path) {
        Ok(score) => score,
        Err(GradeError::NoGradeLabel) => {
            warn!("No `{}` line in {}, recording 0", GRADE_LABEL, path.display());
            0
        }
        Err(e) => {
            error!("{} ({}), recording 0", e, path.display());
            0
        }
    }
}
