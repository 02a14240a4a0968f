//! Grade aggregation.
//!
//! This module resolves every roster entry to its submission folder and
//! collects one grade record per student, in roster order.

use crate::grading::extract_score;
use crate::models::{GradeRecord, GradeValue, RosterEntry};
use crate::scanner::FolderIndex;
use tracing::{error, info};

/// Collect a grade for each roster entry.
///
/// Students without a resolvable folder are recorded as not available.
/// Students whose grade file is missing or malformed are recorded as `0`.
pub fn aggregate_grades(
    roster: &[RosterEntry],
    index: &FolderIndex,
    grade_file_name: &str,
) -> Vec<GradeRecord> {
    let total = roster.len();

    roster
        .iter()
        .enumerate()
        .map(|(i, student)| {
            info!("Grading {} ({}/{})", student.primary_id, i + 1, total);
            GradeRecord::new(
                student.primary_id.clone(),
                grade_student(student, index, grade_file_name),
            )
        })
        .collect()
}

fn grade_student(student: &RosterEntry, index: &FolderIndex, grade_file_name: &str) -> GradeValue {
    match index.find(&student.secondary_id) {
        Ok(folder) => {
            let path = index.base().join(folder).join(grade_file_name);
            GradeValue::Score(extract_score(&path))
        }
        Err(e) => {
            error!("Could not grade {}: {}", student.primary_id, e);
            GradeValue::NotAvailable
        }
    }
}

/// Primary ids of the students recorded as not available.
pub fn missing_students(records: &[GradeRecord]) -> Vec<&str> {
    records
        .iter()
        .filter(|r| r.score == GradeValue::NotAvailable)
        .map(|r| r.primary_id.as_str())
        .collect()
}
