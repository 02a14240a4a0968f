//! Error taxonomies for each stage of the grading workflow.
//!
//! Roster errors are fatal for an export run. Folder match and grade
//! errors are recorded per student and the batch continues.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading the roster file.
#[derive(Debug, Error)]
pub enum RosterError {
    /// The roster file could not be read.
    #[error("failed to read roster {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A non-blank line did not contain two comma-separated fields.
    #[error("malformed roster line {line_number}: {content:?} (expected `primary_id,secondary_id`)")]
    MalformedLine { line_number: usize, content: String },
}

/// Errors produced while resolving a submission folder.
#[derive(Debug, Error)]
pub enum MatchError {
    /// No folder name contains the secondary identifier.
    #[error("no submission folder matches {secondary_id:?}")]
    NotFound { secondary_id: String },

    /// More than one folder matches and the policy forbids guessing.
    #[error("{secondary_id:?} matches several submission folders: {candidates:?}")]
    Ambiguous {
        secondary_id: String,
        candidates: Vec<String>,
    },

    /// The submissions directory could not be listed.
    #[error("failed to list submissions in {path}: {reason}")]
    Io { path: PathBuf, reason: String },
}

/// Errors produced while extracting a score from a grade file.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error("grade file not found: {0}")]
    MissingGradeFile(PathBuf),

    #[error("failed to read grade file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The label line exists but carries no value after the colon.
    #[error("no grade found on the `Total Grade` line")]
    MissingValue,

    #[error("grade {0:?} isn't an integer")]
    NotAnInteger(String),

    /// No line mentions the label at all.
    #[error("no `Total Grade` line found")]
    NoGradeLabel,
}

/// Errors returned by the GitHub REST API client.
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("authentication rejected by {url} (HTTP {status})")]
    Authentication { url: String, status: u16 },

    #[error("unknown organization: {0}")]
    UnknownOrganization(String),

    #[error("GitHub API request to {url} failed with HTTP {status}: {body}")]
    Api {
        url: String,
        status: u16,
        body: String,
    },

    #[error("GitHub API transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors returned by the version-control collaborator.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("repository has no commits to branch from: {0}")]
    EmptyRepository(PathBuf),

    #[error("push of {branch} rejected: {reason}")]
    PushRejected { branch: String, reason: String },

    #[error("merge of origin/{branch} produced conflicts in {path}")]
    MergeConflict { branch: String, path: PathBuf },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
