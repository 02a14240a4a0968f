//! Version control operations on student repositories.
//!
//! Git access goes through the [`VersionControl`] trait so the clone and
//! push workflows can run against a fake in tests.

pub mod git;
pub mod workflow;

pub use git::GitBackend;
pub use workflow::{clone_for_grading, commit_and_push, CloneSummary, PushSummary};

use crate::error::VcsError;
use std::path::Path;

/// Structured git operations used by the grading workflows.
pub trait VersionControl {
    /// Clone `url` into `dest`, which must not exist yet.
    fn clone_repository(&self, url: &str, dest: &Path) -> Result<(), VcsError>;

    /// Create `branch` from HEAD (or reuse it) and check it out.
    fn create_branch(&self, repo: &Path, branch: &str) -> Result<(), VcsError>;

    /// Stage every change, deletions included, and commit.
    ///
    /// Returns `false` when the working tree had nothing to commit.
    fn commit_all(&self, repo: &Path, message: &str) -> Result<bool, VcsError>;

    /// Push `branch` to `origin`.
    fn push(&self, repo: &Path, branch: &str) -> Result<(), VcsError>;

    /// Fetch `branch` from `origin` and merge it into the current branch.
    fn pull(&self, repo: &Path, branch: &str) -> Result<(), VcsError>;

    /// Whether `path` is the root of a git repository.
    fn is_repository(&self, path: &Path) -> bool;
}
