//! Submission folder discovery and matching.
//!
//! This module lists the submission folders of a grading workspace once
//! and resolves each student's GitHub username to a folder.

use crate::error::MatchError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What to do when several folders match the same username.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum AmbiguityPolicy {
    /// Take the first candidate in sorted order and log a warning.
    #[default]
    FirstMatch,
    /// Refuse to pick; the student is recorded as not available.
    Error,
}

/// Cached listing of the submission folders under a base directory.
#[derive(Debug, Clone)]
pub struct FolderIndex {
    base: PathBuf,
    folders: Vec<String>,
    policy: AmbiguityPolicy,
}

impl FolderIndex {
    /// List the immediate child directories of `base`.
    ///
    /// Symlinked directories count as submission folders. Hidden entries
    /// such as `.git` or `.ipynb_checkpoints` are never submissions and are
    /// skipped. Names are sorted, so lookups are independent of the
    /// platform's listing order.
    pub fn build(base: &Path, policy: AmbiguityPolicy) -> Result<Self, MatchError> {
        if !base.is_dir() {
            return Err(MatchError::Io {
                path: base.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let mut folders = Vec::new();
        for entry in WalkDir::new(base).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| MatchError::Io {
                path: base.to_path_buf(),
                reason: e.to_string(),
            })?;

            if !entry.path().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            folders.push(name);
        }

        folders.sort();
        debug!("Found {} submission folders in {}", folders.len(), base.display());

        Ok(Self::from_folders(base.to_path_buf(), folders, policy))
    }

    /// Build an index from an already known folder listing.
    pub fn from_folders(base: PathBuf, mut folders: Vec<String>, policy: AmbiguityPolicy) -> Self {
        folders.sort();
        Self {
            base,
            folders,
            policy,
        }
    }

    /// Base directory of the index.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Folder names in lookup order.
    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    /// Resolve a GitHub username to a submission folder name.
    ///
    /// Folders named `<assignment>-<username>` win over folders that merely
    /// contain the username somewhere in their name. The first tier compares
    /// case-insensitively, so `jdoe` resolves to `hw1-JDOE` even though it
    /// is not a literal substring of it. The substring fallback is
    /// case-sensitive.
    pub fn find(&self, secondary_id: &str) -> Result<&str, MatchError> {
        let exact = self.exact_candidates(secondary_id);
        let candidates = if exact.is_empty() {
            self.substring_candidates(secondary_id)
        } else {
            exact
        };

        match candidates.as_slice() {
            [] => Err(MatchError::NotFound {
                secondary_id: secondary_id.to_string(),
            }),
            [only] => Ok(*only),
            [first, ..] => match self.policy {
                AmbiguityPolicy::FirstMatch => {
                    warn!(
                        "{:?} matches {} folders, using {}",
                        secondary_id,
                        candidates.len(),
                        first
                    );
                    Ok(*first)
                }
                AmbiguityPolicy::Error => Err(MatchError::Ambiguous {
                    secondary_id: secondary_id.to_string(),
                    candidates: candidates.iter().map(|c| c.to_string()).collect(),
                }),
            },
        }
    }

    /// Folders whose name is the username or ends in `-<username>`.
    fn exact_candidates(&self, secondary_id: &str) -> Vec<&str> {
        if secondary_id.is_empty() {
            return Vec::new();
        }

        let key = secondary_id.to_lowercase();
        let suffix = format!("-{}", key);

        self.folders
            .iter()
            .filter(|name| {
                let name = name.to_lowercase();
                name == key || name.ends_with(&suffix)
            })
            .map(String::as_str)
            .collect()
    }

    fn substring_candidates(&self, secondary_id: &str) -> Vec<&str> {
        self.folders
            .iter()
            .filter(|name| name.contains(secondary_id))
            .map(String::as_str)
            .collect()
    }
}
