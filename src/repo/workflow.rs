//! Clone-for-grading and commit-and-push workflows.
//!
//! Both workflows process repositories one at a time. A failure on one
//! repository is logged and recorded, and the batch moves on.

use super::VersionControl;
use crate::grading::seed_grade_file;
use crate::models::ForgeRepository;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Outcome of a clone batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneSummary {
    /// Folders cloned and seeded with the grading template.
    pub cloned: Vec<String>,
    /// Folders left untouched because they already existed.
    pub skipped: Vec<String>,
    /// Folders that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Outcome of a push batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushSummary {
    pub pushed: Vec<String>,
    /// Subdirectories that are not git repositories.
    pub skipped: Vec<String>,
    /// Folders that still failed after a pull; these need manual attention.
    pub failed: Vec<(String, String)>,
}

/// Clone each repository into `workspace`, check out the grading branch
/// and seed the grade file.
pub fn clone_for_grading(
    vcs: &dyn VersionControl,
    repos: &[ForgeRepository],
    workspace: &Path,
    branch: &str,
    grade_file_name: &str,
    template: &str,
) -> Result<CloneSummary> {
    fs::create_dir_all(workspace)
        .with_context(|| format!("Failed to create workspace {}", workspace.display()))?;

    let mut summary = CloneSummary::default();

    for repo in repos {
        let folder = repo.folder_name();
        let dest = workspace.join(&folder);

        if dest.exists() {
            warn!("{} already exists, skipping {}", dest.display(), repo.full_name);
            summary.skipped.push(folder);
            continue;
        }

        let result = vcs
            .clone_repository(&repo.clone_url, &dest)
            .and_then(|_| vcs.create_branch(&dest, branch))
            .map_err(anyhow::Error::from)
            .and_then(|_| seed_grade_file(&dest, grade_file_name, template));

        match result {
            Ok(_) => {
                info!("Successfully cloned {}", repo.full_name);
                summary.cloned.push(folder);
            }
            Err(e) => {
                error!("Failed to set up {}: {:#}", repo.full_name, e);
                summary.failed.push((folder, format!("{:#}", e)));
            }
        }
    }

    Ok(summary)
}

/// Commit and push every repository directly under `workspace`.
///
/// A rejected push is retried once after pulling the remote branch.
pub fn commit_and_push(
    vcs: &dyn VersionControl,
    workspace: &Path,
    message: &str,
    branch: &str,
) -> Result<PushSummary> {
    let mut folders: Vec<String> = fs::read_dir(workspace)
        .with_context(|| format!("Failed to read workspace {}", workspace.display()))?
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| !name.starts_with('.'))
        .collect();
    folders.sort();

    let mut summary = PushSummary::default();

    for folder in folders {
        let path = workspace.join(&folder);

        if !vcs.is_repository(&path) {
            warn!("{} is not a git repository, skipping", path.display());
            summary.skipped.push(folder);
            continue;
        }

        match push_one(vcs, &path, message, branch) {
            Ok(()) => {
                info!("Successfully pushed {}", folder);
                summary.pushed.push(folder);
            }
            Err(reason) => {
                error!("{}: {}. You will need to fix it manually", folder, reason);
                summary.failed.push((folder, reason));
            }
        }
    }

    Ok(summary)
}

fn push_one(vcs: &dyn VersionControl, path: &Path, message: &str, branch: &str) -> Result<(), String> {
    vcs.commit_all(path, message).map_err(|e| e.to_string())?;

    if let Err(e) = vcs.push(path, branch) {
        warn!("Push of {} failed ({}), pulling first", path.display(), e);
        vcs.pull(path, branch)
            .map_err(|e| format!("pull failed: {}", e))?;
        vcs.push(path, branch)
            .map_err(|e| format!("push after pull failed: {}", e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VcsError;
    use crate::grading::extractor::parse_grade;
    use crate::grading::DEFAULT_GRADE_FILE;
    use crate::grading::template::DEFAULT_TEMPLATE;
    use crate::repo::git::tests::make_origin;
    use crate::repo::GitBackend;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::path::PathBuf;

    /// Records calls and fails on demand.
    #[derive(Default)]
    struct FakeVcs {
        calls: RefCell<Vec<String>>,
        failing_clones: HashSet<String>,
        rejected_pushes: RefCell<HashSet<PathBuf>>,
        broken_pulls: HashSet<PathBuf>,
    }

    impl FakeVcs {
        fn log(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }
    }

    impl VersionControl for FakeVcs {
        fn clone_repository(&self, url: &str, dest: &Path) -> Result<(), VcsError> {
            self.log(format!("clone {}", url));
            if self.failing_clones.contains(url) {
                return Err(VcsError::NotARepository(dest.to_path_buf()));
            }
            fs::create_dir_all(dest.join(".git"))?;
            Ok(())
        }

        fn create_branch(&self, repo: &Path, branch: &str) -> Result<(), VcsError> {
            self.log(format!("branch {} {}", repo.display(), branch));
            Ok(())
        }

        fn commit_all(&self, repo: &Path, _message: &str) -> Result<bool, VcsError> {
            self.log(format!("commit {}", repo.display()));
            Ok(true)
        }

        fn push(&self, repo: &Path, branch: &str) -> Result<(), VcsError> {
            self.log(format!("push {}", repo.display()));
            if self.rejected_pushes.borrow_mut().remove(repo) {
                return Err(VcsError::PushRejected {
                    branch: branch.to_string(),
                    reason: "non-fast-forward".to_string(),
                });
            }
            Ok(())
        }

        fn pull(&self, repo: &Path, branch: &str) -> Result<(), VcsError> {
            self.log(format!("pull {}", repo.display()));
            if self.broken_pulls.contains(repo) {
                return Err(VcsError::MergeConflict {
                    branch: branch.to_string(),
                    path: repo.to_path_buf(),
                });
            }
            Ok(())
        }

        fn is_repository(&self, path: &Path) -> bool {
            path.join(".git").exists()
        }
    }

    fn forge_repo(name: &str) -> ForgeRepository {
        ForgeRepository {
            name: name.to_string(),
            full_name: format!("ist256/{}", name),
            clone_url: format!("https://github.com/ist256/{}.git", name),
        }
    }

    #[test]
    fn test_clone_for_grading_seeds_template() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("ist256");
        fs::create_dir_all(workspace.join("lesson1-old")).unwrap();

        let mut vcs = FakeVcs::default();
        vcs.failing_clones
            .insert("https://github.com/ist256/lesson1-broken.git".to_string());

        let repos = vec![
            forge_repo("lesson1-jdoe"),
            forge_repo("lesson1-old"),
            forge_repo("lesson1-broken"),
        ];
        let summary = clone_for_grading(
            &vcs,
            &repos,
            &workspace,
            "graded",
            DEFAULT_GRADE_FILE,
            DEFAULT_TEMPLATE,
        )
        .unwrap();

        assert_eq!(summary.cloned, vec!["lesson1-jdoe"]);
        assert_eq!(summary.skipped, vec!["lesson1-old"]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "lesson1-broken");

        let seeded = fs::read_to_string(workspace.join("lesson1-jdoe").join(DEFAULT_GRADE_FILE))
            .unwrap();
        assert_eq!(seeded, DEFAULT_TEMPLATE);
        assert!(!workspace.join("lesson1-broken").join(DEFAULT_GRADE_FILE).exists());
    }

    #[test]
    fn test_commit_and_push_retries_after_pull() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path();
        for name in ["a-ok", "b-behind", "c-conflict"] {
            fs::create_dir_all(workspace.join(name).join(".git")).unwrap();
        }
        fs::create_dir_all(workspace.join("notes")).unwrap();

        let mut vcs = FakeVcs::default();
        vcs.rejected_pushes
            .borrow_mut()
            .extend([workspace.join("b-behind"), workspace.join("c-conflict")]);
        vcs.broken_pulls.insert(workspace.join("c-conflict"));

        let summary = commit_and_push(&vcs, workspace, "Graded", "graded").unwrap();

        assert_eq!(summary.pushed, vec!["a-ok", "b-behind"]);
        assert_eq!(summary.skipped, vec!["notes"]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "c-conflict");
        assert!(summary.failed[0].1.contains("pull failed"));

        let calls = vcs.calls.borrow();
        let behind = workspace.join("b-behind");
        let behind_calls: Vec<_> = calls
            .iter()
            .filter(|c| c.ends_with(&behind.display().to_string()))
            .map(|c| c.split(' ').next().unwrap())
            .collect();
        assert_eq!(behind_calls, vec!["commit", "push", "pull", "push"]);
    }

    #[test]
    fn test_clone_grade_and_push_with_git() {
        let dir = tempfile::tempdir().unwrap();
        let (bare_path, url) = make_origin(dir.path(), "lesson1-jdoe-gh");
        let workspace = dir.path().join("ist256");

        let repo = ForgeRepository {
            name: "lesson1-jdoe-gh".to_string(),
            full_name: "ist256/lesson1-jdoe-gh".to_string(),
            clone_url: url,
        };
        let git = GitBackend::new(None, false);

        let cloned = clone_for_grading(
            &git,
            &[repo],
            &workspace,
            "graded",
            DEFAULT_GRADE_FILE,
            DEFAULT_TEMPLATE,
        )
        .unwrap();
        assert_eq!(cloned.cloned, vec!["lesson1-jdoe-gh"]);

        let grade_path = workspace.join("lesson1-jdoe-gh").join(DEFAULT_GRADE_FILE);
        let graded = DEFAULT_TEMPLATE.replacen("Total Grade: ", "Total Grade: 95", 1);
        fs::write(&grade_path, graded).unwrap();

        let pushed = commit_and_push(&git, &workspace, "Graded lesson 1", "graded").unwrap();
        assert_eq!(pushed.pushed, vec!["lesson1-jdoe-gh"]);

        let bare = git2::Repository::open_bare(&bare_path).unwrap();
        let tip = bare
            .find_branch("graded", git2::BranchType::Local)
            .unwrap()
            .get()
            .peel_to_commit()
            .unwrap();
        let blob = tip
            .tree()
            .unwrap()
            .get_path(Path::new(DEFAULT_GRADE_FILE))
            .unwrap()
            .to_object(&bare)
            .unwrap()
            .peel_to_blob()
            .unwrap();
        let content = String::from_utf8_lossy(blob.content()).to_string();
        assert_eq!(parse_grade(&content).unwrap(), 95);
    }
}
