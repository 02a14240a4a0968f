//! git2-backed implementation of [`VersionControl`].
//!
//! This module clones student repositories, manages the grading branch
//! and pushes graded work back using the git2 library.

use super::VersionControl;
use crate::error::VcsError;
use crate::forge::Credentials;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    BranchType, Cred, ErrorCode, FetchOptions, IndexAddOption, Progress, PushOptions,
    RemoteCallbacks, Repository, Signature,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::path::Path;
use tracing::{debug, info};

const FALLBACK_NAME: &str = "classgrader";
const FALLBACK_EMAIL: &str = "classgrader@localhost";

/// Git operations over libgit2.
#[derive(Debug, Clone, Default)]
pub struct GitBackend {
    credentials: Option<Credentials>,
    show_progress: bool,
}

impl GitBackend {
    /// Create a backend. Without credentials only anonymous transports work.
    pub fn new(credentials: Option<Credentials>, show_progress: bool) -> Self {
        Self {
            credentials,
            show_progress,
        }
    }

    fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();

        if let Some(ref credentials) = self.credentials {
            callbacks.credentials(move |_url, _username_from_url, _allowed| {
                let (username, password) = credentials.git_userpass();
                Cred::userpass_plaintext(username, password)
            });
        }

        callbacks
    }

    fn open(&self, path: &Path) -> Result<Repository, VcsError> {
        Repository::open(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                VcsError::NotARepository(path.to_path_buf())
            } else {
                VcsError::Git(e)
            }
        })
    }
}

/// Committer identity from git config, or a fixed fallback.
fn signature(repo: &Repository) -> Result<Signature<'static>, VcsError> {
    match repo.signature() {
        Ok(sig) => Ok(sig.to_owned()),
        Err(e) => {
            debug!("No git identity configured ({}), using {}", e, FALLBACK_NAME);
            Ok(Signature::now(FALLBACK_NAME, FALLBACK_EMAIL)?)
        }
    }
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

impl VersionControl for GitBackend {
    fn clone_repository(&self, url: &str, dest: &Path) -> Result<(), VcsError> {
        if dest.exists() {
            return Err(VcsError::DestinationExists(dest.to_path_buf()));
        }

        info!("Cloning {} into {}", url, dest.display());

        let progress = self.show_progress.then(progress_bar);

        let mut callbacks = self.callbacks();
        callbacks.transfer_progress(|stats: Progress<'_>| {
            if let Some(ref pb) = progress {
                pb.set_length(stats.total_objects() as u64);
                pb.set_position(stats.received_objects() as u64);
            }
            true
        });

        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(callbacks);

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_opts);
        builder.clone(url, dest)?;

        if let Some(ref pb) = progress {
            pb.finish_and_clear();
        }

        Ok(())
    }

    fn create_branch(&self, path: &Path, branch: &str) -> Result<(), VcsError> {
        let repo = self.open(path)?;

        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                return Err(VcsError::EmptyRepository(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let commit = head.peel_to_commit()?;

        if repo.find_branch(branch, BranchType::Local).is_err() {
            repo.branch(branch, &commit, false)?;
            debug!("Created branch {} at {}", branch, commit.id());
        }

        repo.set_head(&format!("refs/heads/{}", branch))?;
        repo.checkout_head(Some(CheckoutBuilder::new().safe()))?;
        Ok(())
    }

    fn commit_all(&self, path: &Path, message: &str) -> Result<bool, VcsError> {
        let repo = self.open(path)?;

        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let parent = repo.head()?.peel_to_commit()?;
        if parent.tree_id() == tree_id {
            debug!("Nothing to commit in {}", path.display());
            return Ok(false);
        }

        let tree = repo.find_tree(tree_id)?;
        let sig = signature(&repo)?;
        let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?;
        debug!("Committed {} in {}", oid, path.display());
        Ok(true)
    }

    fn push(&self, path: &Path, branch: &str) -> Result<(), VcsError> {
        let repo = self.open(path)?;
        let mut remote = repo.find_remote("origin")?;
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);

        let rejection: RefCell<Option<String>> = RefCell::new(None);
        {
            let mut callbacks = self.callbacks();
            callbacks.push_update_reference(|refname, status| {
                if let Some(reason) = status {
                    *rejection.borrow_mut() = Some(format!("{}: {}", refname, reason));
                }
                Ok(())
            });

            let mut push_opts = PushOptions::new();
            push_opts.remote_callbacks(callbacks);
            remote.push(&[refspec.as_str()], Some(&mut push_opts))?;
        }

        if let Some(reason) = rejection.into_inner() {
            return Err(VcsError::PushRejected {
                branch: branch.to_string(),
                reason,
            });
        }

        Ok(())
    }

    fn pull(&self, path: &Path, branch: &str) -> Result<(), VcsError> {
        let repo = self.open(path)?;
        let mut remote = repo.find_remote("origin")?;

        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(self.callbacks());
        remote.fetch(&[branch], Some(&mut fetch_opts), None)?;

        let fetch_head = repo.find_reference("FETCH_HEAD")?;
        let incoming = repo.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = repo.merge_analysis(&[&incoming])?;

        if analysis.is_up_to_date() {
            debug!("{} is up to date with origin/{}", path.display(), branch);
            return Ok(());
        }

        if analysis.is_fast_forward() {
            let head = repo.head()?;
            let refname = head.name().unwrap_or("HEAD").to_string();
            let mut reference = repo.find_reference(&refname)?;
            reference.set_target(incoming.id(), &format!("pull: fast-forward origin/{}", branch))?;
            repo.set_head(&refname)?;
            repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
            debug!("Fast-forwarded {} to {}", path.display(), incoming.id());
            return Ok(());
        }

        repo.merge(&[&incoming], None, None)?;
        let mut index = repo.index()?;
        if index.has_conflicts() {
            return Err(VcsError::MergeConflict {
                branch: branch.to_string(),
                path: path.to_path_buf(),
            });
        }

        let tree = repo.find_tree(index.write_tree()?)?;
        let local = repo.head()?.peel_to_commit()?;
        let theirs = repo.find_commit(incoming.id())?;
        let sig = signature(&repo)?;
        repo.commit(
            Some("HEAD"),
            &sig,
            &sig,
            &format!("Merge origin/{}", branch),
            &tree,
            &[&local, &theirs],
        )?;
        repo.cleanup_state()?;
        debug!("Merged origin/{} into {}", branch, path.display());
        Ok(())
    }

    fn is_repository(&self, path: &Path) -> bool {
        Repository::open(path).is_ok()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// Bare "origin" with one commit on `main`, plus its file URL.
    pub(crate) fn make_origin(root: &Path, name: &str) -> (PathBuf, String) {
        let seed_path = root.join(format!("{}-seed", name));
        let bare_path = root.join(format!("{}.git", name));

        let seed = Repository::init(&seed_path).unwrap();
        fs::write(seed_path.join("homework.py"), "print('hello')\n").unwrap();
        let mut index = seed.index().unwrap();
        index.add_path(Path::new("homework.py")).unwrap();
        index.write().unwrap();
        let tree = seed.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("student", "student@example.com").unwrap();
        let commit = seed
            .commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        let commit = seed.find_commit(commit).unwrap();
        seed.branch("main", &commit, true).unwrap();

        Repository::init_bare(&bare_path).unwrap();
        let mut remote = seed.remote("origin", bare_path.to_str().unwrap()).unwrap();
        remote
            .push(&["refs/heads/main:refs/heads/main"], None)
            .unwrap();
        let bare = Repository::open_bare(&bare_path).unwrap();
        bare.set_head("refs/heads/main").unwrap();

        let url = bare_path.to_str().unwrap().to_string();
        (bare_path, url)
    }

    #[test]
    fn test_clone_branch_commit_push() {
        let dir = tempfile::tempdir().unwrap();
        let (bare_path, url) = make_origin(dir.path(), "lesson1-jdoe");
        let git = GitBackend::new(None, false);

        let work = dir.path().join("work").join("lesson1-jdoe");
        git.clone_repository(&url, &work).unwrap();
        assert!(git.is_repository(&work));

        git.create_branch(&work, "graded").unwrap();
        let repo = Repository::open(&work).unwrap();
        assert_eq!(repo.head().unwrap().shorthand(), Some("graded"));

        assert!(!git.commit_all(&work, "nothing").unwrap());

        fs::write(work.join("GRADE.md"), "Total Grade: 9\n").unwrap();
        assert!(git.commit_all(&work, "Graded").unwrap());

        git.push(&work, "graded").unwrap();
        let bare = Repository::open_bare(&bare_path).unwrap();
        assert!(bare.find_branch("graded", BranchType::Local).is_ok());
    }

    #[test]
    fn test_clone_into_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let (_, url) = make_origin(dir.path(), "lesson1-asmith");
        let dest = dir.path().join("taken");
        fs::create_dir(&dest).unwrap();

        let git = GitBackend::new(None, false);
        assert!(matches!(
            git.clone_repository(&url, &dest),
            Err(VcsError::DestinationExists(_))
        ));
    }

    #[test]
    fn test_pull_merges_remote_changes() {
        let dir = tempfile::tempdir().unwrap();
        let (_, url) = make_origin(dir.path(), "lesson2-bkim");
        let git = GitBackend::new(None, false);

        let first = dir.path().join("first");
        let second = dir.path().join("second");
        git.clone_repository(&url, &first).unwrap();
        git.clone_repository(&url, &second).unwrap();

        for clone in [&first, &second] {
            git.create_branch(clone, "graded").unwrap();
        }

        fs::write(first.join("GRADE.md"), "Total Grade: 8\n").unwrap();
        git.commit_all(&first, "first grader").unwrap();
        git.push(&first, "graded").unwrap();

        fs::write(second.join("NOTES.md"), "late penalty\n").unwrap();
        git.commit_all(&second, "second grader").unwrap();
        assert!(git.push(&second, "graded").is_err());

        git.pull(&second, "graded").unwrap();
        assert!(second.join("GRADE.md").exists());
        git.push(&second, "graded").unwrap();
    }

    #[test]
    fn test_open_non_repository() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitBackend::default();
        assert!(!git.is_repository(dir.path()));
        assert!(matches!(
            git.commit_all(dir.path(), "msg"),
            Err(VcsError::NotARepository(_))
        ));
    }
}
