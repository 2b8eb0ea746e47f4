//! Git repository wrapper for gitsql.

use crate::error::{GitsqlError, Result};
use git2::{Commit, Oid, Repository, RepositoryOpenFlags, Revwalk, Sort};
use std::ffi::OsStr;
use std::path::Path;

/// An open repository, keyed by the root it was opened at.
///
/// `GitRepo` never searches upward: the root must already be known (see
/// [`crate::git::discovery`]). Dropping the value closes the repository.
///
/// # Example
///
/// ```no_run
/// use gitsql::GitRepo;
///
/// let root = gitsql::git::discovery::discover(".")?;
/// let repo = GitRepo::open(&root)?;
/// println!("Repository at: {}", repo.path());
/// # Ok::<(), gitsql::GitsqlError>(())
/// ```
pub struct GitRepo {
    repo: Repository,
    path: String,
}

impl GitRepo {
    /// Opens the repository whose root is exactly `root`.
    ///
    /// # Errors
    ///
    /// Returns `GitsqlError::OpenRepository` if `root` is not a repository.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let repo = Repository::open_ext(
            root,
            RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&OsStr>(),
        )
        .map_err(|source| GitsqlError::OpenRepository {
            root: root.display().to_string(),
            source,
        })?;

        Ok(Self {
            repo,
            path: root.display().to_string(),
        })
    }

    /// Returns the root path the repository was opened at.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns a reference to the underlying `git2::Repository`.
    pub fn inner(&self) -> &Repository {
        &self.repo
    }

    pub fn find_commit(&self, oid: Oid) -> Result<Commit<'_>> {
        Ok(self.repo.find_commit(oid)?)
    }

    /// Walks commits reachable from `start`, newest first.
    pub fn walk_from(&self, start: Oid) -> Result<Revwalk<'_>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME | Sort::TOPOLOGICAL)?;
        revwalk.push(start)?;
        Ok(revwalk)
    }

    /// Walks commits reachable from any reference in the repository.
    pub fn walk_all_refs(&self) -> Result<Revwalk<'_>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME | Sort::TOPOLOGICAL)?;
        for reference in self.repo.references()? {
            let reference = reference?;
            if let Ok(commit) = reference.peel_to_commit() {
                revwalk.push(commit.id())?;
            }
        }
        Ok(revwalk)
    }

    pub fn branches(&self) -> Result<git2::Branches<'_>> {
        Ok(self.repo.branches(None)?)
    }
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo").field("root", &self.path).finish()
    }
}
