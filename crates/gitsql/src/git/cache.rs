//! Repository handle caching.
//!
//! Lateral scans keep a single [`RepoSlot`] each: consecutive rows that hit
//! the same root reuse the handle, a different root closes it first.
//! Single-target scans share a [`SharedRepoCache`] owned by the session.

use crate::error::Result;
use crate::git::GitRepo;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Opens repository handles for the caches.
pub trait RepositoryOpener {
    type Handle;

    fn open(&self, root: &Path) -> Result<Self::Handle>;
}

/// Opens real repositories through libgit2.
#[derive(Debug, Clone, Copy, Default)]
pub struct Git2Opener;

impl RepositoryOpener for Git2Opener {
    type Handle = GitRepo;

    fn open(&self, root: &Path) -> Result<GitRepo> {
        GitRepo::open(root)
    }
}

/// A single cached handle keyed by its repository root.
pub struct RepoSlot<O: RepositoryOpener> {
    opener: O,
    cached: Option<(PathBuf, O::Handle)>,
}

impl<O: RepositoryOpener> RepoSlot<O> {
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            cached: None,
        }
    }

    /// Returns the handle for `root`, opening it if the slot holds another
    /// repository (or nothing).
    pub fn get(&mut self, root: &Path) -> Result<&mut O::Handle> {
        let entry = match self.cached.take() {
            Some((cached_root, handle)) if cached_root == root => (cached_root, handle),
            stale => {
                if let Some((old_root, old)) = stale {
                    tracing::trace!(root = %old_root.display(), "closing cached repository");
                    drop(old);
                }
                tracing::trace!(root = %root.display(), "opening repository");
                (root.to_path_buf(), self.opener.open(root)?)
            }
        };
        Ok(&mut self.cached.insert(entry).1)
    }

    pub fn cached_root(&self) -> Option<&Path> {
        self.cached.as_ref().map(|(root, _)| root.as_path())
    }

    /// Closes the cached handle, if any.
    pub fn clear(&mut self) {
        self.cached = None;
    }
}

/// Handles shared between single-target scans, one per repository root.
pub struct SharedRepoCache<O: RepositoryOpener> {
    opener: O,
    handles: Mutex<HashMap<PathBuf, Arc<Mutex<O::Handle>>>>,
}

impl<O: RepositoryOpener> SharedRepoCache<O> {
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up or opens the handle for `root` in one locked step.
    pub fn get_or_open(&self, root: &Path) -> Result<Arc<Mutex<O::Handle>>> {
        let mut handles = self.lock();
        if let Some(handle) = handles.get(root) {
            return Ok(Arc::clone(handle));
        }
        tracing::trace!(root = %root.display(), "opening shared repository");
        let handle = Arc::new(Mutex::new(self.opener.open(root)?));
        handles.insert(root.to_path_buf(), Arc::clone(&handle));
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached handle. Handles still borrowed by a scan close
    /// when that scan finishes.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<Mutex<O::Handle>>>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Locks a shared handle, recovering from a panicked holder.
pub fn lock_handle<H>(handle: &Mutex<H>) -> MutexGuard<'_, H> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts opens and closes while delegating to real repositories.
    #[derive(Clone, Default)]
    pub struct CountingOpener {
        pub opens: Arc<AtomicUsize>,
        pub closes: Arc<AtomicUsize>,
        pub log: Arc<Mutex<Vec<String>>>,
    }

    impl CountingOpener {
        pub fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }

        pub fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }

        pub fn events(&self) -> Vec<String> {
            lock_handle(&self.log).clone()
        }
    }

    pub struct CountedRepo {
        repo: GitRepo,
        closes: Arc<AtomicUsize>,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl std::ops::Deref for CountedRepo {
        type Target = GitRepo;

        fn deref(&self) -> &GitRepo {
            &self.repo
        }
    }

    impl std::borrow::Borrow<GitRepo> for CountedRepo {
        fn borrow(&self) -> &GitRepo {
            &self.repo
        }
    }

    impl Drop for CountedRepo {
        fn drop(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
            lock_handle(&self.log).push(format!("close {}", self.repo.path()));
        }
    }

    impl RepositoryOpener for CountingOpener {
        type Handle = CountedRepo;

        fn open(&self, root: &Path) -> Result<CountedRepo> {
            let repo = GitRepo::open(root)?;
            self.opens.fetch_add(1, Ordering::SeqCst);
            lock_handle(&self.log).push(format!("open {}", root.display()));
            Ok(CountedRepo {
                repo,
                closes: Arc::clone(&self.closes),
                log: Arc::clone(&self.log),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CountingOpener;
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn init_repo() -> TempDir {
        let temp = TempDir::new().expect("Failed to create temp dir");
        Command::new("git")
            .args(["init", "-q"])
            .current_dir(temp.path())
            .output()
            .expect("Failed to init git repo");
        temp
    }

    #[test]
    fn same_root_opens_once() {
        let repo = init_repo();
        let opener = CountingOpener::default();
        let mut slot = RepoSlot::new(opener.clone());

        for _ in 0..5 {
            slot.get(repo.path()).unwrap();
        }
        assert_eq!(opener.opens(), 1);
        assert_eq!(opener.closes(), 0);

        drop(slot);
        assert_eq!(opener.closes(), 1);
    }

    #[test]
    fn root_change_closes_before_opening() {
        let a = init_repo();
        let b = init_repo();
        let opener = CountingOpener::default();
        let mut slot = RepoSlot::new(opener.clone());

        slot.get(a.path()).unwrap();
        slot.get(b.path()).unwrap();
        slot.get(a.path()).unwrap();

        assert_eq!(opener.opens(), 3);
        assert_eq!(opener.closes(), 2);
        assert_eq!(slot.cached_root(), Some(a.path()));

        let events = opener.events();
        assert_eq!(events[0], format!("open {}", a.path().display()));
        assert_eq!(events[1], format!("close {}", a.path().display()));
        assert_eq!(events[2], format!("open {}", b.path().display()));
    }

    #[test]
    fn failed_open_leaves_slot_empty() {
        let a = init_repo();
        let missing = TempDir::new().unwrap();
        let opener = CountingOpener::default();
        let mut slot = RepoSlot::new(opener.clone());

        slot.get(a.path()).unwrap();
        assert!(slot.get(missing.path()).is_err());
        assert_eq!(slot.cached_root(), None);
        assert_eq!(opener.closes(), 1);
    }

    #[test]
    fn shared_cache_reuses_handles() {
        let a = init_repo();
        let b = init_repo();
        let opener = CountingOpener::default();
        let cache = SharedRepoCache::new(opener.clone());

        let first = cache.get_or_open(a.path()).unwrap();
        let second = cache.get_or_open(a.path()).unwrap();
        cache.get_or_open(b.path()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(opener.opens(), 2);
        assert_eq!(cache.len(), 2);

        drop((first, second));
        cache.clear();
        assert_eq!(opener.closes(), 2);
        assert!(cache.is_empty());
    }
}
