//! Repository root discovery.
//!
//! Discovery walks upward from a filesystem path to the nearest directory
//! that *is* a repository root. Unlike `git2::Repository::discover`, each
//! candidate is tested strictly (no upward search from the candidate), and
//! paths that do not exist yet are tolerated by first climbing to an
//! existing ancestor.

use crate::error::{GitsqlError, Result};
use git2::{Repository, RepositoryOpenFlags};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Finds the repository root enclosing `path`.
///
/// Relative paths are taken against the process working directory.
pub fn discover<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let start = absolutize(path.as_ref())?;

    let mut probe = start.as_path();
    while !probe.exists() {
        match probe.parent() {
            Some(parent) => probe = parent,
            None => break,
        }
    }

    let mut dir = if probe.is_file() {
        probe.parent().unwrap_or(probe)
    } else {
        probe
    };

    loop {
        if is_repository_root(dir) {
            tracing::trace!(root = %dir.display(), "discovered repository root");
            return Ok(dir.to_path_buf());
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => {
                return Err(GitsqlError::RepositoryNotFound {
                    searched_from: start.display().to_string(),
                })
            }
        }
    }
}

/// Splits `path` into its repository root and the in-repository file path.
pub fn locate<P: AsRef<Path>>(path: P) -> Result<(PathBuf, String)> {
    let absolute = absolutize(path.as_ref())?;
    let root = discover(&absolute)?;
    let file_path = relative_file_path(&absolute, &root);
    Ok((root, file_path))
}

/// Returns `path` relative to `root` with `/` separators, or an empty string
/// when `path` is the root itself (or lies outside it).
pub fn relative_file_path(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rest) => rest
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => String::new(),
    }
}

/// Tests whether `dir` is exactly a repository root: a working tree holding
/// its metadata directly, or a bare repository directory.
pub fn is_repository_root(dir: &Path) -> bool {
    let repo = match Repository::open_ext(
        dir,
        RepositoryOpenFlags::NO_SEARCH,
        std::iter::empty::<&OsStr>(),
    ) {
        Ok(repo) => repo,
        Err(_) => return false,
    };

    if repo.is_bare() {
        return same_path(repo.path(), dir);
    }
    repo.workdir().is_some_and(|workdir| same_path(workdir, dir))
}

/// Makes `path` absolute and resolves `.` and `..` lexically.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.components().eq(b.components()),
    }
}

#[cfg(test)]
mod tests {
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
    fn absolutize_resolves_dots() {
        let p = absolutize(Path::new("/a/b/../c/./d")).unwrap();
        assert_eq!(p, PathBuf::from("/a/c/d"));
        assert_eq!(absolutize(Path::new("/..")).unwrap(), PathBuf::from("/"));
    }

    #[test]
    fn discovers_root_from_nested_missing_path() {
        let temp = init_repo();
        std::fs::create_dir_all(temp.path().join("src/deep")).unwrap();

        let root = discover(temp.path().join("src/deep/not/yet/here.csv")).unwrap();
        assert!(same_path(&root, temp.path()));
    }

    #[test]
    fn discovery_is_monotonic_for_descendants() {
        let temp = init_repo();
        std::fs::create_dir_all(temp.path().join("a/b")).unwrap();
        std::fs::write(temp.path().join("a/b/file.txt"), "x").unwrap();

        let root = discover(temp.path()).unwrap();
        for sub in ["a", "a/b", "a/b/file.txt", "a/missing", "a/b/file.txt/ghost"] {
            assert_eq!(discover(root.join(sub)).unwrap(), root, "{sub}");
        }
    }

    #[test]
    fn nested_repository_wins() {
        let outer = init_repo();
        let inner = outer.path().join("vendor/inner");
        std::fs::create_dir_all(&inner).unwrap();
        Command::new("git")
            .args(["init", "-q"])
            .current_dir(&inner)
            .output()
            .expect("Failed to init nested repo");

        let root = discover(inner.join("lib.rs")).unwrap();
        assert!(same_path(&root, &inner));
    }

    #[test]
    fn missing_repository_is_descriptive() {
        let temp = TempDir::new().unwrap();
        let err = discover(temp.path().join("nothing")).unwrap_err();
        match err {
            GitsqlError::RepositoryNotFound { searched_from } => {
                assert!(searched_from.ends_with("nothing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn locate_splits_file_path() {
        let temp = init_repo();
        let (root, file) = locate(temp.path().join("data/x.csv")).unwrap();
        assert!(same_path(&root, temp.path()));
        assert_eq!(file, "data/x.csv");

        let (_, file) = locate(temp.path()).unwrap();
        assert_eq!(file, "");
    }
}
