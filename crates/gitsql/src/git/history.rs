//! Per-path commit filtering for history walks.

use crate::error::Result;
use git2::{Commit, DiffOptions, Repository, Tree};
use std::path::Path;

/// Whether `commit` touched `path`.
///
/// A root commit counts as a change when the path exists in it. A merge
/// counts only if the path differs from every parent; merges that take the
/// file unchanged from one side are skipped. An empty path never matches.
pub fn file_changed_in_commit(repo: &Repository, commit: &Commit<'_>, path: &str) -> Result<bool> {
    if path.is_empty() {
        return Ok(false);
    }

    let tree = commit.tree()?;
    if commit.parent_count() == 0 {
        return Ok(tree.get_path(Path::new(path)).is_ok());
    }

    for parent in commit.parents() {
        if !changed_against(repo, &parent.tree()?, &tree, path)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn changed_against(repo: &Repository, old: &Tree<'_>, new: &Tree<'_>, path: &str) -> Result<bool> {
    let mut opts = DiffOptions::new();
    opts.pathspec(path).disable_pathspec_match(true);
    let diff = repo.diff_tree_to_tree(Some(old), Some(new), Some(&mut opts))?;
    Ok(diff.deltas().len() > 0)
}
