//! Recursive tree listing.

use super::{col, file_ext, flag, format_git_time, int, text, ColumnDef, TableOperation};
use crate::error::Result;
use crate::git::uri::build_uri;
use crate::git::{pathspec, GitRepo, ResolvedContext};
use crate::scan::{Interrupt, Row, ScanOptions};
use git2::{ObjectType, Oid, Repository, Tree, TreeEntry};
use rusqlite::types::Value;
use std::path::Path;

const COLUMNS: &[ColumnDef] = &[
    col("git_uri", "TEXT"),
    col("repo_path", "TEXT"),
    col("commit_hash", "TEXT"),
    col("tree_hash", "TEXT"),
    col("file_path", "TEXT"),
    col("file_ext", "TEXT"),
    col("ref", "TEXT"),
    col("blob_hash", "TEXT"),
    col("commit_date", "TEXT"),
    col("mode", "INTEGER"),
    col("size_bytes", "INTEGER"),
    col("kind", "TEXT"),
    col("is_text", "INTEGER"),
    col("encoding", "TEXT"),
];

/// Every entry of the revision's tree, depth first. A file path in the
/// identifier restricts the listing to that entry (and its descendants when
/// it is a directory); a path absent from the revision lists nothing.
pub struct TreeOperation;

impl TableOperation for TreeOperation {
    fn name(&self) -> &'static str {
        "git_tree"
    }

    fn description(&self) -> &'static str {
        "Files, directories and submodules at a revision"
    }

    fn columns(&self) -> &'static [ColumnDef] {
        COLUMNS
    }

    fn produce(
        &self,
        repo: &GitRepo,
        ctx: &ResolvedContext,
        _options: &ScanOptions,
        interrupt: &Interrupt,
    ) -> Result<Vec<Row>> {
        let commit = repo.find_commit(ctx.commit_id()?)?;
        let root = commit.tree()?;
        let walker = TreeWalker {
            git: repo.inner(),
            repo_path: ctx.repo_path(),
            commit_hash: commit.id().to_string(),
            commit_date: format_git_time(commit.time()),
            interrupt,
        };

        let path = pathspec::normalize(&ctx.file_path)?;
        let mut rows = Vec::new();
        if path.is_empty() {
            walker.walk(&root, "", &mut rows)?;
            return Ok(rows);
        }

        let entry = match root.get_path(Path::new(&path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                tracing::debug!(path = %path, revision = %ctx.final_revision, "path not in tree");
                return Ok(rows);
            }
            Err(e) => return Err(e.into()),
        };
        // The row's tree_hash is the tree the entry was found in.
        let parent_id = match path.rsplit_once('/') {
            Some((dir, _)) => root.get_path(Path::new(dir))?.id(),
            None => root.id(),
        };
        walker.visit(&entry, parent_id, &path, &mut rows)?;
        Ok(rows)
    }
}

struct TreeWalker<'a> {
    git: &'a Repository,
    repo_path: String,
    commit_hash: String,
    commit_date: Value,
    interrupt: &'a Interrupt,
}

impl TreeWalker<'_> {
    fn walk(&self, tree: &Tree<'_>, base: &str, rows: &mut Vec<Row>) -> Result<()> {
        for entry in tree.iter() {
            self.interrupt.check()?;
            let name = String::from_utf8_lossy(entry.name_bytes());
            let path = if base.is_empty() {
                name.into_owned()
            } else {
                format!("{base}/{name}")
            };
            self.visit(&entry, tree.id(), &path, rows)?;
        }
        Ok(())
    }

    fn visit(&self, entry: &TreeEntry<'_>, parent: Oid, path: &str, rows: &mut Vec<Row>) -> Result<()> {
        match entry.kind() {
            Some(ObjectType::Blob) => {
                let blob = self.git.find_blob(entry.id())?;
                let is_text = !blob.is_binary();
                rows.push(self.row(
                    parent,
                    path,
                    text(entry.id().to_string()),
                    entry.filemode(),
                    blob.size() as i64,
                    "file",
                    is_text,
                    if is_text { "utf8" } else { "binary" },
                ));
            }
            Some(ObjectType::Tree) => {
                rows.push(self.row(parent, path, Value::Null, entry.filemode(), 0, "tree", false, "unknown"));
                let subtree = self.git.find_tree(entry.id())?;
                self.walk(&subtree, path, rows)?;
            }
            Some(ObjectType::Commit) => {
                rows.push(self.row(parent, path, Value::Null, entry.filemode(), 0, "submodule", false, "unknown"));
            }
            _ => {}
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn row(
        &self,
        parent: Oid,
        path: &str,
        blob_hash: Value,
        mode: i32,
        size: i64,
        kind: &str,
        is_text: bool,
        encoding: &str,
    ) -> Row {
        vec![
            text(build_uri(&self.repo_path, path, &self.commit_hash)),
            text(self.repo_path.clone()),
            text(self.commit_hash.clone()),
            text(parent.to_string()),
            text(path),
            text(file_ext(path)),
            text(self.commit_hash.clone()),
            blob_hash,
            self.commit_date.clone(),
            int(mode),
            int(size),
            text(kind),
            flag(is_text),
            text(encoding),
        ]
    }
}
