//! Commit history.

use super::{col, format_git_time, int, opt_text, text, ColumnDef, TableOperation};
use crate::error::Result;
use crate::git::{history, pathspec, GitRepo, ResolvedContext};
use crate::scan::{Interrupt, Row, ScanOptions};

const COLUMNS: &[ColumnDef] = &[
    col("repo_path", "TEXT"),
    col("commit_hash", "TEXT"),
    col("author_name", "TEXT"),
    col("author_email", "TEXT"),
    col("committer_name", "TEXT"),
    col("committer_email", "TEXT"),
    col("author_date", "TEXT"),
    col("commit_date", "TEXT"),
    col("message", "TEXT"),
    col("parent_count", "INTEGER"),
    col("tree_hash", "TEXT"),
];

/// Commits reachable from the revision, newest first. When the identifier
/// names a file, only commits that changed it are listed.
pub struct LogOperation;

impl TableOperation for LogOperation {
    fn name(&self) -> &'static str {
        "git_log"
    }

    fn description(&self) -> &'static str {
        "Commit history reachable from a revision"
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
        let start = ctx.commit_id()?;
        let path = pathspec::normalize(&ctx.file_path)?;
        let repo_path = ctx.repo_path();

        let mut rows = Vec::new();
        for oid in repo.walk_from(start)? {
            interrupt.check()?;
            let commit = repo.find_commit(oid?)?;
            if !path.is_empty() && !history::file_changed_in_commit(repo.inner(), &commit, &path)? {
                continue;
            }

            let author = commit.author();
            let committer = commit.committer();
            rows.push(vec![
                text(repo_path.clone()),
                text(commit.id().to_string()),
                opt_text(author.name()),
                opt_text(author.email()),
                opt_text(committer.name()),
                opt_text(committer.email()),
                format_git_time(author.when()),
                format_git_time(committer.when()),
                opt_text(commit.message()),
                int(commit.parent_count() as i64),
                text(commit.tree_id().to_string()),
            ]);
        }

        tracing::debug!(root = %repo_path, commits = rows.len(), "walked history");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::ContextResolver;
    use crate::providers::testing::{commit_file, empty_repo, git};
    use rusqlite::types::Value;

    fn log(identifier: &str) -> Vec<Row> {
        let ctx = ContextResolver::new().resolve(identifier, "HEAD").unwrap();
        let repo = GitRepo::open(&ctx.repository_root).unwrap();
        LogOperation
            .produce(&repo, &ctx, &ScanOptions::default(), &Interrupt::new())
            .unwrap()
    }

    fn messages(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|r| match &r[8] {
                Value::Text(s) => s.trim().to_string(),
                other => panic!("unexpected message {other:?}"),
            })
            .collect()
    }

    #[test]
    fn lists_commits_newest_first() {
        let repo = empty_repo();
        commit_file(repo.path(), "a.txt", b"1", "one");
        commit_file(repo.path(), "a.txt", b"2", "two");

        let rows = log(&repo.path().display().to_string());
        assert_eq!(messages(&rows), vec!["two", "one"]);
        assert_eq!(rows[0][2], Value::Text("Test User".into()));
        assert_eq!(rows[1][9], Value::Integer(0));
        assert_eq!(rows[0][9], Value::Integer(1));
    }

    #[test]
    fn history_by_path_follows_merges() {
        let repo = empty_repo();
        let dir = repo.path();
        commit_file(dir, "tracked.txt", b"base\n", "root adds tracked");
        commit_file(dir, "other.txt", b"x\n", "unrelated");

        git(dir, &["checkout", "-q", "-b", "feature"]);
        commit_file(dir, "tracked.txt", b"feature\n", "feature edits tracked");
        git(dir, &["checkout", "-q", "main"]);
        commit_file(dir, "other.txt", b"y\n", "main edits other");
        git(dir, &["merge", "-q", "--no-edit", "feature", "-m", "merge feature"]);

        let rows = log(&format!("{}/tracked.txt", dir.display()));
        assert_eq!(
            messages(&rows),
            vec!["feature edits tracked", "root adds tracked"]
        );
    }

    #[test]
    fn root_commit_counts_only_when_path_exists() {
        let repo = empty_repo();
        let dir = repo.path();
        commit_file(dir, "first.txt", b"1", "root");
        commit_file(dir, "later.txt", b"2", "adds later");

        let rows = log(&format!("{}/later.txt", dir.display()));
        assert_eq!(messages(&rows), vec!["adds later"]);
    }

    #[test]
    fn history_path_is_literal() {
        let repo = empty_repo();
        let dir = repo.path();
        commit_file(dir, "a[1].txt", b"1", "adds bracketed");
        commit_file(dir, "a1.txt", b"2", "adds plain");

        let rows = log(&format!("{}/a[1].txt", dir.display()));
        assert_eq!(messages(&rows), vec!["adds bracketed"]);
    }
}
