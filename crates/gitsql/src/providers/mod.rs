//! Row producers for each table operation.
//!
//! A [`TableOperation`] turns one resolved identifier into rows. It knows
//! nothing about input rows, batching or caching; the scans in
//! [`crate::scan`] handle those identically for every operation.

mod branches;
mod log;
mod parents;
mod read;
mod tags;
mod tree;

pub use branches::BranchesOperation;
pub use log::LogOperation;
pub use parents::ParentsOperation;
pub use read::{BlobBody, ReadOperation};
pub use tags::TagsOperation;
pub use tree::TreeOperation;

use crate::error::Result;
use crate::git::{GitRepo, ResolvedContext};
use crate::scan::{Interrupt, Row, ScanOptions};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use serde::Serialize;
use std::sync::Arc;

/// A column exposed by a table operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
}

/// An extra hidden argument accepted after `identifier` and `revision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionDef {
    pub name: &'static str,
    pub sql_type: &'static str,
}

const fn col(name: &'static str, sql_type: &'static str) -> ColumnDef {
    ColumnDef { name, sql_type }
}

/// Produces the rows for one resolved identifier.
pub trait TableOperation: Send + Sync {
    /// Base function name, e.g. `git_log`.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn columns(&self) -> &'static [ColumnDef];

    fn options(&self) -> &'static [OptionDef] {
        &[]
    }

    fn produce(
        &self,
        repo: &GitRepo,
        ctx: &ResolvedContext,
        options: &ScanOptions,
        interrupt: &Interrupt,
    ) -> Result<Vec<Row>>;
}

/// Every operation, in registration order.
pub fn all_operations() -> Vec<Arc<dyn TableOperation>> {
    vec![
        Arc::new(LogOperation),
        Arc::new(BranchesOperation),
        Arc::new(TagsOperation),
        Arc::new(TreeOperation),
        Arc::new(ParentsOperation),
        Arc::new(ReadOperation),
    ]
}

pub(crate) fn text(s: impl Into<String>) -> Value {
    Value::Text(s.into())
}

pub(crate) fn opt_text(s: Option<&str>) -> Value {
    s.map_or(Value::Null, |s| Value::Text(s.to_string()))
}

pub(crate) fn flag(b: bool) -> Value {
    Value::Integer(i64::from(b))
}

pub(crate) fn int(n: impl Into<i64>) -> Value {
    Value::Integer(n.into())
}

/// Formats a git timestamp as ISO-8601 UTC.
pub(crate) fn format_git_time(time: git2::Time) -> Value {
    DateTime::<Utc>::from_timestamp(time.seconds(), 0)
        .map(|dt| text(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()))
        .unwrap_or(Value::Null)
}

/// Extension including the dot, or empty when there is none.
pub(crate) fn file_ext(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => name[dot..].to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;
    use std::process::Command;
    use tempfile::TempDir;

    pub fn git(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .expect("Failed to run git");
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn commit_file(dir: &Path, path: &str, content: &[u8], message: &str) {
        let full = dir.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
        git(dir, &["add", "."]);
        git(dir, &["commit", "-q", "-m", message]);
    }

    pub fn empty_repo() -> TempDir {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path();
        git(path, &["init", "-q", "-b", "main"]);
        git(path, &["config", "user.email", "test@example.com"]);
        git(path, &["config", "user.name", "Test User"]);
        git(path, &["config", "commit.gpgsign", "false"]);
        git(path, &["config", "tag.gpgsign", "false"]);
        temp
    }
}
