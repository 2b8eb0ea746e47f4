use super::{col, flag, opt_text, text, ColumnDef, TableOperation};
use crate::error::Result;
use crate::git::{GitRepo, ResolvedContext};
use crate::scan::{Interrupt, Row, ScanOptions};
use git2::BranchType;
use rusqlite::types::Value;

const COLUMNS: &[ColumnDef] = &[
    col("repo_path", "TEXT"),
    col("branch_name", "TEXT"),
    col("commit_hash", "TEXT"),
    col("is_current", "INTEGER"),
    col("is_remote", "INTEGER"),
];

/// Local and remote-tracking branches.
pub struct BranchesOperation;

impl TableOperation for BranchesOperation {
    fn name(&self) -> &'static str {
        "git_branches"
    }

    fn description(&self) -> &'static str {
        "Local and remote-tracking branches"
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
        let repo_path = ctx.repo_path();
        let mut rows = Vec::new();

        for branch in repo.branches()? {
            interrupt.check()?;
            let (branch, branch_type) = branch?;
            let name = branch.name()?.map(str::to_string);
            let commit_hash = branch
                .get()
                .target()
                .map_or(Value::Null, |oid| text(oid.to_string()));

            rows.push(vec![
                text(repo_path.clone()),
                opt_text(name.as_deref()),
                commit_hash,
                flag(branch.is_head()),
                flag(branch_type == BranchType::Remote),
            ]);
        }

        Ok(rows)
    }
}
