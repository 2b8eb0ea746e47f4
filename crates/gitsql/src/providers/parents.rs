use super::{col, int, text, ColumnDef, OptionDef, TableOperation};
use crate::error::Result;
use crate::git::{GitRepo, ResolvedContext};
use crate::scan::{Interrupt, Row, ScanOptions};

const COLUMNS: &[ColumnDef] = &[
    col("repo_path", "TEXT"),
    col("commit_hash", "TEXT"),
    col("parent_hash", "TEXT"),
    col("parent_index", "INTEGER"),
];

const OPTIONS: &[OptionDef] = &[OptionDef {
    name: "all_refs",
    sql_type: "INTEGER",
}];

/// Parent edges of every commit reachable from the revision, or from every
/// reference when `all_refs` is set. Root commits contribute no rows.
pub struct ParentsOperation;

impl TableOperation for ParentsOperation {
    fn name(&self) -> &'static str {
        "git_parents"
    }

    fn description(&self) -> &'static str {
        "Commit-to-parent edges of the commit graph"
    }

    fn columns(&self) -> &'static [ColumnDef] {
        COLUMNS
    }

    fn options(&self) -> &'static [OptionDef] {
        OPTIONS
    }

    fn produce(
        &self,
        repo: &GitRepo,
        ctx: &ResolvedContext,
        options: &ScanOptions,
        interrupt: &Interrupt,
    ) -> Result<Vec<Row>> {
        let walk = if options.all_refs {
            repo.walk_all_refs()?
        } else {
            repo.walk_from(ctx.commit_id()?)?
        };

        let repo_path = ctx.repo_path();
        let mut rows = Vec::new();
        for oid in walk {
            interrupt.check()?;
            let oid = oid?;
            let commit = repo.find_commit(oid)?;
            for (index, parent) in commit.parent_ids().enumerate() {
                rows.push(vec![
                    text(repo_path.clone()),
                    text(oid.to_string()),
                    text(parent.to_string()),
                    int(index as i64),
                ]);
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::ContextResolver;
    use crate::providers::testing::{commit_file, empty_repo, git};

    fn parents(dir: &std::path::Path, revision: &str, all_refs: bool) -> Vec<Row> {
        let ctx = ContextResolver::new()
            .resolve(&dir.display().to_string(), revision)
            .unwrap();
        let handle = GitRepo::open(&ctx.repository_root).unwrap();
        let options = ScanOptions {
            all_refs,
            ..ScanOptions::default()
        };
        ParentsOperation
            .produce(&handle, &ctx, &options, &Interrupt::new())
            .unwrap()
    }

    #[test]
    fn merge_commit_has_two_indexed_parents() {
        let repo = empty_repo();
        let dir = repo.path();
        commit_file(dir, "a.txt", b"a", "root");
        git(dir, &["checkout", "-q", "-b", "side"]);
        commit_file(dir, "b.txt", b"b", "side");
        git(dir, &["checkout", "-q", "main"]);
        commit_file(dir, "c.txt", b"c", "main");
        git(dir, &["merge", "-q", "--no-edit", "side", "-m", "merge"]);

        let rows = parents(dir, "HEAD", false);
        assert_eq!(rows.len(), 4);
        let head = git(dir, &["rev-parse", "HEAD"]);
        let merge_edges: Vec<_> = rows.iter().filter(|r| r[1] == text(head.clone())).collect();
        assert_eq!(merge_edges.len(), 2);
        assert_eq!(merge_edges[0][3], int(0));
        assert_eq!(merge_edges[1][3], int(1));
    }

    #[test]
    fn all_refs_reaches_unmerged_branches() {
        let repo = empty_repo();
        let dir = repo.path();
        commit_file(dir, "a.txt", b"a", "root");
        commit_file(dir, "a.txt", b"b", "second");
        git(dir, &["checkout", "-q", "-b", "side"]);
        commit_file(dir, "b.txt", b"b", "side only");
        git(dir, &["checkout", "-q", "main"]);

        assert_eq!(parents(dir, "main", false).len(), 1);
        assert_eq!(parents(dir, "main", true).len(), 2);
    }
}
