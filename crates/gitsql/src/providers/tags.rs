use super::{col, flag, format_git_time, text, ColumnDef, TableOperation};
use crate::error::Result;
use crate::git::{GitRepo, ResolvedContext};
use crate::scan::{Interrupt, Row, ScanOptions};
use rusqlite::types::Value;

const COLUMNS: &[ColumnDef] = &[
    col("repo_path", "TEXT"),
    col("tag_name", "TEXT"),
    col("commit_hash", "TEXT"),
    col("tag_hash", "TEXT"),
    col("tagger_name", "TEXT"),
    col("tagger_date", "TEXT"),
    col("message", "TEXT"),
    col("is_annotated", "INTEGER"),
];

/// Lightweight and annotated tags. For lightweight tags `tag_hash` and
/// `commit_hash` are the same object.
pub struct TagsOperation;

impl TableOperation for TagsOperation {
    fn name(&self) -> &'static str {
        "git_tags"
    }

    fn description(&self) -> &'static str {
        "Lightweight and annotated tags"
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
        let git = repo.inner();
        let repo_path = ctx.repo_path();
        let mut rows = Vec::new();

        for name in git.tag_names(None)?.iter().flatten() {
            interrupt.check()?;
            let reference = git.find_reference(&format!("refs/tags/{name}"))?;
            let Some(tag_oid) = reference.target() else {
                continue;
            };

            let row = match git.find_tag(tag_oid) {
                Ok(tag) => {
                    let tagger = tag.tagger();
                    vec![
                        text(repo_path.clone()),
                        text(name),
                        text(tag.target_id().to_string()),
                        text(tag_oid.to_string()),
                        text(tagger.as_ref().and_then(|t| t.name()).unwrap_or_default()),
                        tagger.as_ref().map_or(Value::Null, |t| format_git_time(t.when())),
                        text(tag.message().unwrap_or_default()),
                        flag(true),
                    ]
                }
                Err(_) => vec![
                    text(repo_path.clone()),
                    text(name),
                    text(tag_oid.to_string()),
                    text(tag_oid.to_string()),
                    text(""),
                    Value::Null,
                    text(""),
                    flag(false),
                ],
            };
            rows.push(row);
        }

        Ok(rows)
    }
}
