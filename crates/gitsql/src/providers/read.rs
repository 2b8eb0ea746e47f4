//! Blob content.

use super::{col, file_ext, flag, int, text, ColumnDef, OptionDef, TableOperation};
use crate::error::{GitsqlError, Result};
use crate::git::uri::build_uri;
use crate::git::{pathspec, GitRepo, ResolvedContext};
use crate::scan::{Interrupt, Row, ScanOptions};
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
    col("mode", "INTEGER"),
    col("kind", "TEXT"),
    col("is_text", "INTEGER"),
    col("encoding", "TEXT"),
    col("size_bytes", "INTEGER"),
    col("truncated", "INTEGER"),
    col("text", "TEXT"),
    col("blob", "BLOB"),
];

const OPTIONS: &[OptionDef] = &[OptionDef {
    name: "max_bytes",
    sql_type: "INTEGER",
}];

const MODE_BLOB: i32 = 0o100644;
const MODE_BLOB_EXECUTABLE: i32 = 0o100755;
const MODE_LINK: i32 = 0o120000;
const MODE_TREE: i32 = 0o040000;
const MODE_COMMIT: i32 = 0o160000;

const LFS_HEADER: &str = "version https://git-lfs.github.com/spec/v1";

/// Decoded content of a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobBody {
    Text(String),
    Binary(Vec<u8>),
    /// A Git LFS pointer. The object itself is never fetched.
    LfsPointer {
        oid: String,
        size: u64,
        pointer: String,
    },
}

impl BlobBody {
    /// Classifies `content`, which may be a truncated prefix of the blob.
    ///
    /// Content libgit2 flags as binary, content with NUL bytes and invalid
    /// UTF-8 are binary. A multi-byte character cut by truncation is dropped
    /// rather than making the text binary.
    pub fn classify(content: &[u8], is_binary: bool, truncated: bool) -> Self {
        if is_binary || content.contains(&0) {
            return BlobBody::Binary(content.to_vec());
        }

        let text = match std::str::from_utf8(content) {
            Ok(s) => s,
            Err(e) if truncated && e.error_len().is_none() => {
                match std::str::from_utf8(&content[..e.valid_up_to()]) {
                    Ok(s) => s,
                    Err(_) => return BlobBody::Binary(content.to_vec()),
                }
            }
            Err(_) => return BlobBody::Binary(content.to_vec()),
        };

        if !truncated {
            if let Some(pointer) = parse_lfs_pointer(text) {
                return pointer;
            }
        }
        BlobBody::Text(text.to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BlobBody::LfsPointer { .. } => "lfs_pointer",
            _ => "file",
        }
    }

    pub fn is_text(&self) -> bool {
        !matches!(self, BlobBody::Binary(_))
    }

    pub fn encoding(&self) -> &'static str {
        if self.is_text() {
            "utf8"
        } else {
            "binary"
        }
    }
}

fn parse_lfs_pointer(text: &str) -> Option<BlobBody> {
    let mut lines = text.lines();
    if lines.next()? != LFS_HEADER {
        return None;
    }

    let mut oid = None;
    let mut size = None;
    for line in lines {
        if let Some(rest) = line.strip_prefix("oid sha256:") {
            oid = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("size ") {
            size = rest.trim().parse::<u64>().ok();
        }
    }

    Some(BlobBody::LfsPointer {
        oid: oid?,
        size: size?,
        pointer: text.to_string(),
    })
}

/// The content of one file at a revision.
pub struct ReadOperation;

impl TableOperation for ReadOperation {
    fn name(&self) -> &'static str {
        "git_read"
    }

    fn description(&self) -> &'static str {
        "File content at a revision, as text or blob"
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
        interrupt.check()?;
        let path = pathspec::normalize(&ctx.file_path)?;
        if path.is_empty() {
            return Err(GitsqlError::InvalidInput(format!(
                "identifier for repository '{}' does not name a file",
                ctx.repo_path()
            )));
        }

        let commit = repo.find_commit(ctx.commit_id()?)?;
        let tree = commit.tree()?;
        let entry = tree.get_path(Path::new(&path)).map_err(|_| GitsqlError::PathNotFound {
            path: path.clone(),
            revision: ctx.final_revision.clone(),
        })?;

        let repo_path = ctx.repo_path();
        let mode = entry.filemode();
        let mut row = vec![
            text(build_uri(&repo_path, &path, &ctx.final_revision)),
            text(repo_path),
            text(commit.id().to_string()),
            text(tree.id().to_string()),
            text(path.clone()),
            text(file_ext(&path)),
            text(ctx.final_revision.clone()),
            text(entry.id().to_string()),
            int(mode),
        ];

        let kind = match mode {
            MODE_BLOB | MODE_BLOB_EXECUTABLE => "file",
            MODE_LINK => "symlink",
            MODE_TREE => "tree",
            MODE_COMMIT => "submodule",
            other => {
                return Err(GitsqlError::UnsupportedOperation(format!(
                    "unsupported file mode {other:o} for '{path}'"
                )))
            }
        };

        if matches!(kind, "tree" | "submodule") {
            row.extend([
                text(kind),
                flag(false),
                text("unknown"),
                int(0),
                flag(false),
                Value::Null,
                Value::Null,
            ]);
            return Ok(vec![row]);
        }

        let blob = repo.inner().find_blob(entry.id())?;
        let content = blob.content();
        let limit = options
            .max_bytes
            .map_or(content.len(), |max| content.len().min(max as usize));
        let truncated = limit < content.len();
        let body = BlobBody::classify(&content[..limit], blob.is_binary(), truncated);

        let kind = if kind == "file" { body.kind() } else { kind };
        row.extend([
            text(kind),
            flag(body.is_text()),
            text(body.encoding()),
            int(content.len() as i64),
            flag(truncated),
        ]);
        match body {
            BlobBody::Text(s) => row.extend([text(s), Value::Null]),
            BlobBody::LfsPointer { pointer, .. } => row.extend([text(pointer), Value::Null]),
            BlobBody::Binary(bytes) => row.extend([Value::Null, Value::Blob(bytes)]),
        }
        Ok(vec![row])
    }
}
