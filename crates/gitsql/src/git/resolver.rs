//! Identifier resolution: parse, discover, validate.
//!
//! Every table function funnels its identifier through
//! [`ContextResolver::resolve`], so URI handling, repository discovery and
//! revision validation behave (and fail) identically across operations.

use crate::error::{GitsqlError, Result};
use crate::git::discovery;
use crate::git::uri::{self, ParsedPath};
use git2::{ErrorCode, ObjectType, Oid, Repository, RepositoryOpenFlags};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// The validated object a revision names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionObject {
    pub id: Oid,
    pub kind: Option<ObjectType>,
    /// The commit the object peels to, if any (tags peel, blobs do not).
    pub commit: Option<Oid>,
}

/// Outcome of resolving one identifier. Owned by the caller, never shared
/// between rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    pub repository_root: PathBuf,
    pub file_path: String,
    pub final_revision: String,
    pub revision: RevisionObject,
}

impl ResolvedContext {
    /// Repository root as reported in `repo_path` columns.
    pub fn repo_path(&self) -> String {
        self.repository_root.display().to_string()
    }

    /// The commit the revision peels to.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` when the revision names a tree or blob.
    pub fn commit_id(&self) -> Result<Oid> {
        self.revision.commit.ok_or_else(|| {
            GitsqlError::UnsupportedOperation(format!(
                "revision '{}' does not point to a commit",
                self.final_revision
            ))
        })
    }
}

/// Resolves identifiers into [`ResolvedContext`]s.
///
/// The resolver holds no repository handles; validation opens a temporary
/// handle per call and closes it before returning.
#[derive(Debug, Clone, Default)]
pub struct ContextResolver {
    _private: (),
}

impl ContextResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `identifier` (a filesystem path or `git://` URI).
    ///
    /// `fallback_revision` applies when the identifier has no `@revision`
    /// of its own.
    pub fn resolve(&self, identifier: &str, fallback_revision: &str) -> Result<ResolvedContext> {
        let parsed = if uri::is_git_uri(identifier) {
            ParsedPath::parse(identifier)?
        } else {
            ParsedPath::from_path(identifier, fallback_revision)?
        };

        let repository_root = discovery::discover(&parsed.locator)?;
        let final_revision = if parsed.explicit_revision {
            parsed.revision
        } else {
            fallback_revision.to_string()
        };

        let revision = validate_revision(&repository_root, &final_revision)?;
        tracing::debug!(
            identifier,
            root = %repository_root.display(),
            revision = %final_revision,
            oid = %revision.id,
            "resolved identifier"
        );

        Ok(ResolvedContext {
            repository_root,
            file_path: parsed.file_path,
            final_revision,
            revision,
        })
    }
}

/// Opens `root` briefly and resolves `revision` against it.
fn validate_revision(root: &Path, revision: &str) -> Result<RevisionObject> {
    let resolved = {
        let repo = Repository::open_ext(
            root,
            RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&OsStr>(),
        )
        .map_err(|source| GitsqlError::OpenRepository {
            root: root.display().to_string(),
            source,
        })?;

        let outcome = repo.revparse_single(revision).map(|object| {
            let commit = object.peel_to_commit().ok().map(|c| c.id());
            RevisionObject {
                id: object.id(),
                kind: object.kind(),
                commit,
            }
        });
        outcome
    };

    resolved.map_err(|e| normalize_revision_error(root, revision, e))
}

/// Folds the many ways libgit2 reports an unknown revision into one error.
pub(crate) fn normalize_revision_error(root: &Path, revision: &str, err: git2::Error) -> GitsqlError {
    let message = err.message().to_ascii_lowercase();
    let unparseable = matches!(
        err.code(),
        ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::Ambiguous
    ) || message.contains("unable to parse")
        || message.contains("invalid characters")
        || message.contains("not found");

    if unparseable {
        GitsqlError::UnresolvableRevision {
            revision: revision.to_string(),
        }
    } else {
        GitsqlError::RevisionLookup {
            root: root.display().to_string(),
            revision: revision.to_string(),
            message: err.message().to_string(),
        }
    }
}
