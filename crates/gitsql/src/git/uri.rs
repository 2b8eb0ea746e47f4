//! Parsing of `git://` identifiers.
//!
//! ```text
//! identifier := [ "git://" ] locator [ "/" file-path ] [ "@" revision ]
//! ```
//!
//! Splitting off the revision is purely textual ([`split`]). Separating the
//! locator from the in-repository file path needs the filesystem and is done
//! by [`ParsedPath::parse`] through repository discovery.

use crate::error::{GitsqlError, Result};
use crate::git::discovery;
use std::path::PathBuf;

pub const GIT_SCHEME: &str = "git://";
pub const DEFAULT_REVISION: &str = "HEAD";

/// Returns true when `identifier` uses the `git://` scheme.
pub fn is_git_uri(identifier: &str) -> bool {
    identifier.starts_with(GIT_SCHEME)
}

/// Textual halves of an identifier: everything before the revision
/// separator, and the revision itself if one was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriParts {
    pub target: String,
    pub revision: Option<String>,
}

/// Splits an identifier into target and revision without touching the
/// filesystem.
///
/// The separator is the last `@` not directly followed by `{`, which keeps
/// reflog and date expressions such as `HEAD@{0}` or `main@{1.day.ago}` in
/// the revision. A `/suffix` after the revision (typically an appended glob)
/// moves back onto the target.
pub fn split(identifier: &str) -> Result<UriParts> {
    let body = identifier.strip_prefix(GIT_SCHEME).unwrap_or(identifier);

    let separator = body
        .match_indices('@')
        .map(|(i, _)| i)
        .filter(|&i| !body[i + 1..].starts_with('{'))
        .last();

    let (mut target, revision) = match separator {
        Some(at) => {
            let candidate = &body[at + 1..];
            let (revision, suffix) = match candidate.find('/') {
                Some(slash) => candidate.split_at(slash),
                None => (candidate, ""),
            };
            if revision.is_empty() {
                return Err(GitsqlError::MalformedIdentifier {
                    identifier: identifier.to_string(),
                    reason: "empty revision after '@'".to_string(),
                });
            }
            (
                format!("{}{}", &body[..at], suffix),
                Some(revision.to_string()),
            )
        }
        None => (body.to_string(), None),
    };

    let trimmed = target.trim_end_matches('/').len();
    target.truncate(trimmed);

    Ok(UriParts { target, revision })
}

/// A fully parsed identifier: discovered repository root, in-repository file
/// path and revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub locator: PathBuf,
    pub file_path: String,
    pub revision: String,
    /// Whether the identifier carried its own `@revision`.
    pub explicit_revision: bool,
}

impl ParsedPath {
    pub fn parse(identifier: &str) -> Result<Self> {
        let UriParts { target, revision } = split(identifier)?;
        match revision {
            Some(revision) => Self::locate(&target, revision, true),
            None => Self::locate(&target, DEFAULT_REVISION.to_string(), false),
        }
    }

    /// Parses a plain filesystem path. Nothing in it is read as a revision,
    /// so `@` and `/` keep their filesystem meaning.
    pub fn from_path(path: &str, revision: &str) -> Result<Self> {
        let target = path.trim_end_matches('/');
        let target = if target.is_empty() && !path.is_empty() {
            "/"
        } else {
            target
        };
        Self::locate(target, revision.to_string(), false)
    }

    fn locate(target: &str, revision: String, explicit_revision: bool) -> Result<Self> {
        if target.is_empty() {
            return Ok(Self {
                locator: PathBuf::from("."),
                file_path: String::new(),
                revision,
                explicit_revision,
            });
        }

        let (locator, file_path) = discovery::locate(target)?;
        Ok(Self {
            locator,
            file_path,
            revision,
            explicit_revision,
        })
    }
}

/// Builds `git://<repo>[/<file>]@<revision>`, trimming the slashes where
/// the two paths meet.
pub fn build_uri(repo_path: &str, file_path: &str, revision: &str) -> String {
    let repo = repo_path.trim_end_matches('/');
    let file = file_path.trim_start_matches('/');
    if file.is_empty() {
        format!("{GIT_SCHEME}{repo}@{revision}")
    } else {
        format!("{GIT_SCHEME}{repo}/{file}@{revision}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(s: &str) -> (String, Option<String>) {
        let p = split(s).expect("identifier should split");
        (p.target, p.revision)
    }

    #[test]
    fn plain_revision() {
        assert_eq!(parts("git://file.csv@HEAD"), ("file.csv".into(), Some("HEAD".into())));
        assert_eq!(parts("repo/a.txt@v1.0"), ("repo/a.txt".into(), Some("v1.0".into())));
    }

    #[test]
    fn reflog_braces_are_not_separators() {
        assert_eq!(
            parts("git://file.csv@HEAD@{0}"),
            ("file.csv".into(), Some("HEAD@{0}".into()))
        );
        assert_eq!(
            parts("git://repo@main@{1.day.ago}"),
            ("repo".into(), Some("main@{1.day.ago}".into()))
        );
    }

    #[test]
    fn glob_suffix_returns_to_target() {
        let (target, revision) = parts("git://file.csv@HEAD/**/*.csv");
        assert_eq!(revision.as_deref(), Some("HEAD"));
        assert!(target.ends_with("/**/*.csv"));
        assert_eq!(target, "file.csv/**/*.csv");
    }

    #[test]
    fn missing_revision_and_trailing_slashes() {
        assert_eq!(parts("git://some/dir///"), ("some/dir".into(), None));
        assert_eq!(parts("git://"), (String::new(), None));
        assert_eq!(parts("/abs/path"), ("/abs/path".into(), None));
    }

    #[test]
    fn last_plain_at_wins() {
        assert_eq!(
            parts("git://node_modules/@types/x.d.ts@abc123"),
            ("node_modules/@types/x.d.ts".into(), Some("abc123".into()))
        );
    }

    #[test]
    fn empty_revision_is_malformed() {
        for bad in ["git://repo@", "repo@/x"] {
            assert!(matches!(
                split(bad),
                Err(GitsqlError::MalformedIdentifier { .. })
            ));
        }
    }

    #[test]
    fn empty_target_uses_current_directory() {
        let parsed = ParsedPath::parse("git://@HEAD~1").unwrap();
        assert_eq!(parsed.locator, PathBuf::from("."));
        assert_eq!(parsed.file_path, "");
        assert_eq!(parsed.revision, "HEAD~1");
        assert!(parsed.explicit_revision);
    }

    #[test]
    fn build_uri_trims_joins() {
        assert_eq!(build_uri("/r/", "/a/b.txt", "HEAD"), "git:///r/a/b.txt@HEAD");
        assert_eq!(build_uri("/r", "", "abc"), "git:///r@abc");
    }
}
