//! Error types for gitsql.

use thiserror::Error;

/// Result type used throughout gitsql.
pub type Result<T> = std::result::Result<T, GitsqlError>;

/// Errors raised while resolving identifiers, reading repositories, or
/// executing queries.
#[derive(Error, Debug)]
pub enum GitsqlError {
    #[error("malformed identifier '{identifier}': {reason}")]
    MalformedIdentifier { identifier: String, reason: String },

    #[error("no repository found, searched from {searched_from}")]
    RepositoryNotFound { searched_from: String },

    /// The revision did not name an object. The message is fixed so every
    /// table function reports the same text.
    #[error("unable to parse OID")]
    UnresolvableRevision { revision: String },

    #[error("failed to resolve revision '{revision}' in repository '{root}': {message}")]
    RevisionLookup {
        root: String,
        revision: String,
        message: String,
    },

    #[error("failed to open repository '{root}': {source}")]
    OpenRepository {
        root: String,
        #[source]
        source: git2::Error,
    },

    #[error("object store error: {0}")]
    ObjectStore(#[from] git2::Error),

    #[error("path '{path}' not found at revision '{revision}'")]
    PathNotFound { path: String, revision: String },

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("scan cancelled")]
    Cancelled,

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("{operation}: {source}")]
    Operation {
        operation: &'static str,
        #[source]
        source: Box<GitsqlError>,
    },

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GitsqlError {
    /// Wraps the error with the name of the table function that raised it.
    ///
    /// Already-wrapped errors keep their original operation name.
    pub fn in_operation(self, operation: &'static str) -> Self {
        match self {
            GitsqlError::Operation { .. } => self,
            other => GitsqlError::Operation {
                operation,
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, looking through operation wrappers.
    pub fn root_cause(&self) -> &GitsqlError {
        match self {
            GitsqlError::Operation { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether a lateral scan may skip the offending input row and continue.
    ///
    /// Cancellation and engine-level failures always end the scan.
    pub fn is_row_local(&self) -> bool {
        !matches!(
            self.root_cause(),
            GitsqlError::Cancelled
                | GitsqlError::Config(_)
                | GitsqlError::Sql(_)
                | GitsqlError::TableNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_prefix_wraps_once() {
        let err = GitsqlError::UnresolvableRevision {
            revision: "nope".into(),
        }
        .in_operation("git_log")
        .in_operation("git_tree");

        assert_eq!(err.to_string(), "git_log: unable to parse OID");
    }

    #[test]
    fn cancellation_is_not_row_local() {
        assert!(!GitsqlError::Cancelled.in_operation("git_log").is_row_local());
        assert!(GitsqlError::RepositoryNotFound {
            searched_from: "/tmp".into()
        }
        .is_row_local());
    }
}
