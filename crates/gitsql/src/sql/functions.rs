//! Scalar SQL functions.

use crate::git::uri::build_uri;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Registers `git_uri(repo_path, file_path, ref)`.
///
/// Any NULL argument yields NULL.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "git_uri",
        3,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let repo: Option<String> = ctx.get(0)?;
            let file: Option<String> = ctx.get(1)?;
            let revision: Option<String> = ctx.get(2)?;
            Ok(match (repo, file, revision) {
                (Some(repo), Some(file), Some(revision)) => Some(build_uri(&repo, &file, &revision)),
                _ => None,
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(sql: &str) -> Option<String> {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn builds_uris() {
        assert_eq!(
            eval("SELECT git_uri('/repo/', '/src/main.rs', 'HEAD')").as_deref(),
            Some("git:///repo/src/main.rs@HEAD")
        );
        assert_eq!(
            eval("SELECT git_uri('/repo', '', 'v1')").as_deref(),
            Some("git:///repo@v1")
        );
    }

    #[test]
    fn null_in_null_out() {
        assert_eq!(eval("SELECT git_uri(NULL, 'a', 'HEAD')"), None);
        assert_eq!(eval("SELECT git_uri('/r', NULL, 'HEAD')"), None);
        assert_eq!(eval("SELECT git_uri('/r', 'a', NULL)"), None);
    }
}
