//! SQL query engine over Git repositories.

use crate::config::Config;
use crate::error::{GitsqlError, Result};
use crate::providers::all_operations;
use crate::scan::{CallMode, TableFunction};
use crate::session::Session;
use crate::sql::functions::register_functions;
use crate::sql::vtab;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, InterruptHandle, Row};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// The SQL query engine that executes queries against Git repositories.
///
/// `SqlEngine` wraps an in-memory SQLite database with every `git_*` table
/// function and the `git_uri` scalar registered. CSV files can be loaded as
/// ordinary tables to drive lateral lookups.
///
/// # Example
///
/// ```no_run
/// use gitsql::SqlEngine;
///
/// let engine = SqlEngine::new()?;
/// let result = engine.execute("SELECT commit_hash, message FROM git_log('.') LIMIT 10")?;
/// println!("Columns: {:?}", result.columns);
/// # Ok::<(), gitsql::GitsqlError>(())
/// ```
pub struct SqlEngine {
    conn: Connection,
    session: Arc<Session>,
    loaded_tables: BTreeSet<String>,
}

impl SqlEngine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        Self::with_session(Arc::new(Session::new(config)))
    }

    /// Creates an engine whose table functions share `session`.
    pub fn with_session(session: Arc<Session>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        register_functions(&conn)?;
        for operation in all_operations() {
            for mode in [CallMode::Single, CallMode::Lateral] {
                let function = TableFunction::for_session(Arc::clone(&operation), mode, &session);
                vtab::register(&conn, function)?;
            }
        }
        tracing::debug!(config = ?session.config(), "sql engine ready");

        Ok(Self {
            conn,
            session,
            loaded_tables: BTreeSet::new(),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Loads a CSV file (with a header row) into a table named `name`.
    ///
    /// Integer and real cells are stored as numbers, everything else as
    /// text. Returns the number of rows loaded.
    pub fn load_csv<P: AsRef<Path>>(&mut self, name: &str, path: P) -> Result<usize> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(GitsqlError::InvalidInput(format!(
                "table name must be alphanumeric: {name}"
            )));
        }
        if self.loaded_tables.contains(name) || name.starts_with("git_") {
            return Err(GitsqlError::InvalidInput(format!(
                "table '{name}' already exists"
            )));
        }

        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(GitsqlError::InvalidInput(format!(
                "CSV file has no header row: {}",
                path.as_ref().display()
            )));
        }

        let columns = headers
            .iter()
            .map(|h| format!("\"{}\"", h.replace('"', "\"\"")))
            .collect::<Vec<_>>();
        let placeholders = vec!["?"; headers.len()].join(", ");

        let tx = self.conn.transaction()?;
        tx.execute(&format!("CREATE TABLE \"{name}\" ({})", columns.join(", ")), [])?;
        let mut count = 0;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO \"{name}\" ({}) VALUES ({placeholders})",
                columns.join(", ")
            ))?;
            for record in reader.records() {
                let record = record?;
                let values = (0..headers.len()).map(|i| record.get(i).map_or(SqlValue::Null, typed_cell));
                insert.execute(params_from_iter(values))?;
                count += 1;
            }
        }
        tx.commit()?;

        tracing::debug!(table = name, rows = count, "loaded csv");
        self.loaded_tables.insert(name.to_string());
        Ok(count)
    }

    /// Names of the tables loaded with [`SqlEngine::load_csv`].
    pub fn loaded_tables(&self) -> impl Iterator<Item = &str> {
        self.loaded_tables.iter().map(String::as_str)
    }

    /// Executes a read-only SQL query and returns the results.
    ///
    /// Statements that would modify the database are rejected with
    /// `UnsupportedOperation`.
    pub fn execute(&self, query: &str) -> Result<QueryResult> {
        self.session.interrupt().reset();
        let mut stmt = self.conn.prepare(query)?;
        if !stmt.readonly() {
            return Err(GitsqlError::UnsupportedOperation(
                "write statements are not supported".to_string(),
            ));
        }

        let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let rows: Vec<Vec<Value>> = stmt
            .query_map([], |row| row_to_values(row, column_names.len()))?
            .collect::<rusqlite::Result<_>>()?;

        Ok(QueryResult {
            columns: column_names,
            rows,
        })
    }

    /// Cancels running scans.
    pub fn interrupt_handle(&self) -> EngineInterrupt {
        EngineInterrupt {
            session: Arc::clone(&self.session),
            sqlite: self.conn.get_interrupt_handle(),
        }
    }
}

/// Cancels the queries of one engine from another thread.
pub struct EngineInterrupt {
    session: Arc<Session>,
    sqlite: InterruptHandle,
}

impl EngineInterrupt {
    pub fn interrupt(&self) {
        self.session.interrupt().trigger();
        self.sqlite.interrupt();
    }
}

fn typed_cell(cell: &str) -> SqlValue {
    if let Ok(n) = cell.parse::<i64>() {
        SqlValue::Integer(n)
    } else if let Ok(f) = cell.parse::<f64>() {
        SqlValue::Real(f)
    } else {
        SqlValue::Text(cell.to_string())
    }
}

fn row_to_values(row: &Row, col_count: usize) -> rusqlite::Result<Vec<Value>> {
    (0..col_count)
        .map(|i| {
            Ok(match row.get_ref(i)? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(n) => Value::Number(n.into()),
                ValueRef::Real(f) => serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(f.to_string())),
                ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
                ValueRef::Blob(bytes) => Value::String(hex(bytes)),
            })
        })
        .collect()
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// The result of a SQL query execution.
#[derive(Debug)]
pub struct QueryResult {
    /// Column names from the query.
    pub columns: Vec<String>,
    /// Row data as JSON values. Blobs are rendered as lowercase hex.
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Returns true if the result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Converts the result to a JSON array of objects.
    ///
    /// Each row becomes a JSON object with column names as keys.
    pub fn to_json_array(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for (i, col) in self.columns.iter().enumerate() {
                    obj.insert(col.clone(), row.get(i).cloned().unwrap_or(Value::Null));
                }
                Value::Object(obj)
            })
            .collect()
    }
}
