//! SQLite table-valued function adapter.
//!
//! Each [`TableFunction`] is registered as an eponymous virtual table whose
//! hidden columns are its arguments:
//!
//! ```sql
//! SELECT * FROM git_log('/path/to/repo', 'main');
//! SELECT r.name, l.* FROM repos r, git_log_each(r.path) l;
//! ```
//!
//! SQLite re-filters the inner cursor once per outer row of a lateral join,
//! so one cursor drives one [`LateralScan`](crate::scan::LateralScan) across
//! the whole join and its repository slot survives between rows.

use crate::error::GitsqlError;
use crate::git::Git2Opener;
use crate::providers::TableOperation;
use crate::scan::{
    BindArgs, CallMode, InputRow, LocalState, PullStatus, Row, ScanOptions, TableFunction,
};
use rusqlite::types::Value;
use rusqlite::vtab::{
    eponymous_only_module, Context, IndexConstraintOp, IndexInfo, VTab, VTabConnection,
    VTabCursor, Values,
};
use rusqlite::{ffi, Connection, Error as SqlError};
use std::marker::PhantomData;
use std::os::raw::c_int;
use std::sync::Arc;

const IDENTIFIER: usize = 0;
const REVISION: usize = 1;

/// Registers `function` under its SQL name.
pub fn register(conn: &Connection, function: TableFunction) -> rusqlite::Result<()> {
    let name = function.name();
    tracing::trace!(function = %name, "registering table function");
    conn.create_module(name.as_str(), eponymous_only_module::<GitTable>(), Some(Arc::new(function)))
}

/// Names of the hidden argument columns, in argument order.
pub fn argument_names(operation: &dyn TableOperation) -> Vec<&'static str> {
    let mut names = vec!["identifier", "revision"];
    names.extend(operation.options().iter().map(|o| o.name));
    names
}

fn declare_sql(operation: &dyn TableOperation) -> String {
    let visible = operation
        .columns()
        .iter()
        .map(|c| format!("\"{}\" {}", c.name, c.sql_type));
    let hidden = argument_names(operation)
        .into_iter()
        .map(|name| format!("\"{name}\" HIDDEN"));
    format!(
        "CREATE TABLE x({})",
        visible.chain(hidden).collect::<Vec<_>>().join(", ")
    )
}

fn to_sql_error(err: GitsqlError) -> SqlError {
    match err {
        GitsqlError::Sql(inner) => inner,
        other => SqlError::ModuleError(other.to_string()),
    }
}

#[repr(C)]
pub struct GitTable {
    base: ffi::sqlite3_vtab,
    function: Arc<TableFunction>,
}

unsafe impl<'vtab> VTab<'vtab> for GitTable {
    type Aux = Arc<TableFunction>;
    type Cursor = GitTableCursor<'vtab>;

    fn connect(
        _db: &mut VTabConnection,
        aux: Option<&Self::Aux>,
        _args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let function = aux
            .cloned()
            .ok_or_else(|| SqlError::ModuleError("table function not registered".to_string()))?;
        let sql = declare_sql(function.operation());
        Ok((
            sql,
            GitTable {
                base: ffi::sqlite3_vtab::default(),
                function,
            },
        ))
    }

    fn best_index(&self, info: &mut IndexInfo) -> rusqlite::Result<()> {
        let operation = self.function.operation();
        let visible = operation.columns().len();
        let hidden = argument_names(operation).len();

        let mut usable: Vec<Option<usize>> = vec![None; hidden];
        let mut unusable_mask = 0;
        for (i, constraint) in info.constraints().enumerate() {
            let Ok(column) = usize::try_from(constraint.column()) else {
                continue;
            };
            if column < visible || column >= visible + hidden {
                continue;
            }
            if constraint.operator() != IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_EQ {
                continue;
            }
            let arg = column - visible;
            if constraint.is_usable() {
                usable[arg] = Some(i);
            } else {
                unusable_mask |= 1 << arg;
            }
        }

        let mut idx_num: c_int = 0;
        let mut argv_index = 0;
        for (arg, constraint) in usable.iter().enumerate() {
            if let Some(i) = constraint {
                argv_index += 1;
                idx_num |= 1 << arg;
                let mut usage = info.constraint_usage(*i);
                usage.set_argv_index(argv_index);
                usage.set_omit(true);
            }
        }

        // An argument fed from a table that is not yet available: reject the
        // plan so SQLite puts the driving table first.
        if unusable_mask & !idx_num != 0 {
            return Err(SqlError::SqliteFailure(
                ffi::Error::new(ffi::SQLITE_CONSTRAINT),
                None,
            ));
        }

        info.set_idx_num(idx_num);
        info.set_estimated_cost(if idx_num & (1 << IDENTIFIER) != 0 {
            100.0
        } else {
            1_000_000.0
        });
        Ok(())
    }

    fn open(&'vtab mut self) -> rusqlite::Result<GitTableCursor<'vtab>> {
        Ok(GitTableCursor::new(Arc::clone(&self.function)))
    }
}

#[repr(C)]
pub struct GitTableCursor<'vtab> {
    base: ffi::sqlite3_vtab_cursor,
    function: Arc<TableFunction>,
    state: Option<LocalState<Git2Opener>>,
    bound_options: Option<ScanOptions>,
    input: Vec<InputRow>,
    args: Vec<Value>,
    batch: Vec<Row>,
    pos: usize,
    exhausted: bool,
    row_id: i64,
    phantom: PhantomData<&'vtab GitTable>,
}

impl GitTableCursor<'_> {
    fn new(function: Arc<TableFunction>) -> Self {
        Self {
            base: ffi::sqlite3_vtab_cursor::default(),
            function,
            state: None,
            bound_options: None,
            input: Vec::new(),
            args: Vec::new(),
            batch: Vec::new(),
            pos: 0,
            exhausted: true,
            row_id: 0,
            phantom: PhantomData,
        }
    }

    fn parse_args(&mut self, idx_num: c_int, values: &Values<'_>) -> rusqlite::Result<BindArgs> {
        let names = argument_names(self.function.operation());
        let mut next = 0;
        self.args = names
            .iter()
            .enumerate()
            .map(|(arg, _)| {
                if idx_num & (1 << arg) == 0 {
                    return Ok(Value::Null);
                }
                let value = values.get::<Value>(next);
                next += 1;
                value
            })
            .collect::<rusqlite::Result<_>>()?;

        let mut options = ScanOptions::default();
        for (name, value) in names.iter().zip(&self.args).skip(REVISION + 1) {
            match *name {
                "max_bytes" => options.max_bytes = as_positive_int(value),
                "all_refs" => options.all_refs = as_flag(value),
                _ => {}
            }
        }

        Ok(BindArgs {
            identifier: as_text(&self.args[IDENTIFIER]),
            revision: as_text(&self.args[REVISION]),
            options,
        })
    }

    /// Pulls until at least one row is buffered or the scan ends.
    fn fill(&mut self) -> rusqlite::Result<()> {
        self.batch.clear();
        self.pos = 0;
        let Some(state) = self.state.as_mut() else {
            self.exhausted = true;
            return Ok(());
        };

        while self.batch.is_empty() && !self.exhausted {
            let status = self
                .function
                .pull(state, &self.input, &mut self.batch)
                .map_err(to_sql_error)?;
            if status != PullStatus::MoreOutput {
                self.exhausted = true;
            }
        }
        Ok(())
    }
}

unsafe impl VTabCursor for GitTableCursor<'_> {
    fn filter(&mut self, idx_num: c_int, _idx_str: Option<&str>, args: &Values<'_>) -> rusqlite::Result<()> {
        let bind_args = self.parse_args(idx_num, args)?;
        self.row_id = 0;
        self.exhausted = false;
        self.input = vec![InputRow {
            identifier: bind_args.identifier.clone(),
            revision: bind_args.revision.clone(),
        }];

        let reusable = self.bound_options.as_ref() == Some(&bind_args.options);
        match self.state.as_mut() {
            Some(LocalState::Lateral(scan)) if reusable => scan.reset_input(),
            _ => {
                self.state = None;
                self.bound_options = None;
                let options = bind_args.options.clone();
                let bind_args = match self.function.mode() {
                    CallMode::Single => bind_args,
                    CallMode::Lateral => BindArgs {
                        options: bind_args.options,
                        ..BindArgs::default()
                    },
                };
                let bound = self.function.bind(bind_args).map_err(to_sql_error)?;
                let global = self.function.init_global(&bound);
                tracing::trace!(
                    function = %self.function.name(),
                    max_threads = global.max_threads,
                    batch_size = global.batch_size,
                    "scan bound"
                );
                self.state = Some(self.function.init_local(&bound).map_err(to_sql_error)?);
                self.bound_options = Some(options);
            }
        }
        self.fill()
    }

    fn next(&mut self) -> rusqlite::Result<()> {
        self.pos += 1;
        self.row_id += 1;
        if self.pos >= self.batch.len() {
            self.fill()?;
        }
        Ok(())
    }

    fn eof(&self) -> bool {
        self.pos >= self.batch.len()
    }

    fn column(&self, ctx: &mut Context, i: c_int) -> rusqlite::Result<()> {
        let i = usize::try_from(i).map_err(|_| SqlError::ModuleError(format!("invalid column {i}")))?;
        let row = self
            .batch
            .get(self.pos)
            .ok_or_else(|| SqlError::ModuleError("cursor is past the last row".to_string()))?;
        match row.get(i) {
            Some(value) => ctx.set_result(value),
            None => ctx.set_result(self.args.get(i - row.len()).unwrap_or(&Value::Null)),
        }
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        Ok(self.row_id)
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_positive_int(value: &Value) -> Option<u64> {
    match value {
        Value::Integer(n) if *n > 0 => Some(*n as u64),
        Value::Text(s) => s.trim().parse::<u64>().ok().filter(|n| *n > 0),
        _ => None,
    }
}

fn as_flag(value: &Value) -> bool {
    match value {
        Value::Integer(n) => *n != 0,
        Value::Text(s) => matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    }
}
