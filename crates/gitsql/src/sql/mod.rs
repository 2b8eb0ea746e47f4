//! SQL surface: engine, table-function adapter, scalar functions and schema.

pub mod engine;
pub mod functions;
pub mod schema;
pub mod vtab;

pub use engine::{EngineInterrupt, QueryResult, SqlEngine};
pub use schema::{get_table_info, tables, TableInfo};
