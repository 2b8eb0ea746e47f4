//! # gitsql
//!
//! Query Git repositories using SQL.
//!
//! gitsql registers table-valued functions over Git history and content in
//! an embedded SQLite database. Each function takes an identifier (a
//! filesystem path or a `git://` URI with an optional `@revision`) and comes
//! in two forms: a single-target form that fails loudly, and an `_each` form
//! for lateral joins that resolves every input row independently and skips
//! the rows it cannot resolve.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gitsql::{Result, SqlEngine};
//!
//! fn main() -> Result<()> {
//!     let engine = SqlEngine::new()?;
//!     let result = engine.execute(
//!         "SELECT file_path, size_bytes FROM git_tree('git://.@HEAD') WHERE kind = 'file'",
//!     )?;
//!
//!     println!("Found {} files", result.row_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Table functions
//!
//! - `git_log`: commits reachable from a revision, optionally filtered to a path
//! - `git_branches`, `git_tags`: references
//! - `git_tree`: recursive tree listing
//! - `git_parents`: commit graph edges
//! - `git_read`: file content as text or blob
//!
//! Each has an `_each` variant. See [`tables`] for column details.

pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod providers;
pub mod scan;
pub mod session;
pub mod sql;

pub use cli::{Args, Command, OutputFormat};
pub use config::Config;
pub use error::{GitsqlError, Result};
pub use git::GitRepo;
pub use session::Session;
pub use sql::{get_table_info, tables, QueryResult, SqlEngine, TableInfo};
