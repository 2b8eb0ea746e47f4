//! Command-line interface definitions.

pub mod output;

use crate::config::{Config, DEFAULT_BATCH_SIZE};
use crate::error::{GitsqlError, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const AFTER_HELP: &str = r#"TABLE FUNCTIONS:
  git_log(identifier, revision)        Commits (filtered to a file when the identifier names one)
  git_branches(identifier)             Local and remote branches
  git_tags(identifier)                 Tags, annotated or lightweight
  git_tree(identifier, revision)       Files and directories at a revision
  git_parents(identifier, revision)    Commit graph edges (all_refs = 1 for every ref)
  git_read(identifier, revision)       File content (max_bytes to truncate)

  Every function has an _each variant for lateral joins:
    gitsql --load repos=repos.csv "SELECT r.name, l.* FROM repos r, git_log_each(r.path) l"

IDENTIFIERS:
  /path/to/repo                        A repository, at the default revision
  /path/to/repo/src/main.rs            A file inside a repository
  git://path/to/repo/file.txt@v1.0     A file at a revision
  git://.@HEAD~3                       The current repository, three commits back"#;

/// Command-line arguments for gitsql.
#[derive(Parser, Debug)]
#[command(name = "gitsql")]
#[command(author, version)]
#[command(about = "SQL table functions over Git repositories")]
#[command(after_help = AFTER_HELP)]
pub struct Args {
    /// SQL query to execute
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Omit the header row (table and csv output)
    #[arg(short = 'H', long, global = true)]
    pub no_header: bool,

    /// Load a CSV file as a table: NAME=FILE (repeatable)
    #[arg(short, long, value_name = "NAME=FILE")]
    pub load: Vec<String>,

    /// Revision used when an identifier names none
    #[arg(long, env = "GITSQL_DEFAULT_REF", default_value = "HEAD")]
    pub default_ref: String,

    /// Rows emitted per scan batch
    #[arg(long, env = "GITSQL_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Default truncation for git_read content, in bytes
    #[arg(long, env = "GITSQL_MAX_BYTES")]
    pub max_bytes: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    pub fn config(&self) -> Result<Config> {
        Config::new(self.default_ref.clone(), self.batch_size, self.max_bytes)
    }

    /// Parses the `--load` arguments into table names and file paths.
    pub fn csv_tables(&self) -> Result<Vec<(String, PathBuf)>> {
        self.load
            .iter()
            .map(|spec| match spec.split_once('=') {
                Some((name, path)) if !name.is_empty() && !path.is_empty() => {
                    Ok((name.to_string(), PathBuf::from(path)))
                }
                _ => Err(GitsqlError::InvalidInput(format!(
                    "expected NAME=FILE, got '{spec}'"
                ))),
            })
            .collect()
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List available table functions
    Tables,

    /// Show columns and arguments of a table function
    Schema {
        /// Table function name
        table: String,
    },

    /// Show example queries
    Examples,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Jsonl,
    Csv,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_load_specs() {
        let args = Args::parse_from(["gitsql", "--load", "repos=a.csv", "-l", "b=dir/b.csv", "SELECT 1"]);
        let tables = args.csv_tables().unwrap();
        assert_eq!(tables[0], ("repos".to_string(), PathBuf::from("a.csv")));
        assert_eq!(tables[1], ("b".to_string(), PathBuf::from("dir/b.csv")));
        assert_eq!(args.query.as_deref(), Some("SELECT 1"));

        let bad = Args::parse_from(["gitsql", "--load", "nofile"]);
        assert!(bad.csv_tables().is_err());
    }

    #[test]
    fn config_flags() {
        let args = Args::parse_from([
            "gitsql",
            "--default-ref",
            "main",
            "--batch-size",
            "16",
            "--max-bytes",
            "100",
        ]);
        let config = args.config().unwrap();
        assert_eq!(config.default_revision, "main");
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.max_bytes, Some(100));

        let zero = Args::parse_from(["gitsql", "--batch-size", "0"]);
        assert!(zero.config().is_err());
    }
}
