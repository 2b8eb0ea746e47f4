//! gitsql CLI - SQL table functions over Git repositories

use anyhow::Context;
use clap::{CommandFactory, Parser};
use gitsql::cli::output::OutputWriter;
use gitsql::{get_table_info, tables, Args, Command, GitsqlError, SqlEngine};
use std::io;
use tracing_subscriber::EnvFilter;

const EXAMPLES: &[(&str, &str)] = &[
    (
        "Recent commits in the current repository",
        "SELECT commit_hash, author_name, message FROM git_log('.') LIMIT 10",
    ),
    (
        "History of one file",
        "SELECT commit_hash, author_date FROM git_log('src/main.rs')",
    ),
    (
        "Commits on another branch",
        "SELECT commit_hash, message FROM git_log('.', 'develop')",
    ),
    (
        "Largest files at HEAD",
        "SELECT file_path, size_bytes FROM git_tree('git://.@HEAD') WHERE kind = 'file' ORDER BY size_bytes DESC LIMIT 10",
    ),
    (
        "Files by extension",
        "SELECT file_ext, COUNT(*) AS files FROM git_tree('.') WHERE kind = 'file' GROUP BY file_ext ORDER BY files DESC",
    ),
    (
        "Read a file at an older revision",
        "SELECT text FROM git_read('git://README.md@HEAD~5')",
    ),
    (
        "Merge commits",
        "SELECT commit_hash, parent_count FROM git_log('.') WHERE parent_count > 1",
    ),
    (
        "Graph edges from every ref",
        "SELECT commit_hash, parent_hash, parent_index FROM git_parents('.', 'HEAD', 1)",
    ),
    (
        "Branches and their heads",
        "SELECT branch_name, commit_hash, is_current FROM git_branches('.')",
    ),
    (
        "Annotated tags",
        "SELECT tag_name, tagger_name, message FROM git_tags('.') WHERE is_annotated = 1",
    ),
    (
        "Last commit time of every repository in a CSV (gitsql --load repos=repos.csv ...)",
        "SELECT r.path, MAX(l.commit_date) AS last_commit FROM repos r, git_log_each(r.path) l GROUP BY r.path",
    ),
    (
        "README of each repository at its own revision",
        "SELECT r.path, c.size_bytes FROM repos r, git_read_each(git_uri(r.path, 'README.md', r.rev)) c",
    ),
];

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose || std::env::var_os("RUST_LOG").is_some() {
        let filter = if args.verbose {
            EnvFilter::new("gitsql=debug")
        } else {
            EnvFilter::from_default_env()
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    let stdout = io::stdout();
    let mut out = OutputWriter::new(stdout.lock(), args.format, !args.no_header);

    match &args.command {
        Some(Command::Tables) => {
            out.write_tables(&tables())?;
            return Ok(());
        }
        Some(Command::Schema { table }) => {
            let info = get_table_info(table)
                .ok_or_else(|| GitsqlError::TableNotFound(table.clone()))?;
            out.write_schema(&info)?;
            return Ok(());
        }
        Some(Command::Examples) => {
            for (description, sql) in EXAMPLES {
                out.writeln(&format!("-- {description}\n{sql};\n"))?;
            }
            return Ok(());
        }
        None => {}
    }

    let Some(query) = args.query.as_deref() else {
        Args::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut engine = SqlEngine::with_config(args.config()?)?;
    for (name, path) in args.csv_tables()? {
        engine
            .load_csv(&name, &path)
            .with_context(|| format!("failed to load {}", path.display()))?;
    }

    let result = engine.execute(query)?;
    tracing::debug!(rows = result.row_count(), "query finished");
    out.write_result(&result)?;

    Ok(())
}
