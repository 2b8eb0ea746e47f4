//! Catalogue of the registered table functions.

use crate::providers::{all_operations, ColumnDef};
use crate::scan::CallMode;
use crate::sql::vtab::argument_names;
use serde::Serialize;

/// Schema information for one SQL table function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub description: &'static str,
    pub mode: CallMode,
    pub columns: &'static [ColumnDef],
    /// Hidden argument columns, in call order.
    pub arguments: Vec<&'static str>,
}

impl TableInfo {
    /// Signature as written in a query, e.g. `git_read(identifier, revision, max_bytes)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.arguments.join(", "))
    }
}

/// Every table function, single-target variant first.
pub fn tables() -> Vec<TableInfo> {
    all_operations()
        .iter()
        .flat_map(|op| {
            [CallMode::Single, CallMode::Lateral].map(|mode| TableInfo {
                name: mode.function_name(op.name()),
                description: op.description(),
                mode,
                columns: op.columns(),
                arguments: argument_names(op.as_ref()),
            })
        })
        .collect()
}

pub fn get_table_info(name: &str) -> Option<TableInfo> {
    tables().into_iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_has_both_variants() {
        let names: Vec<_> = tables().into_iter().map(|t| t.name).collect();
        for base in ["git_log", "git_branches", "git_tags", "git_tree", "git_parents", "git_read"] {
            assert!(names.contains(&base.to_string()), "{base}");
            assert!(names.contains(&format!("{base}_each")), "{base}_each");
        }
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let info = get_table_info("GIT_READ_EACH").unwrap();
        assert_eq!(info.mode, CallMode::Lateral);
        assert_eq!(info.signature(), "git_read_each(identifier, revision, max_bytes)");
        assert!(get_table_info("commits").is_none());
    }
}
