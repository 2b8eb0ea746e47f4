//! The pull protocol shared by every table operation.
//!
//! A scan is driven by repeated `pull` calls. Each call appends at most one
//! batch of rows and reports whether more output is pending, whether the
//! scan needs the next chunk of input rows, or whether it is finished.

pub mod function;
pub mod lateral;
pub mod single;

pub use function::{BindArgs, Bound, GlobalState, LocalState, TableFunction};
pub use lateral::LateralScan;
pub use single::SingleScan;

use crate::error::{GitsqlError, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One output row, in the operation's column order.
pub type Row = Vec<rusqlite::types::Value>;

/// Outcome of one pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStatus {
    /// Call again with the same input.
    MoreOutput,
    /// The current input chunk is consumed.
    NeedMoreInput,
    /// Nothing left to produce.
    Done,
}

/// One row of the driving table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRow {
    pub identifier: Option<String>,
    pub revision: Option<String>,
}

impl InputRow {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: Some(identifier.into()),
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

/// How a table function was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    /// One identifier bound up front. Every error propagates.
    Single,
    /// One identifier per input row. Rows that fail to resolve are skipped.
    Lateral,
}

impl CallMode {
    /// Registered name for `operation` in this mode.
    pub fn function_name(self, operation: &str) -> String {
        match self {
            CallMode::Single => operation.to_string(),
            CallMode::Lateral => format!("{operation}_each"),
        }
    }
}

/// Operation-specific arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Truncate blob content past this many bytes.
    pub max_bytes: Option<u64>,
    /// Walk history from every reference instead of one revision.
    pub all_refs: bool,
}

/// A cancellation flag shared by a session and all of its scans.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fails with `Cancelled` once the flag is set.
    pub fn check(&self) -> Result<()> {
        if self.is_triggered() {
            Err(GitsqlError::Cancelled)
        } else {
            Ok(())
        }
    }
}
