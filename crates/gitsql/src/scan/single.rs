//! Single-target scans.

use crate::error::Result;
use crate::git::cache::lock_handle;
use crate::git::{GitRepo, RepositoryOpener, ResolvedContext, SharedRepoCache};
use crate::providers::TableOperation;
use crate::scan::{Interrupt, PullStatus, Row, ScanOptions};
use std::borrow::Borrow;
use std::collections::VecDeque;
use std::sync::Arc;

/// Scan state for a table function bound to one identifier.
///
/// Rows are produced on the first pull from a handle in the session's
/// shared cache. Every failure propagates, prefixed with the operation name.
pub struct SingleScan<O: RepositoryOpener> {
    operation: Arc<dyn TableOperation>,
    context: ResolvedContext,
    options: ScanOptions,
    batch_size: usize,
    interrupt: Interrupt,
    repos: Arc<SharedRepoCache<O>>,
    rows: Option<VecDeque<Row>>,
}

impl<O> SingleScan<O>
where
    O: RepositoryOpener,
    O::Handle: Borrow<GitRepo>,
{
    pub fn new(
        operation: Arc<dyn TableOperation>,
        context: ResolvedContext,
        options: ScanOptions,
        batch_size: usize,
        interrupt: Interrupt,
        repos: Arc<SharedRepoCache<O>>,
    ) -> Self {
        Self {
            operation,
            context,
            options,
            batch_size: batch_size.max(1),
            interrupt,
            repos,
            rows: None,
        }
    }

    /// Appends the next batch to `out`. Reports `Done` with the final batch.
    pub fn pull(&mut self, out: &mut Vec<Row>) -> Result<PullStatus> {
        let name = self.operation.name();
        if self.rows.is_none() {
            let produced = self.produce().map_err(|e| e.in_operation(name))?;
            self.rows = Some(produced.into());
        }

        self.interrupt.check().map_err(|e| e.in_operation(name))?;
        let rows = self.rows.get_or_insert_with(VecDeque::new);
        let take = self.batch_size.min(rows.len());
        out.extend(rows.drain(..take));

        if rows.is_empty() {
            Ok(PullStatus::Done)
        } else {
            Ok(PullStatus::MoreOutput)
        }
    }

    fn produce(&self) -> Result<Vec<Row>> {
        self.interrupt.check()?;
        let handle = self.repos.get_or_open(&self.context.repository_root)?;
        let guard = lock_handle(&handle);
        let repo: &GitRepo = (*guard).borrow();
        tracing::debug!(
            operation = self.operation.name(),
            root = %repo.path(),
            revision = %self.context.final_revision,
            "producing rows"
        );
        self.operation
            .produce(repo, &self.context, &self.options, &self.interrupt)
    }
}
