//! Per-row lateral iteration.

use crate::error::Result;
use crate::git::{ContextResolver, GitRepo, RepoSlot, RepositoryOpener};
use crate::providers::TableOperation;
use crate::scan::{InputRow, Interrupt, PullStatus, Row, ScanOptions};
use std::borrow::Borrow;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingInput,
    HasBufferedRows,
}

/// Scan state for a lateral (`_each`) invocation.
///
/// Each input row is resolved on its own. Rows whose identifier is null,
/// empty or unresolvable are skipped, as are rows whose producer fails;
/// only cancellation and engine failures end the scan.
pub struct LateralScan<O: RepositoryOpener> {
    operation: Arc<dyn TableOperation>,
    resolver: ContextResolver,
    fallback_revision: String,
    options: ScanOptions,
    batch_size: usize,
    interrupt: Interrupt,
    repos: RepoSlot<O>,
    phase: Phase,
    input_index: usize,
    buffered: VecDeque<Row>,
}

impl<O> LateralScan<O>
where
    O: RepositoryOpener,
    O::Handle: Borrow<GitRepo>,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        operation: Arc<dyn TableOperation>,
        resolver: ContextResolver,
        opener: O,
        fallback_revision: String,
        options: ScanOptions,
        batch_size: usize,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            operation,
            resolver,
            fallback_revision,
            options,
            batch_size: batch_size.max(1),
            interrupt,
            repos: RepoSlot::new(opener),
            phase: Phase::AwaitingInput,
            input_index: 0,
            buffered: VecDeque::new(),
        }
    }

    /// Advances the scan over `input`, appending at most one batch to `out`.
    pub fn pull(&mut self, input: &[InputRow], out: &mut Vec<Row>) -> Result<PullStatus> {
        loop {
            match self.phase {
                Phase::AwaitingInput => {
                    self.interrupt.check()?;
                    let Some(row) = input.get(self.input_index) else {
                        self.input_index = 0;
                        return Ok(PullStatus::NeedMoreInput);
                    };

                    match self.materialize(row) {
                        Ok(Some(rows)) => {
                            self.buffered = rows.into();
                            self.phase = Phase::HasBufferedRows;
                        }
                        Ok(None) => self.input_index += 1,
                        Err(e) if e.is_row_local() => {
                            tracing::debug!(
                                operation = self.operation.name(),
                                identifier = row.identifier.as_deref().unwrap_or_default(),
                                error = %e,
                                "skipping input row"
                            );
                            self.input_index += 1;
                        }
                        Err(e) => return Err(e.in_operation(self.operation.name())),
                    }
                }
                Phase::HasBufferedRows => {
                    let take = self.batch_size.min(self.buffered.len());
                    out.extend(self.buffered.drain(..take));
                    if self.buffered.is_empty() {
                        self.phase = Phase::AwaitingInput;
                        self.input_index += 1;
                    }
                    return Ok(PullStatus::MoreOutput);
                }
            }
        }
    }

    /// Rewinds the input cursor for a fresh chunk of input. The cached
    /// repository stays open.
    pub fn reset_input(&mut self) {
        self.phase = Phase::AwaitingInput;
        self.input_index = 0;
        self.buffered.clear();
    }

    fn materialize(&mut self, row: &InputRow) -> Result<Option<Vec<Row>>> {
        let identifier = match row.identifier.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => return Ok(None),
        };
        let revision = row
            .revision
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.fallback_revision);

        let ctx = self.resolver.resolve(identifier, revision)?;
        let handle = self.repos.get(&ctx.repository_root)?;
        let repo: &GitRepo = (*handle).borrow();
        self.operation
            .produce(repo, &ctx, &self.options, &self.interrupt)
            .map(Some)
    }
}
